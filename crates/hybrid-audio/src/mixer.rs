//! Multi-channel gain mixer.

use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::error::AudioError;
use crate::frame::AudioFrame;
use crate::AudioResult;

/// Sums N input buffers, each scaled by its own gain.
///
/// The gain vector sits behind one lock: [`mix`](Self::mix) holds the read
/// side for the whole pass, so a concurrent
/// [`set_channel_gain`](Self::set_channel_gain) is either fully visible to a
/// pass or not at all.
///
/// The output is not clipped. Sums may leave `[-1.0, 1.0]`; limiting is up to
/// whoever consumes the mix.
#[derive(Debug)]
pub struct AudioMixer {
    channel_count: usize,
    gains: RwLock<Vec<f32>>,
}

impl AudioMixer {
    /// Create a mixer for `channel_count` inputs, all at unity gain.
    pub fn new(channel_count: usize) -> Self {
        Self {
            channel_count,
            gains: RwLock::new(vec![1.0; channel_count]),
        }
    }

    /// Number of inputs.
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Set the gain of input `channel`.
    ///
    /// Out-of-range channels are ignored. Negative gains are stored as 0.0;
    /// there is no upper bound.
    pub fn set_channel_gain(&self, channel: usize, gain: f32) {
        if let Some(slot) = self.gains.write().get_mut(channel) {
            *slot = gain.max(0.0);
            debug!(channel, gain = *slot, "Channel gain set");
        }
    }

    /// Gain of input `channel`, if it exists.
    pub fn channel_gain(&self, channel: usize) -> Option<f32> {
        self.gains.read().get(channel).copied()
    }

    /// Snapshot of every gain.
    pub fn gains(&self) -> Vec<f32> {
        self.gains.read().clone()
    }

    /// Mix the first `sample_count` samples of every input into `output`.
    ///
    /// `output[i] = sum(inputs[c][i] * gain[c])`. A `None` input contributes
    /// silence. Samples of `output` past `sample_count` are left alone.
    pub fn mix(
        &self,
        inputs: &[Option<&[f32]>],
        output: &mut [f32],
        sample_count: usize,
    ) -> AudioResult<()> {
        if inputs.len() != self.channel_count {
            return Err(AudioError::Mixer(format!(
                "expected {} inputs, got {}",
                self.channel_count,
                inputs.len()
            )));
        }
        if output.len() < sample_count {
            return Err(AudioError::Mixer(format!(
                "output holds {} samples, {} requested",
                output.len(),
                sample_count
            )));
        }
        if let Some((channel, input)) = inputs
            .iter()
            .enumerate()
            .find_map(|(c, input)| input.filter(|s| s.len() < sample_count).map(|s| (c, s)))
        {
            return Err(AudioError::Mixer(format!(
                "input {} holds {} samples, {} requested",
                channel,
                input.len(),
                sample_count
            )));
        }

        let out = &mut output[..sample_count];
        out.fill(0.0);

        let gains = self.gains.read();
        for (input, &gain) in inputs.iter().zip(gains.iter()) {
            let Some(input) = input else { continue };
            for (acc, &sample) in out.iter_mut().zip(input.iter()) {
                *acc += sample * gain;
            }
        }

        Ok(())
    }

    /// Mix whole frames into `output`.
    ///
    /// Every present input must have the same shape as `output`. The mixed
    /// frame takes the newest input timestamp.
    #[instrument(name = "mixer_mix_frames", skip_all, level = "trace")]
    pub fn mix_frames(
        &self,
        inputs: &[Option<&AudioFrame>],
        output: &mut AudioFrame,
    ) -> AudioResult<()> {
        if let Some(frame) = inputs.iter().flatten().find(|f| !f.same_shape(output)) {
            return Err(AudioError::Mixer(format!(
                "input frame {} Hz x{} x{} does not match output {} Hz x{} x{}",
                frame.sample_rate,
                frame.channels,
                frame.samples_per_channel,
                output.sample_rate,
                output.channels,
                output.samples_per_channel
            )));
        }

        let buffers: Vec<Option<&[f32]>> = inputs
            .iter()
            .map(|f| f.map(|f| f.data.as_slice()))
            .collect();
        let sample_count = output.data.len();
        self.mix(&buffers, &mut output.data, sample_count)?;

        output.timestamp_us = inputs
            .iter()
            .flatten()
            .map(|f| f.timestamp_us)
            .max()
            .unwrap_or(output.timestamp_us);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_unity_gains() {
        let mixer = AudioMixer::new(2);
        assert_eq!(mixer.channel_count(), 2);
        assert_eq!(mixer.gains(), vec![1.0, 1.0]);

        let a = [0.5; 64];
        let b = [0.3; 64];
        let mut out = [0.0; 64];
        mixer.mix(&[Some(&a[..]), Some(&b[..])], &mut out, 64).unwrap();

        for sample in out {
            assert_relative_eq!(sample, 0.8);
        }
    }

    #[test]
    fn test_muted_channel_is_ignored() {
        let mixer = AudioMixer::new(2);
        mixer.set_channel_gain(1, 0.0);

        let a = [0.5; 32];
        let b = [0.3; 32];
        let mut out = [0.0; 32];
        mixer.mix(&[Some(&a[..]), Some(&b[..])], &mut out, 32).unwrap();

        assert!(out.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_mix_is_linear() {
        let mixer = AudioMixer::new(3);
        mixer.set_channel_gain(0, 0.25);
        mixer.set_channel_gain(1, 2.0);
        mixer.set_channel_gain(2, 1.5);

        let a: Vec<f32> = (0..16).map(|i| i as f32 / 16.0).collect();
        let b: Vec<f32> = (0..16).map(|i| -(i as f32) / 32.0).collect();
        let mut out = vec![0.0; 16];
        mixer.mix(&[Some(&a[..]), Some(&b[..]), None], &mut out, 16).unwrap();

        for i in 0..16 {
            assert_relative_eq!(out[i], a[i] * 0.25 + b[i] * 2.0);
        }
    }

    #[test]
    fn test_no_clipping() {
        let mixer = AudioMixer::new(2);
        let a = [0.9; 4];
        let b = [0.9; 4];
        let mut out = [0.0; 4];
        mixer.mix(&[Some(&a[..]), Some(&b[..])], &mut out, 4).unwrap();
        assert_relative_eq!(out[0], 1.8);
    }

    #[test]
    fn test_zero_channels_is_silence() {
        let mixer = AudioMixer::new(0);
        let mut out = [1.0; 8];
        mixer.mix(&[], &mut out, 8).unwrap();
        assert_eq!(out, [0.0; 8]);
    }

    #[test]
    fn test_out_of_range_gain_is_ignored() {
        let mixer = AudioMixer::new(2);
        mixer.set_channel_gain(5, 0.1);
        mixer.set_channel_gain(0, -3.0);

        assert_eq!(mixer.channel_gain(5), None);
        assert_eq!(mixer.channel_gain(0), Some(0.0));
        assert_eq!(mixer.gains().len(), 2);
    }

    #[test]
    fn test_shape_mismatch() {
        let mixer = AudioMixer::new(2);
        let a = [0.5; 4];
        let short = [0.5; 2];
        let mut out = [0.0; 4];

        assert!(matches!(
            mixer.mix(&[Some(&a[..])], &mut out, 4),
            Err(AudioError::Mixer(_))
        ));
        assert!(matches!(
            mixer.mix(&[Some(&a[..]), Some(&short[..])], &mut out, 4),
            Err(AudioError::Mixer(_))
        ));
        assert!(mixer.mix(&[Some(&a[..]), Some(&short[..])], &mut out, 2).is_ok());
    }

    #[test]
    fn test_mix_frames() {
        let mixer = AudioMixer::new(2);
        mixer.set_channel_gain(0, 0.5);

        let mut mic = AudioFrame::from_samples(2, 44_100, vec![1.0; 8]).unwrap();
        mic.timestamp_us = 10;
        let mut tone = AudioFrame::from_samples(2, 44_100, vec![0.25; 8]).unwrap();
        tone.timestamp_us = 20;

        let mut out = AudioFrame::new(2, 44_100, 4);
        mixer.mix_frames(&[Some(&mic), Some(&tone)], &mut out).unwrap();
        assert_relative_eq!(out.data[0], 0.75);
        assert_eq!(out.timestamp_us, 20);

        let mono = AudioFrame::from_samples(1, 44_100, vec![1.0; 4]).unwrap();
        assert!(mixer.mix_frames(&[Some(&mono), None], &mut out).is_err());
    }

    #[test]
    fn test_concurrent_gain_updates() {
        let mixer = Arc::new(AudioMixer::new(1));
        let writer = {
            let mixer = Arc::clone(&mixer);
            thread::spawn(move || {
                for i in 0..1_000 {
                    mixer.set_channel_gain(0, if i % 2 == 0 { 0.0 } else { 1.0 });
                }
            })
        };

        let input = [1.0; 256];
        let mut out = [0.0; 256];
        for _ in 0..1_000 {
            mixer.mix(&[Some(&input[..])], &mut out, 256).unwrap();
            // One gain per pass.
            assert!(out.iter().all(|&s| s == out[0]));
        }
        writer.join().unwrap();
    }
}
