//! Bounded sample FIFO shared between a device thread and its pollers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// What to do when a push would take the queue past its ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Trim exactly the excess from the head, oldest samples first.
    ///
    /// Used for capture: the consumer loses the least audio possible.
    DropOldest,

    /// Discard everything queued, then enqueue the incoming batch.
    ///
    /// Used for playback: one audible skip instead of a growing delay. If
    /// the batch alone exceeds the ceiling only its newest samples are kept.
    ClearAll,
}

/// FIFO of individual samples with a hard capacity ceiling.
#[derive(Debug)]
pub struct SampleQueue {
    samples: Mutex<VecDeque<f32>>,
    capacity: usize,
    policy: OverflowPolicy,
    dropped: AtomicU64,
}

impl SampleQueue {
    /// Create a queue holding at most `capacity` samples.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            policy,
            dropped: AtomicU64::new(0),
        }
    }

    /// Append samples at the tail, applying the overflow policy.
    ///
    /// Returns how many samples were discarded to stay under the ceiling.
    pub fn push(&self, batch: &[f32]) -> usize {
        let mut queue = self.samples.lock();

        let dropped = match self.policy {
            OverflowPolicy::DropOldest => {
                queue.extend(batch.iter().copied());
                let excess = queue.len().saturating_sub(self.capacity);
                queue.drain(..excess);
                excess
            }
            OverflowPolicy::ClearAll => {
                if queue.len() + batch.len() > self.capacity {
                    let cleared = queue.len();
                    queue.clear();
                    let keep = batch.len().min(self.capacity);
                    queue.extend(batch[batch.len() - keep..].iter().copied());
                    cleared + batch.len() - keep
                } else {
                    queue.extend(batch.iter().copied());
                    0
                }
            }
        };
        drop(queue);

        if dropped > 0 {
            self.dropped.fetch_add(dropped as u64, Ordering::Relaxed);
        }
        dropped
    }

    /// Append raw little-endian f32 PCM bytes as delivered by a device.
    ///
    /// A trailing partial sample is ignored.
    pub fn push_pcm_bytes(&self, bytes: &[u8]) -> usize {
        let batch: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        self.push(&batch)
    }

    /// Pop exactly `out.len()` samples in FIFO order.
    ///
    /// All or nothing: if fewer samples are queued, nothing is consumed,
    /// `out` is untouched and false is returned.
    pub fn pop_exact(&self, out: &mut [f32]) -> bool {
        let mut queue = self.samples.lock();
        if queue.len() < out.len() {
            return false;
        }

        let n = out.len();
        for (slot, sample) in out.iter_mut().zip(queue.drain(..n)) {
            *slot = sample;
        }
        true
    }

    /// Fill `out` from the head of the queue, padding with silence.
    ///
    /// Returns how many queued samples were used.
    pub fn pop_fill(&self, out: &mut [f32]) -> usize {
        let mut queue = self.samples.lock();
        let available = queue.len().min(out.len());

        for (slot, sample) in out.iter_mut().zip(queue.drain(..available)) {
            *slot = sample;
        }
        out[available..].fill(0.0);
        available
    }

    /// Number of queued samples.
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// The sample ceiling.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The overflow policy.
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Samples discarded by the overflow policy since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Discard everything queued. Not counted as dropped.
    pub fn clear(&self) {
        self.samples.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: usize, len: usize) -> Vec<f32> {
        (start..start + len).map(|i| i as f32).collect()
    }

    #[test]
    fn test_pop_exact_is_all_or_nothing() {
        let queue = SampleQueue::new(16, OverflowPolicy::DropOldest);
        queue.push(&ramp(0, 3));

        let mut out = [9.0; 4];
        assert!(!queue.pop_exact(&mut out));
        assert_eq!(out, [9.0; 4]);
        assert_eq!(queue.len(), 3);

        let mut out = [0.0; 2];
        assert!(queue.pop_exact(&mut out));
        assert_eq!(out, [0.0, 1.0]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_drop_oldest_trims_exact_excess() {
        let queue = SampleQueue::new(4, OverflowPolicy::DropOldest);
        assert_eq!(queue.push(&ramp(0, 3)), 0);
        assert_eq!(queue.push(&ramp(3, 3)), 2);
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.dropped(), 2);

        let mut out = [0.0; 4];
        assert!(queue.pop_exact(&mut out));
        assert_eq!(out, [2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_drop_oldest_oversized_batch() {
        let queue = SampleQueue::new(3, OverflowPolicy::DropOldest);
        queue.push(&ramp(0, 10));

        let mut out = [0.0; 3];
        assert!(queue.pop_exact(&mut out));
        assert_eq!(out, [7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_clear_all_discards_queue() {
        let queue = SampleQueue::new(4, OverflowPolicy::ClearAll);
        assert_eq!(queue.push(&ramp(0, 3)), 0);
        assert_eq!(queue.push(&ramp(3, 2)), 3);
        assert_eq!(queue.len(), 2);

        let mut out = [0.0; 2];
        assert!(queue.pop_exact(&mut out));
        assert_eq!(out, [3.0, 4.0]);
    }

    #[test]
    fn test_clear_all_oversized_batch_keeps_newest() {
        let queue = SampleQueue::new(4, OverflowPolicy::ClearAll);
        queue.push(&ramp(0, 2));
        assert_eq!(queue.push(&ramp(2, 6)), 4);
        assert_eq!(queue.len(), 4);

        let mut out = [0.0; 4];
        assert!(queue.pop_exact(&mut out));
        assert_eq!(out, [4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        for policy in [OverflowPolicy::DropOldest, OverflowPolicy::ClearAll] {
            let queue = SampleQueue::new(100, policy);
            let mut next = 0;
            for batch in [1, 37, 64, 99, 100, 101, 250, 3, 0, 77] {
                queue.push(&ramp(next, batch));
                next += batch;
                assert!(queue.len() <= queue.capacity(), "{policy:?} overflowed");
            }
        }
    }

    #[test]
    fn test_pop_fill_pads_with_silence() {
        let queue = SampleQueue::new(8, OverflowPolicy::ClearAll);
        queue.push(&[0.5, -0.5]);

        let mut out = [1.0; 4];
        assert_eq!(queue.pop_fill(&mut out), 2);
        assert_eq!(out, [0.5, -0.5, 0.0, 0.0]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_pcm_bytes() {
        let queue = SampleQueue::new(8, OverflowPolicy::DropOldest);
        let mut bytes: Vec<u8> = [0.25f32, -1.0]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        bytes.push(0xFF);

        queue.push_pcm_bytes(&bytes);
        let mut out = [0.0; 2];
        assert!(queue.pop_exact(&mut out));
        assert_eq!(out, [0.25, -1.0]);
    }
}
