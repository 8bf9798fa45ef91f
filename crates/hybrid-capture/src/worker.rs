//! Managed producer thread shared by every source and sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::WorkerError;

enum Slot<D> {
    /// Device is idle and owned by the worker.
    Parked(D),

    /// Device is owned by the running producer thread, which hands it back on exit.
    Running(JoinHandle<D>),

    /// Producer thread panicked; the device went down with it.
    Lost,
}

/// One long-lived producer thread per source, joined on stop.
///
/// The worker owns the device while idle and lends it to the producer
/// thread while running. Dropping the worker stops and joins the thread, so
/// a source can never outlive its producer.
pub struct SourceWorker<D: Send + 'static> {
    name: String,
    running: Arc<AtomicBool>,
    slot: Mutex<Slot<D>>,
}

impl<D: Send + 'static> SourceWorker<D> {
    /// Create a stopped worker owning `device`.
    pub fn new(name: impl Into<String>, device: D) -> Self {
        Self {
            name: name.into(),
            running: Arc::new(AtomicBool::new(false)),
            slot: Mutex::new(Slot::Parked(device)),
        }
    }

    /// Thread name, also used in log lines.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open the device and spawn the producer thread.
    ///
    /// `open` runs on the calling thread; if it fails the device is parked
    /// again and no thread is spawned, so the call can be retried. `body`
    /// runs on the producer thread and must return once the running flag is
    /// cleared. Returns `Ok(false)` if the worker was already running.
    ///
    /// If the OS refuses to spawn the thread, the device has already been
    /// moved into the thread closure and is dropped with it. The worker is
    /// then permanently lost and later calls fail with `DeviceLost`.
    pub fn start<E, O, B>(&self, open: O, body: B) -> Result<bool, E>
    where
        E: From<WorkerError>,
        O: FnOnce(&mut D) -> Result<(), E>,
        B: FnOnce(&mut D, &AtomicBool) + Send + 'static,
    {
        let mut slot = self.slot.lock();

        let mut device = match std::mem::replace(&mut *slot, Slot::Lost) {
            Slot::Running(handle) if self.running.load(Ordering::SeqCst) => {
                *slot = Slot::Running(handle);
                return Ok(false);
            }
            // Producer cleared the flag itself (device error); reclaim the device.
            Slot::Running(handle) => match handle.join() {
                Ok(device) => device,
                Err(_) => return Err(WorkerError::DeviceLost(self.name.clone()).into()),
            },
            Slot::Parked(device) => device,
            Slot::Lost => return Err(WorkerError::DeviceLost(self.name.clone()).into()),
        };

        if let Err(e) = open(&mut device) {
            *slot = Slot::Parked(device);
            return Err(e);
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);

        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                body(&mut device, running.as_ref());
                running.store(false, Ordering::SeqCst);
                device
            });

        match spawned {
            Ok(handle) => {
                *slot = Slot::Running(handle);
                debug!(worker = %self.name, "Producer thread started");
                Ok(true)
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(WorkerError::Spawn(e).into())
            }
        }
    }

    /// Signal the producer to exit and wait for it.
    ///
    /// Safe to call repeatedly or before [`start`](Self::start). Returns true
    /// if a running thread was joined by this call. A `stop` racing a `start`
    /// waits for the start to finish and then stops the thread it spawned.
    pub fn stop(&self) -> bool {
        // Clear the flag under the lock so a concurrent start cannot set it again.
        let mut slot = self.slot.lock();
        self.running.store(false, Ordering::SeqCst);

        match std::mem::replace(&mut *slot, Slot::Lost) {
            Slot::Running(handle) => {
                match handle.join() {
                    Ok(device) => *slot = Slot::Parked(device),
                    Err(_) => warn!(worker = %self.name, "Producer thread panicked"),
                }
                debug!(worker = %self.name, "Producer thread joined");
                true
            }
            other => {
                *slot = other;
                false
            }
        }
    }

    /// True while the producer thread is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run `f` against the device while it is parked.
    pub fn with_parked_device<R>(&self, f: impl FnOnce(&mut D) -> R) -> Option<R> {
        match &mut *self.slot.lock() {
            Slot::Parked(device) => Some(f(device)),
            _ => None,
        }
    }
}

impl<D: Send + 'static> Drop for SourceWorker<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleeps a loop to a fixed period, without drift.
#[derive(Debug)]
pub struct FramePacer {
    interval: Duration,
    next: Option<Instant>,
}

impl FramePacer {
    /// Pace at `per_second` iterations per second.
    pub fn per_second(per_second: u32) -> Self {
        let per_second = per_second.max(1);
        Self::with_interval(Duration::from_nanos(1_000_000_000 / per_second as u64))
    }

    /// Pace at a fixed interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    /// The pacing interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep until the next tick. The first call returns immediately.
    pub fn wait(&mut self) {
        let now = Instant::now();
        let next = match self.next {
            Some(next) => next,
            None => {
                self.next = Some(now + self.interval);
                return;
            }
        };

        if next > now {
            thread::sleep(next - now);
            self.next = Some(next + self.interval);
        } else {
            // Fell behind; restart the schedule instead of bursting.
            self.next = Some(now + self.interval);
        }
    }

    /// Forget the schedule, e.g. after a restart.
    pub fn reset(&mut self) {
        self.next = None;
    }
}
