//! Single-slot "latest frame" exchange between a producer and its pollers.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Newest-wins cell holding at most one unread frame.
///
/// A producer [`publish`](Self::publish)es without ever blocking on the
/// consumer; an unread frame is replaced outright. Consumers poll with
/// [`take`](Self::take) or [`get_frame`](Self::get_frame), which move the
/// frame out and leave the cell empty.
#[derive(Debug)]
pub struct LatestFrame<T> {
    slot: Mutex<Option<T>>,
    published: AtomicU64,
    overwritten: AtomicU64,
}

impl<T> LatestFrame<T> {
    /// Create an empty exchange.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            published: AtomicU64::new(0),
            overwritten: AtomicU64::new(0),
        }
    }

    /// Store `frame` as the latest one.
    ///
    /// Returns true if an unread frame was discarded.
    pub fn publish(&self, frame: T) -> bool {
        let previous = self.slot.lock().replace(frame);
        self.published.fetch_add(1, Ordering::Relaxed);

        if previous.is_some() {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Move the unread frame out, if any.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    /// Move the unread frame into `out`.
    ///
    /// Returns false and leaves `out` untouched when nothing new is available.
    pub fn get_frame(&self, out: &mut T) -> bool {
        match self.take() {
            Some(frame) => {
                *out = frame;
                true
            }
            None => false,
        }
    }

    /// True if a frame is waiting to be read.
    pub fn has_unread(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Drop any unread frame.
    pub fn clear(&self) {
        self.slot.lock().take();
    }

    /// Total frames published since creation.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Frames discarded because they were replaced before being read.
    pub fn overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }
}

impl<T> Default for LatestFrame<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_newest_wins() {
        let exchange = LatestFrame::new();
        for i in 1..=5 {
            exchange.publish(i);
        }

        let mut out = 0;
        assert!(exchange.get_frame(&mut out));
        assert_eq!(out, 5);
        assert_eq!(exchange.published(), 5);
        assert_eq!(exchange.overwritten(), 4);
    }

    #[test]
    fn test_read_consumes() {
        let exchange = LatestFrame::new();
        assert!(!exchange.publish("a"));

        assert_eq!(exchange.take(), Some("a"));
        assert_eq!(exchange.take(), None);
        assert!(!exchange.has_unread());
    }

    #[test]
    fn test_miss_leaves_output_untouched() {
        let exchange: LatestFrame<u32> = LatestFrame::new();
        let mut out = 42;
        assert!(!exchange.get_frame(&mut out));
        assert_eq!(out, 42);
    }

    #[test]
    fn test_concurrent_reads_see_increasing_values() {
        let exchange = Arc::new(LatestFrame::new());
        let producer = {
            let exchange = Arc::clone(&exchange);
            thread::spawn(move || {
                for i in 0..10_000u64 {
                    exchange.publish(i);
                }
            })
        };

        let mut last = None;
        let mut seen = 0;
        while !producer.is_finished() || exchange.has_unread() {
            if let Some(value) = exchange.take() {
                if let Some(prev) = last {
                    assert!(value > prev);
                }
                last = Some(value);
                seen += 1;
            }
        }
        producer.join().unwrap();

        assert!(seen >= 1);
        assert_eq!(last, Some(9_999));
    }
}
