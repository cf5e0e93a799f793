//! Single-slot publication of the latest measurement.

use crate::measurement::Measurement;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared slot holding the most recent [`Measurement`].
///
/// Exactly one logical writer (the edge-consuming context) overwrites the
/// slot; any number of readers snapshot it. The critical sections copy one
/// small value, so a reader can never observe a half-written measurement and
/// never stalls the writer for long. Clones share the same slot.
#[derive(Clone)]
pub struct MeasurementPublisher {
    inner: Arc<Inner>,
}

struct Inner {
    slot: RwLock<Measurement>,
    publishes: AtomicU64,
}

impl MeasurementPublisher {
    /// A slot holding the [`Measurement::not_yet_measured`] sentinel.
    pub fn new() -> Self {
        MeasurementPublisher {
            inner: Arc::new(Inner {
                slot: RwLock::new(Measurement::not_yet_measured()),
                publishes: AtomicU64::new(0),
            }),
        }
    }

    /// Overwrite the slot with a new reading.
    pub fn publish(&self, measurement: Measurement) {
        *self.inner.slot.write() = measurement;
        self.inner.publishes.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the most recently published reading.
    pub fn current(&self) -> Measurement {
        *self.inner.slot.read()
    }

    /// Number of publishes since construction. Readers can watch this to
    /// tell a fresh reading from a stale one with equal contents.
    pub fn publish_count(&self) -> u64 {
        self.inner.publishes.load(Ordering::Relaxed)
    }
}

impl Default for MeasurementPublisher {
    fn default() -> Self {
        MeasurementPublisher::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::MeasurementStatus;
    use std::thread;

    #[test]
    fn starts_at_the_sentinel() {
        let publisher = MeasurementPublisher::new();
        assert_eq!(publisher.current(), Measurement::not_yet_measured());
        assert_eq!(publisher.publish_count(), 0);
    }

    #[test]
    fn publish_overwrites_without_history() {
        let publisher = MeasurementPublisher::new();
        publisher.publish(Measurement::ok(10));
        publisher.publish(Measurement::ok(20));
        assert_eq!(publisher.current(), Measurement::ok(20));
        assert_eq!(publisher.publish_count(), 2);
    }

    #[test]
    fn clones_share_the_slot() {
        let writer = MeasurementPublisher::new();
        let reader = writer.clone();
        writer.publish(Measurement::invalid_timing());
        assert_eq!(reader.current(), Measurement::invalid_timing());
    }

    #[test]
    fn concurrent_reads_never_tear() {
        // The writer alternates between two internally consistent values;
        // any mixture of their fields is a torn read.
        let first = Measurement::ok(111);
        let second = Measurement::no_echo();

        let publisher = MeasurementPublisher::new();
        let writer = publisher.clone();
        let writer_thread = thread::spawn(move || {
            for round in 0..20_000u32 {
                writer.publish(if round % 2 == 0 { first } else { second });
            }
        });

        for _ in 0..20_000u32 {
            let seen = publisher.current();
            let consistent = seen == first
                || seen == second
                || seen == Measurement::not_yet_measured();
            assert!(consistent, "torn read: {:?}", seen);
        }
        writer_thread.join().unwrap();
        assert_eq!(publisher.current().status, MeasurementStatus::NoEcho);
        assert_eq!(publisher.publish_count(), 20_000);
    }
}
