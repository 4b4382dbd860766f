//! Single-slot hand-off of the most recent snapshot to a polling consumer.

use std::sync::{Arc, Mutex, PoisonError};

use crate::sample::Snapshot;

/// Latest-value mailbox. Cloning yields another handle to the same slot.
///
/// The producer overwrites unconditionally; the consumer takes and clears.
/// A slow consumer therefore only ever sees the newest snapshot.
#[derive(Debug, Clone, Default)]
pub struct LatestSnapshot {
    slot: Arc<Mutex<Option<Snapshot>>>,
}

impl LatestSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: Snapshot) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(snapshot);
    }

    /// The snapshot published since the previous call, or `None` when nothing new arrived.
    pub fn take(&self) -> Option<Snapshot> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::CounterStore;
    use crate::processor::ReadingProcessor;
    use crate::sample::RawSample;
    use heatmeter_traits::clock::test_clock::TestClock;

    fn snapshots(n: u64) -> Vec<Snapshot> {
        let mut processor = ReadingProcessor::new(
            CounterStore::in_memory().into_shared(),
            Default::default(),
            Default::default(),
            TestClock::new(),
        );
        (0..n)
            .map(|i| {
                processor.process(&RawSample {
                    used_water_ticks: i,
                    solar_loop_ticks: 0,
                    aux_heater_ticks: 0,
                    tank_top_c: 50.0,
                    tank_bottom_c: 40.0,
                    hot_water_c: 45.0,
                    cold_water_c: 15.0,
                    panel_out_c: 20.0,
                    exchanger_in_c: 30.0,
                    exchanger_out_c: 30.0,
                })
            })
            .collect()
    }

    #[test]
    fn empty_until_published() {
        assert!(LatestSnapshot::new().take().is_none());
    }

    #[test]
    fn newest_wins_and_take_clears() {
        let mailbox = LatestSnapshot::new();
        let reader = mailbox.clone();
        let snaps = snapshots(3);
        for s in &snaps {
            mailbox.publish(s.clone());
        }
        assert_eq!(reader.take().as_ref(), snaps.last());
        assert!(reader.take().is_none());
        assert!(mailbox.take().is_none());
    }
}
