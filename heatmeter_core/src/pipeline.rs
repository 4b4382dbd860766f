//! End-to-end wiring: supervisor thread → processor → mailbox, with
//! periodic counter flushes and a final flush once the thread has joined.

use std::sync::{Arc, PoisonError};

use heatmeter_traits::Connect;
use heatmeter_traits::clock::Clock;

use crate::config::PipelineSettings;
use crate::counters::{CounterStore, FlushSchedule, SharedCounters};
use crate::error::{PipelineError, Result};
use crate::mailbox::LatestSnapshot;
use crate::processor::ReadingProcessor;
use crate::sample::{RawSample, Snapshot};
use crate::supervisor::{Supervisor, SupervisorHandle, SupervisorStats};

pub struct Pipeline {
    supervisor: Option<SupervisorHandle>,
    store: SharedCounters,
    latest: LatestSnapshot,
}

impl Pipeline {
    /// Spawn the ingestion thread. Processing and periodic flushes run on it.
    ///
    /// Fails with `StoreUnconfigured` before spawning anything when `store`
    /// has no backing file.
    pub fn start<K, C>(
        connector: K,
        clock: C,
        settings: PipelineSettings,
        store: CounterStore,
    ) -> Result<Self>
    where
        K: Connect + Send + 'static,
        C: Clock + Clone + Send + 'static,
    {
        if store.path().is_none() {
            return Err(PipelineError::StoreUnconfigured.into());
        }
        let store = store.into_shared();
        let latest = LatestSnapshot::new();

        let mut processor = ReadingProcessor::new(
            Arc::clone(&store),
            settings.calibration.clone(),
            settings.installation.clone(),
            clock.clone(),
        );
        let mut flush = FlushSchedule::new(settings.flush.period);
        let publisher = latest.clone();
        let flush_store = Arc::clone(&store);
        let flush_clock = clock.clone();

        let on_sample = move |raw: RawSample| {
            let snapshot = processor.process(&raw);
            publisher.publish(snapshot);
            if flush.due(flush_clock.now()) {
                let store = flush_store.lock().unwrap_or_else(PoisonError::into_inner);
                match store.save() {
                    Ok(()) => tracing::info!("counters flushed"),
                    // Retried at the next due flush and at shutdown.
                    Err(e) => tracing::error!(error = %e, "counter flush failed"),
                }
            }
        };

        let supervisor = Supervisor::new(connector, clock, settings.supervisor.clone());
        tracing::info!("pipeline started");
        Ok(Self {
            supervisor: Some(SupervisorHandle::spawn(supervisor, on_sample)),
            store,
            latest,
        })
    }

    /// Take the snapshot produced since the last poll, if any.
    pub fn latest(&self) -> Option<Snapshot> {
        self.latest.take()
    }

    /// Another handle to the latest-snapshot mailbox, for consumers on other threads.
    pub fn mailbox(&self) -> LatestSnapshot {
        self.latest.clone()
    }

    pub fn counters(&self) -> SharedCounters {
        Arc::clone(&self.store)
    }

    /// True once the supervisor thread has exited (it only does so when stopped or on panic).
    pub fn is_finished(&self) -> bool {
        self.supervisor
            .as_ref()
            .is_none_or(SupervisorHandle::is_finished)
    }

    /// Stop the ingestion thread, wait for it, then save the counters.
    pub fn stop(mut self) -> Result<SupervisorStats> {
        let stats = self
            .supervisor
            .take()
            .and_then(SupervisorHandle::stop)
            .ok_or_else(|| PipelineError::State("supervisor thread panicked".into()));
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        store.save()?;
        tracing::info!("counters saved at shutdown");
        Ok(stats?)
    }
}
