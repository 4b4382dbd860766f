//! Link supervision for the microcontroller.
//!
//! One thread owns the transport end-to-end and runs this state machine:
//!
//! ```text
//! Disconnected -> Connecting -> Streaming <-> Stalled
//!       ^             |             |
//!       +-- backoff --+-- link loss-+
//! ```
//!
//! - Open failures and hard I/O errors drop the link and wait a fixed backoff.
//! - A freshness deadline is pushed back only by successfully parsed samples,
//!   so garbage lines count as silence. Each read is bounded by the time left
//!   until that deadline; a timeout or an expired deadline triggers one reset
//!   sequence (signal low, pause, flush input, signal high).
//! - Stop requests are cooperative and checked before every read; a stopping
//!   supervisor closes the link without resetting the device.
use heatmeter_traits::clock::Clock;
use heatmeter_traits::{Connect, ReadOutcome, Transport};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SupervisorCfg;
use crate::error::PipelineError;
use crate::parser::parse_line;
use crate::sample::RawSample;
use crate::util::{as_millis_u64, sleep_unless_stopped};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Streaming,
    Stalled,
}

/// Counters describing what the supervisor went through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    pub samples: u64,
    pub parse_failures: u64,
    /// Reset sequences performed
    pub stalls: u64,
    pub connect_attempts: u64,
    pub connect_failures: u64,
    pub link_losses: u64,
}

enum StreamEnd {
    Stopped,
    LinkLost(BoxError),
}

pub struct Supervisor<K, C> {
    connector: K,
    clock: C,
    cfg: SupervisorCfg,
    shutdown: Arc<AtomicBool>,
    state: LinkState,
    stats: SupervisorStats,
}

impl<K: Connect, C: Clock> Supervisor<K, C> {
    pub fn new(connector: K, clock: C, cfg: SupervisorCfg) -> Self {
        Self {
            connector,
            clock,
            cfg,
            shutdown: Arc::new(AtomicBool::new(false)),
            state: LinkState::Disconnected,
            stats: SupervisorStats::default(),
        }
    }

    /// Setting the returned flag makes `run` return at its next check.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn stats(&self) -> SupervisorStats {
        self.stats
    }

    /// Block until the shutdown flag is set, feeding every parsed sample to `on_sample`.
    pub fn run<F: FnMut(RawSample)>(&mut self, mut on_sample: F) -> SupervisorStats {
        tracing::info!(
            fresh_ms = as_millis_u64(self.cfg.fresh_data_timeout),
            reconnect_ms = as_millis_u64(self.cfg.reconnect_backoff),
            "supervisor started"
        );
        while !self.stopping() {
            self.transition(LinkState::Connecting);
            self.stats.connect_attempts += 1;
            let link = match self.connector.connect() {
                Ok(link) => link,
                Err(e) => {
                    self.stats.connect_failures += 1;
                    let err = PipelineError::link(&*e);
                    tracing::warn!(
                        error = %err,
                        backoff_ms = as_millis_u64(self.cfg.reconnect_backoff),
                        "cannot open link"
                    );
                    self.transition(LinkState::Disconnected);
                    self.backoff();
                    continue;
                }
            };

            tracing::info!("link open");
            self.transition(LinkState::Streaming);
            match self.stream(link, &mut on_sample) {
                StreamEnd::Stopped => break,
                StreamEnd::LinkLost(e) => {
                    self.stats.link_losses += 1;
                    let err = PipelineError::link(&*e);
                    tracing::warn!(
                        error = %err,
                        backoff_ms = as_millis_u64(self.cfg.reconnect_backoff),
                        "link lost"
                    );
                    self.transition(LinkState::Disconnected);
                    self.backoff();
                }
            }
        }
        self.transition(LinkState::Disconnected);
        tracing::info!(
            samples = self.stats.samples,
            parse_failures = self.stats.parse_failures,
            stalls = self.stats.stalls,
            link_losses = self.stats.link_losses,
            "supervisor stopped"
        );
        self.stats
    }

    /// Read loop over one open link; the link is closed when this returns.
    fn stream<L: Transport, F: FnMut(RawSample)>(
        &mut self,
        mut link: L,
        on_sample: &mut F,
    ) -> StreamEnd {
        let fresh = self.cfg.fresh_data_timeout;
        let mut deadline = self.clock.now() + fresh;
        loop {
            if self.stopping() {
                tracing::debug!("stop requested, closing link");
                return StreamEnd::Stopped;
            }

            let remaining = deadline.saturating_duration_since(self.clock.now());
            if remaining.is_zero() {
                if let Err(e) = self.recover(&mut link) {
                    return StreamEnd::LinkLost(e);
                }
                deadline = self.clock.now() + fresh;
                continue;
            }

            match link.read_line(remaining) {
                Ok(ReadOutcome::Line(bytes)) => match parse_line(&bytes) {
                    Ok(sample) => {
                        self.stats.samples += 1;
                        tracing::trace!(?sample, "sample");
                        on_sample(sample);
                        deadline = self.clock.now() + fresh;
                    }
                    Err(e) => {
                        self.stats.parse_failures += 1;
                        tracing::warn!(
                            error = %e,
                            line = %String::from_utf8_lossy(&bytes).trim_end(),
                            "discarding unparsable line"
                        );
                    }
                },
                Ok(ReadOutcome::Timeout) => {
                    if let Err(e) = self.recover(&mut link) {
                        return StreamEnd::LinkLost(e);
                    }
                    deadline = self.clock.now() + fresh;
                }
                Err(e) => return StreamEnd::LinkLost(e),
            }
        }
    }

    /// Device reset sequence. Any control error means the link itself is gone.
    fn recover<L: Transport>(&mut self, link: &mut L) -> Result<(), BoxError> {
        self.stats.stalls += 1;
        self.transition(LinkState::Stalled);
        tracing::warn!(
            fresh_ms = as_millis_u64(self.cfg.fresh_data_timeout),
            stalls = self.stats.stalls,
            "no valid data in time, resetting device"
        );
        link.set_reset_signal(false)?;
        self.clock.sleep(self.cfg.reset_pause);
        link.flush_input()?;
        link.set_reset_signal(true)?;
        self.transition(LinkState::Streaming);
        Ok(())
    }

    fn backoff(&self) {
        let _ = sleep_unless_stopped(&self.clock, self.cfg.reconnect_backoff, &self.shutdown);
    }

    #[inline]
    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn transition(&mut self, next: LinkState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "link state");
            self.state = next;
        }
    }
}

/// Owns the supervisor thread.
///
/// Safety: the thread is always joined, either by `stop()` or on drop, so no
/// sample callback can still be running once the handle is gone.
pub struct SupervisorHandle {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<SupervisorStats>>,
}

impl SupervisorHandle {
    pub fn spawn<K, C, F>(mut supervisor: Supervisor<K, C>, on_sample: F) -> Self
    where
        K: Connect + Send + 'static,
        C: Clock + Send + 'static,
        F: FnMut(RawSample) + Send + 'static,
    {
        let shutdown = supervisor.shutdown_flag();
        let join_handle = std::thread::spawn(move || supervisor.run(on_sample));
        Self {
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    pub fn request_stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(std::thread::JoinHandle::is_finished)
    }

    /// Request a stop and wait for the thread. `None` if it panicked.
    ///
    /// Worst-case wait is one read bound (the freshness timeout) plus a reset pause.
    pub fn stop(mut self) -> Option<SupervisorStats> {
        self.request_stop();
        let handle = self.join_handle.take()?;
        match handle.join() {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!(?e, "supervisor thread panicked");
                None
            }
        }
    }
}

impl Drop for SupervisorHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(_) => {
                    tracing::trace!("supervisor thread joined successfully");
                }
                Err(e) => {
                    // Thread panicked; log but don't propagate (we're in Drop)
                    tracing::warn!(?e, "supervisor thread panicked during shutdown");
                }
            }
        }
    }
}
