//! Scripted link doubles for driving the supervisor without a device.
//!
//! Time inside the script is the clock's time: a line "arriving after 3 s"
//! sleeps 3 s on the supplied clock, so with a `TestClock` whole stall and
//! backoff scenarios run instantly.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use heatmeter_traits::clock::Clock;
use heatmeter_traits::{Connect, ReadOutcome, Transport};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One scripted answer to `read_line`.
#[derive(Debug, Clone)]
pub enum Step {
    /// Deliver `bytes` once `after` has passed (or time out first if it is longer).
    Line { after: Duration, bytes: Vec<u8> },
    /// Say nothing for the whole read timeout.
    Silence,
    /// Fail the read as if the cable had been pulled.
    Unplug,
}

impl Step {
    pub fn line(after: Duration, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.extend_from_slice(b"\r\n");
        Step::Line { after, bytes }
    }
}

/// What the supervisor did to the link, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connect,
    ConnectFailed,
    Read(Duration),
    Reset(bool),
    Flush,
}

#[derive(Debug, Default)]
struct Script {
    steps: VecDeque<Step>,
    failing_connects: u32,
    repeat: Option<(Duration, Vec<u8>)>,
    stop_when_done: Option<Arc<AtomicBool>>,
    events: Vec<(Duration, LinkEvent)>,
}

/// Connector whose links all share one script.
#[derive(Clone)]
pub struct ScriptedConnector<C> {
    clock: C,
    origin: Instant,
    script: Arc<Mutex<Script>>,
}

impl<C: Clock + Clone> ScriptedConnector<C> {
    pub fn new(clock: C) -> Self {
        let origin = clock.now();
        Self {
            clock,
            origin,
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    pub fn push(&self, step: Step) -> &Self {
        self.lock().steps.push_back(step);
        self
    }

    /// The next `n` connection attempts fail.
    pub fn fail_connects(&self, n: u32) -> &Self {
        self.lock().failing_connects = n;
        self
    }

    /// Once the steps run out, emit `text` every `every` forever.
    pub fn repeat_when_done(&self, every: Duration, text: &str) -> &Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.extend_from_slice(b"\r\n");
        self.lock().repeat = Some((every, bytes));
        self
    }

    /// Raise `flag` as the last scripted step is handed out.
    pub fn stop_when_done(&self, flag: Arc<AtomicBool>) -> &Self {
        self.lock().stop_when_done = Some(flag);
        self
    }

    /// Events with the clock time (since construction) they happened at.
    pub fn events(&self) -> Vec<(Duration, LinkEvent)> {
        self.lock().events.clone()
    }

    /// Timeouts passed to every read, in order.
    pub fn read_timeouts(&self) -> Vec<Duration> {
        self.lock()
            .events
            .iter()
            .filter_map(|(_, e)| match e {
                LinkEvent::Read(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, event: LinkEvent) {
        let at = self.clock.now().saturating_duration_since(self.origin);
        self.lock().events.push((at, event));
    }
}

impl<C: Clock + Clone> Connect for ScriptedConnector<C> {
    type Link = ScriptedLink<C>;

    fn connect(&mut self) -> Result<Self::Link, BoxError> {
        let refuse = {
            let mut script = self.lock();
            if script.failing_connects > 0 {
                script.failing_connects -= 1;
                true
            } else {
                false
            }
        };
        if refuse {
            self.record(LinkEvent::ConnectFailed);
            return Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such device",
            )));
        }
        self.record(LinkEvent::Connect);
        Ok(ScriptedLink {
            connector: self.clone(),
        })
    }
}

pub struct ScriptedLink<C> {
    connector: ScriptedConnector<C>,
}

impl<C: Clock + Clone> ScriptedLink<C> {
    fn next_step(&self) -> Option<Step> {
        let mut script = self.connector.lock();
        let step = script.steps.pop_front();
        match step {
            Some(step) => {
                if script.steps.is_empty() {
                    if let Some(flag) = &script.stop_when_done {
                        flag.store(true, Ordering::Relaxed);
                    }
                }
                Some(step)
            }
            None => script
                .repeat
                .clone()
                .map(|(after, bytes)| Step::Line { after, bytes }),
        }
    }
}

impl<C: Clock + Clone> Transport for ScriptedLink<C> {
    fn read_line(&mut self, timeout: Duration) -> Result<ReadOutcome, BoxError> {
        self.connector.record(LinkEvent::Read(timeout));
        let clock = &self.connector.clock;
        match self.next_step().unwrap_or(Step::Silence) {
            Step::Line { after, bytes } if after <= timeout => {
                clock.sleep(after);
                Ok(ReadOutcome::Line(bytes))
            }
            Step::Line { .. } | Step::Silence => {
                clock.sleep(timeout);
                Ok(ReadOutcome::Timeout)
            }
            Step::Unplug => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device unplugged",
            ))),
        }
    }

    fn set_reset_signal(&mut self, level: bool) -> Result<(), BoxError> {
        self.connector.record(LinkEvent::Reset(level));
        Ok(())
    }

    fn flush_input(&mut self) -> Result<(), BoxError> {
        self.connector.record(LinkEvent::Flush);
        Ok(())
    }
}
