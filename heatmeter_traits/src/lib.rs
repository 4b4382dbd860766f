//! Hardware-agnostic seams shared by the ingestion pipeline and its transports.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

/// Outcome of a single line read that did not hit a hard I/O error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// One line of raw bytes as received (terminator may still be attached).
    Line(Vec<u8>),
    /// Nothing complete arrived within the requested duration.
    Timeout,
}

/// Line-oriented duplex link to the microcontroller.
///
/// `Err` is reserved for hard failures (device unplugged, I/O break); a quiet
/// link is reported as `Ok(ReadOutcome::Timeout)`.
pub trait Transport {
    /// Read one line, never blocking longer than `timeout`.
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<ReadOutcome, Box<dyn std::error::Error + Send + Sync>>;

    /// Drive the device reset control line (DTR on a serial port).
    fn set_reset_signal(&mut self, level: bool)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Discard any bytes received but not yet read.
    fn flush_input(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Opens a fresh `Transport`; called again after every link loss.
pub trait Connect {
    type Link: Transport;

    fn connect(&mut self) -> Result<Self::Link, Box<dyn std::error::Error + Send + Sync>>;
}
