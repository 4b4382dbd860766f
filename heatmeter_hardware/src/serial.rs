//! Serial-port transport for the flow/temperature microcontroller.
use std::io::Read;
use std::time::{Duration, Instant};

use heatmeter_traits::{Connect, ReadOutcome, Transport};
use serialport::{ClearBuffer, SerialPort};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::LineBuffer;

/// Upper bound for one blocking `read` so deadlines are honored closely.
const POLL_SLICE: Duration = Duration::from_millis(100);

pub struct SerialConnector {
    device: String,
    baud_rate: u32,
}

impl SerialConnector {
    pub fn new(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            device: device.into(),
            baud_rate,
        }
    }

    fn open(&self) -> Result<SerialLink> {
        let port = serialport::new(&self.device, self.baud_rate)
            .timeout(POLL_SLICE)
            .open()
            .map_err(|e| HwError::Serial(format!("open {}: {e}", self.device)))?;
        Ok(SerialLink {
            port,
            lines: LineBuffer::default(),
        })
    }
}

impl Connect for SerialConnector {
    type Link = SerialLink;

    fn connect(&mut self) -> std::result::Result<SerialLink, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.open()?)
    }
}

pub struct SerialLink {
    port: Box<dyn SerialPort>,
    lines: LineBuffer,
}

impl SerialLink {
    fn read_until(&mut self, deadline: Instant) -> Result<ReadOutcome> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.lines.pop_line() {
                trace!(len = line.len(), "serial line");
                return Ok(ReadOutcome::Line(line));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(ReadOutcome::Timeout);
            }
            self.port
                .set_timeout((deadline - now).min(POLL_SLICE))
                .map_err(|e| HwError::Serial(e.to_string()))?;
            match self.port.read(&mut chunk) {
                Ok(0) => return Err(HwError::Disconnected),
                Ok(n) => self.lines.push(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HwError::Io(e)),
            }
        }
    }
}

impl Transport for SerialLink {
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<ReadOutcome, Box<dyn std::error::Error + Send + Sync>> {
        let deadline = Instant::now() + timeout;
        Ok(self.read_until(deadline)?)
    }

    fn set_reset_signal(
        &mut self,
        level: bool,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.port
            .write_data_terminal_ready(level)
            .map_err(|e| HwError::Serial(e.to_string()))?;
        Ok(())
    }

    fn flush_input(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lines.clear();
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| HwError::Serial(e.to_string()))?;
        Ok(())
    }
}
