pub mod error;
#[cfg(feature = "hardware")]
pub mod serial;
pub mod util;

use heatmeter_traits::{Connect, ReadOutcome, Transport};
use std::time::Duration;

#[cfg(feature = "hardware")]
pub use serial::{SerialConnector, SerialLink};

/// First line the firmware prints after power-up.
pub const SIM_HEADER: &[u8] = b";  D1 Impuls et Volume (L)  ;    D2 Impuls et Volume (l)  ;  D3 Impuls Appoint ;  S1 H ballon ; S2 B ballon ;  S3 Sortie ballon ;  S4 Eau froide ;  S5 sortie Panneaux ; Entrer Echang ; Sortie Echang\r\n";

/// Simulated microcontroller: one data line per `period`.
///
/// Every connection starts as a freshly powered device (header line, counters
/// at zero). Pulling the reset signal low holds the device silent; releasing
/// it reboots the device.
pub struct SimulatedConnector {
    period: Duration,
    connects: u32,
}

impl SimulatedConnector {
    pub fn new(period: Duration) -> Self {
        Self { period, connects: 0 }
    }
}

impl Connect for SimulatedConnector {
    type Link = SimulatedLink;

    fn connect(&mut self) -> Result<SimulatedLink, Box<dyn std::error::Error + Send + Sync>> {
        self.connects = self.connects.saturating_add(1);
        tracing::debug!(connects = self.connects, "simulated device attached");
        Ok(SimulatedLink::new(self.period))
    }
}

pub struct SimulatedLink {
    period: Duration,
    header_pending: bool,
    held_in_reset: bool,
    step: u64,
    used_water: u64,
    solar_loop: u64,
    aux_heater: u64,
}

impl SimulatedLink {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            header_pending: true,
            held_in_reset: false,
            step: 0,
            used_water: 0,
            solar_loop: 0,
            aux_heater: 0,
        }
    }

    fn reboot(&mut self) {
        self.header_pending = true;
        self.step = 0;
        self.used_water = 0;
        self.solar_loop = 0;
        self.aux_heater = 0;
    }

    fn next_line(&mut self) -> Vec<u8> {
        self.step += 1;
        let n = self.step;
        if n % 3 == 0 {
            self.used_water += 1;
        }
        self.solar_loop += 2;
        if n % 5 == 0 {
            self.aux_heater += 1;
        }
        let phase = n as f64 / 40.0;
        let tank_top = 55.0 + 3.0 * phase.sin();
        let tank_bottom = 42.0 + 2.0 * phase.sin();
        let hot_water = tank_top - 1.5;
        let cold_water = 15.0;
        let panel_out = 60.0 + 8.0 * phase.sin();
        let exchanger_in = 48.0 + 6.0 * phase.sin();
        // Heat flows into the tank most of the time, out of it near the trough.
        let exchanger_out = 46.0 + 2.0 * phase.cos();
        format!(
            ";  {}  ;  {}  ;  {}  ;  {:.2}  ;  {:.2}  ;  {:.2}  ;  {:.2}  ;  {:.2}  ;  {:.2}  ;  {:.2}  ;\r\n",
            self.used_water,
            self.solar_loop,
            self.aux_heater,
            tank_top,
            tank_bottom,
            hot_water,
            cold_water,
            panel_out,
            exchanger_in,
            exchanger_out,
        )
        .into_bytes()
    }
}

impl Transport for SimulatedLink {
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<ReadOutcome, Box<dyn std::error::Error + Send + Sync>> {
        if self.held_in_reset || self.period > timeout {
            std::thread::sleep(timeout);
            return Ok(ReadOutcome::Timeout);
        }
        std::thread::sleep(self.period);
        if self.header_pending {
            self.header_pending = false;
            return Ok(ReadOutcome::Line(SIM_HEADER.to_vec()));
        }
        let line = self.next_line();
        tracing::trace!(step = self.step, "simulated line");
        Ok(ReadOutcome::Line(line))
    }

    fn set_reset_signal(
        &mut self,
        level: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if level && self.held_in_reset {
            tracing::debug!("simulated device rebooting");
            self.reboot();
        }
        self.held_in_reset = !level;
        Ok(())
    }

    fn flush_input(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}
