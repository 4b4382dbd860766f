//! `From` implementations bridging `heatmeter_config` types to `heatmeter_core` types.

use std::time::Duration;

use crate::config::{Calibration, FlushCfg, Installation, PipelineSettings, SupervisorCfg};

// ── SupervisorCfg ────────────────────────────────────────────────────────────

impl From<&heatmeter_config::Timeouts> for SupervisorCfg {
    fn from(c: &heatmeter_config::Timeouts) -> Self {
        Self {
            fresh_data_timeout: Duration::from_millis(c.fresh_data_ms),
            reconnect_backoff: Duration::from_millis(c.reconnect_ms),
            reset_pause: Duration::from_millis(c.reset_pause_ms),
        }
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl From<&heatmeter_config::Calibration> for Calibration {
    fn from(c: &heatmeter_config::Calibration) -> Self {
        Self {
            used_water_ticks_per_liter: c.used_water_ticks_per_liter,
            solar_loop_ticks_per_liter: c.solar_loop_ticks_per_liter,
            aux_heater_ticks_per_kwh: c.aux_heater_ticks_per_kwh,
        }
    }
}

// ── Installation ─────────────────────────────────────────────────────────────

impl From<&heatmeter_config::Installation> for Installation {
    fn from(c: &heatmeter_config::Installation) -> Self {
        Self {
            collector_area_m2: c.collector_area_m2,
            stored_water_volume_m3: c.stored_water_volume_m3,
        }
    }
}

// ── FlushCfg ─────────────────────────────────────────────────────────────────

impl From<&heatmeter_config::Counters> for FlushCfg {
    fn from(c: &heatmeter_config::Counters) -> Self {
        Self {
            period: Duration::from_secs(c.save_period_s),
        }
    }
}

// ── PipelineSettings ─────────────────────────────────────────────────────────

impl From<&heatmeter_config::Config> for PipelineSettings {
    fn from(c: &heatmeter_config::Config) -> Self {
        Self {
            supervisor: (&c.timeouts).into(),
            calibration: (&c.calibration).into(),
            installation: (&c.installation).into(),
            flush: (&c.counters).into(),
        }
    }
}
