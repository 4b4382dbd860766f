//! Durable name → value accumulators.
//!
//! Values live in memory and reach disk only through `save()`; the caller
//! owns the flush policy (see `FlushSchedule`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::atomic::write_atomic;
use crate::error::PipelineError;

/// Store shared between the processing thread and the final shutdown flush.
pub type SharedCounters = Arc<Mutex<CounterStore>>;

#[derive(Debug, Default)]
pub struct CounterStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, f64>,
}

impl CounterStore {
    /// Store without a backing file; `save()` refuses to run.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load counters from `path`. A missing file is a first run, not an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        let values = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<BTreeMap<String, f64>>(&bytes)
                .map_err(|e| store_error(&path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no counter file yet, starting from zero");
                BTreeMap::new()
            }
            Err(e) => return Err(store_error(&path, e)),
        };
        tracing::debug!(path = %path.display(), counters = values.len(), "counters loaded");
        Ok(Self {
            path: Some(path),
            values,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current value; 0 for a counter never touched.
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    /// Add `diff` and return the new total. A non-finite `diff` is dropped.
    pub fn update(&mut self, name: &str, diff: f64) -> f64 {
        let slot = self.values.entry(name.to_owned()).or_insert(0.0);
        if diff.is_finite() {
            *slot += diff;
        } else {
            tracing::warn!(counter = name, diff, "non-finite increment dropped");
        }
        *slot
    }

    /// Absolute overwrite, for administrative correction.
    pub fn reset(&mut self, name: &str, value: f64) -> Result<(), PipelineError> {
        if !value.is_finite() {
            return Err(PipelineError::NonFiniteCounter {
                name: name.to_owned(),
                value,
            });
        }
        self.values.insert(name.to_owned(), value);
        Ok(())
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    /// Write the whole map atomically to the configured file.
    pub fn save(&self) -> Result<(), PipelineError> {
        let path = self.path.as_deref().ok_or(PipelineError::StoreUnconfigured)?;
        let bytes = serde_json::to_vec_pretty(&self.values).map_err(|e| store_error(path, e))?;
        write_atomic(path, &bytes).map_err(|e| store_error(path, e))?;
        tracing::debug!(path = %path.display(), "counters saved");
        Ok(())
    }

    pub fn into_shared(self) -> SharedCounters {
        Arc::new(Mutex::new(self))
    }
}

fn store_error(path: &Path, e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Store {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Rate limiter for opportunistic saves: due on first check, then at most
/// once per `period`.
#[derive(Debug, Clone)]
pub struct FlushSchedule {
    period: Duration,
    next_at: Option<Instant>,
}

impl FlushSchedule {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_at: None,
        }
    }

    /// Returns true when a flush should happen now and arms the next slot.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.next_at {
            Some(at) if now <= at => false,
            _ => {
                self.next_at = Some(now + self.period);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_defaults_to_zero_and_is_stable() {
        let mut store = CounterStore::in_memory();
        assert_eq!(store.get("used_water_ticks"), 0.0);
        assert_eq!(store.update("used_water_ticks", 3.0), 3.0);
        assert_eq!(store.get("used_water_ticks"), 3.0);
        assert_eq!(store.get("used_water_ticks"), 3.0);
        store.reset("used_water_ticks", 10.0).unwrap();
        assert_eq!(store.update("used_water_ticks", 2.0), 12.0);
    }

    #[test]
    fn non_finite_values_never_enter_the_store() {
        let mut store = CounterStore::in_memory();
        store.update("solar_energy_j", 5.0);
        assert_eq!(store.update("solar_energy_j", f64::NAN), 5.0);
        assert_eq!(store.update("solar_energy_j", f64::INFINITY), 5.0);
        assert!(matches!(
            store.reset("solar_energy_j", f64::NEG_INFINITY),
            Err(PipelineError::NonFiniteCounter { .. })
        ));
        assert_eq!(store.get("solar_energy_j"), 5.0);
    }

    #[test]
    fn save_without_path_fails_loudly() {
        let store = CounterStore::in_memory();
        assert!(matches!(store.save(), Err(PipelineError::StoreUnconfigured)));
    }

    #[test]
    fn schedule_fires_first_then_once_per_period() {
        let mut s = FlushSchedule::new(Duration::from_secs(600));
        let t0 = Instant::now();
        assert!(s.due(t0));
        assert!(!s.due(t0 + Duration::from_secs(1)));
        assert!(!s.due(t0 + Duration::from_secs(600)));
        assert!(s.due(t0 + Duration::from_secs(601)));
        assert!(!s.due(t0 + Duration::from_secs(700)));
    }
}
