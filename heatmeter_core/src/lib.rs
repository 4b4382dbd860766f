#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Resilient ingestion of solar hot-water meter readings (hardware-agnostic).
//!
//! All hardware interactions go through `heatmeter_traits::Connect` and
//! `heatmeter_traits::Transport`.
//!
//! ## Architecture
//!
//! - **Parsing**: raw line → `RawSample` (`parser` module)
//! - **Supervision**: reconnect / stall / device reset state machine (`supervisor`)
//! - **Processing**: pulse reconciliation and energy integration (`processor`)
//! - **Persistence**: durable counters and flush policy (`counters`)
//! - **Hand-off**: single-slot latest snapshot (`mailbox`)
//! - **Wiring**: `pipeline::Pipeline` ties the above to one ingestion thread
//!
//! ## Units
//!
//! Energies accumulate in joules and durations in seconds; snapshots report
//! kWh and hours. Volumes are derived from ticks through `config::Calibration`.

pub mod atomic;
pub mod config;
pub mod conversions;
pub mod counters;
pub mod energy;
pub mod error;
pub mod mailbox;
pub mod mocks;
pub mod parser;
pub mod pipeline;
pub mod processor;
pub mod sample;
pub mod supervisor;
pub mod util;

pub use config::{Calibration, FlushCfg, Installation, PipelineSettings, SupervisorCfg};
pub use counters::{CounterStore, FlushSchedule, SharedCounters};
pub use error::{ParseError, PipelineError};
pub use mailbox::LatestSnapshot;
pub use parser::parse_line;
pub use pipeline::Pipeline;
pub use processor::ReadingProcessor;
pub use sample::{RawSample, Snapshot};
pub use supervisor::{LinkState, Supervisor, SupervisorHandle, SupervisorStats};
