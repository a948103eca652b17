//! # thermolog-core
//!
//! **Per-core temperature and CPU load, with the process to blame.**
//!
//! `thermolog-core` samples a Linux host once per cycle: it brackets a short
//! interval with two `/proc` counter snapshots, charges every running process
//! to the logical processor it last ran on, reads the coretemp sensors, and
//! joins everything into one [`Record`] per logical processor.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use thermolog_core::{RecordStore, Sampler, SamplerConfig, SqliteStore, local_hostname};
//!
//! let sampler = Sampler::new(SamplerConfig::default());
//! let cycle = sampler.run_cycle(&AtomicBool::new(true)).unwrap();
//!
//! let mut store = SqliteStore::open("thermolog.db".as_ref()).unwrap();
//! store.initialize().unwrap();
//! let host = store.get_or_create_host(&local_hostname()).unwrap();
//! store.append_records(&host, &cycle.records).unwrap();
//! ```
//!
//! ## Architecture
//!
//! counters + topology → utilization → attribution ─┐
//!                                       thermal ───┴→ compose → store → series
//!
//! A cycle either yields a record for every processor in the topology or
//! fails as a whole with a [`SampleError`].

pub mod attribution;
pub mod compose;
pub mod config;
pub mod counters;
pub mod error;
pub mod host;
pub mod sampler;
pub mod schedule;
pub mod series;
pub mod store;
pub mod thermal;
pub mod topology;
pub mod types;
pub mod utilization;
pub mod window;

pub use attribution::{Attribution, reduce};
pub use compose::compose;
pub use config::{DEFAULT_INTERVAL, DEFAULT_WARMUP, SamplerConfig, SystemPaths};
pub use counters::{CommandSource, CounterSnapshot, ProcCommands, capture};
pub use error::{Result, SampleError};
pub use host::local_hostname;
pub use sampler::{Cycle, Sampler};
pub use schedule::{
    JobKind, ScheduleConfig, Scheduler, Trigger, TriggerFields,
};
pub use series::{Grouping, Measurement, Series, SeriesPoint, SeriesSummary, build_series};
pub use store::{HostHandle, RecordStore, SqliteStore, TimeRange};
pub use thermal::{CoretempSensors, Temperatures, read_temperatures};
pub use topology::{Topology, resolve_topology};
pub use types::{LogicalProcessor, PhysicalCore, Pid, ProcessSample, Record};
pub use utilization::{UtilizationReport, compute_utilization};
pub use window::{parse_user_time, resolve_window, session_window};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
