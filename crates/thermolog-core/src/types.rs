//! Identifiers and the persisted record shape.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OS-assigned hardware thread id (the `N` in `cpuN`).
pub type LogicalProcessor = u32;

/// Physical core id shared by sibling hyperthreads.
pub type PhysicalCore = u32;

/// Process id.
pub type Pid = u32;

/// One persisted row: a logical processor's state at one sample instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub core: PhysicalCore,
    pub processor: LogicalProcessor,
    pub processor_usage_percent: f64,
    pub heaviest_process_command: String,
    pub heaviest_process_usage_percent: f64,
    pub temperature_millidegrees: i64,
    pub time: NaiveDateTime,
}

impl Record {
    /// Temperature in degrees Celsius.
    pub fn temperature_celsius(&self) -> f64 {
        self.temperature_millidegrees as f64 / 1000.0
    }
}

/// Utilization of one process over a measurement interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub pid: Pid,
    pub processor: LogicalProcessor,
    pub usage_percent: f64,
    pub command: String,
}
