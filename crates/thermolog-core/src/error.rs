//! Error taxonomy shared by the sampling engine, storage and CLI.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::LogicalProcessor;

/// Result type alias using [`SampleError`].
pub type Result<T> = std::result::Result<T, SampleError>;

/// Failures surfaced by a sampling cycle or one of its collaborators.
#[derive(Error, Debug)]
pub enum SampleError {
    /// The OS counter source is missing or unreadable.
    #[error("counter source {} is unavailable: {source}", path.display())]
    CounterUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Topology metadata is absent or incomplete.
    #[error("cpu topology is not supported on this host: {reason}")]
    TopologyUnsupported { reason: String },

    /// No coretemp hwmon device exists on this host.
    #[error("no coretemp thermal source found")]
    NoThermalSource,

    /// A coretemp device exists but one of its sensor files could not be read.
    #[error("failed to read thermal sensor {}: {source}", path.display())]
    ThermalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No ticks elapsed on a processor between the two snapshots.
    #[error("no ticks elapsed on processor {processor} during the measurement interval")]
    ZeroIntervalTicks { processor: LogicalProcessor },

    /// Topology, temperatures and attribution disagree on the set of processors.
    #[error("processor {processor} has no matching {missing}")]
    IncompleteJoin {
        processor: LogicalProcessor,
        missing: &'static str,
    },

    /// A user-supplied time string matched none of the accepted layouts.
    #[error(
        "time '{input}' must follow one of YY/MM/DD-HH:MM:SS, YY/MM/DD-HH:MM, YY/MM/DD-HH, YY/MM/DD"
    )]
    BadTimeFormat { input: String },

    /// Mutually exclusive run modes were requested together.
    #[error("{message}")]
    ArgumentConflict { message: String },

    /// No run mode was requested.
    #[error("nothing to do: pass --log, --schedule, --view or --create_database")]
    NoModeSelected,

    /// The schedule fields do not describe a usable trigger.
    #[error("invalid schedule: {message}")]
    InvalidSchedule { message: String },

    /// The run flag was cleared while a cycle was in flight.
    #[error("sampling cycle interrupted")]
    Interrupted,

    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SampleError {
    pub fn topology(reason: impl Into<String>) -> Self {
        Self::TopologyUnsupported {
            reason: reason.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::ArgumentConflict {
            message: message.into(),
        }
    }

    pub fn schedule(message: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            message: message.into(),
        }
    }

    /// Whether retrying on the next trigger can never succeed on this host.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            Self::TopologyUnsupported { .. } | Self::NoThermalSource | Self::Interrupted
        )
    }
}
