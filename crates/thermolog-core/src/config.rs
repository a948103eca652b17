//! Engine configuration.
//!
//! Every reader resolves its files relative to [`SystemPaths`], so the whole
//! engine can run against a fixture tree instead of the live `/proc` and `/sys`.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default measurement interval between the two counter snapshots.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Default delay before reading temperatures in a freshly started process.
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(1);

/// Roots of the procfs and sysfs trees the readers use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPaths {
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
        }
    }
}

impl SystemPaths {
    /// Paths rooted under a single directory containing `proc/` and `sys/`.
    pub fn under(root: &Path) -> Self {
        Self {
            proc_root: root.join("proc"),
            sys_root: root.join("sys"),
        }
    }

    pub fn proc_stat(&self) -> PathBuf {
        self.proc_root.join("stat")
    }

    pub fn cpuinfo(&self) -> PathBuf {
        self.proc_root.join("cpuinfo")
    }

    pub fn hwmon_root(&self) -> PathBuf {
        self.sys_root.join("class").join("hwmon")
    }
}

/// Configuration for one sampling cycle.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub paths: SystemPaths,
    /// Wall-clock time between the two counter snapshots.
    pub interval: Duration,
    /// Sleep before reading temperatures; `None` reads immediately.
    pub warmup: Option<Duration>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            paths: SystemPaths::default(),
            interval: DEFAULT_INTERVAL,
            warmup: None,
        }
    }
}
