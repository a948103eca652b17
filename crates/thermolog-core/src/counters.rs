//! Counter Reader: cumulative per-processor and per-process tick counters.
//!
//! Sources:
//! - `<proc>/stat`: one `cpuN` line per logical processor, columns
//!   `user nice system idle iowait irq softirq steal guest guest_nice`.
//! - `<proc>/<pid>/stat`: `utime` (field 14), `stime` (field 15) and the
//!   processor the task last ran on (field 39).
//!
//! Everything here is a pure read + parse. Deltas live in
//! [`crate::utilization`].

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, trace};

use crate::config::SystemPaths;
use crate::error::{Result, SampleError};
use crate::types::{LogicalProcessor, Pid};

const STAT_IDLE: usize = 3;
const STAT_IOWAIT: usize = 4;
/// `guest` and `guest_nice` are already folded into `user` and `nice`.
const STAT_ACCOUNTED_COLUMNS: usize = 8;

/// Positions inside `<pid>/stat` counted from the field after `comm`.
const PID_STAT_UTIME: usize = 11;
const PID_STAT_STIME: usize = 12;
const PID_STAT_PROCESSOR: usize = 36;

/// Cumulative ticks of one logical processor since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTicks {
    pub total: u64,
    /// Ticks not spent in idle or iowait.
    pub used: u64,
}

/// Cumulative ticks of one process since it started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTicks {
    pub user: u64,
    pub system: u64,
    /// Processor the process last ran on.
    pub processor: LogicalProcessor,
    /// Short command name from the `(comm)` field.
    pub comm: String,
}

impl ProcessTicks {
    pub fn busy(&self) -> u64 {
        self.user.saturating_add(self.system)
    }
}

/// Point-in-time capture of every processor and process counter.
#[derive(Debug, Clone)]
pub struct CounterSnapshot {
    taken_at: Instant,
    cpus: BTreeMap<LogicalProcessor, CpuTicks>,
    processes: HashMap<Pid, ProcessTicks>,
}

impl CounterSnapshot {
    pub fn new(
        cpus: BTreeMap<LogicalProcessor, CpuTicks>,
        processes: HashMap<Pid, ProcessTicks>,
    ) -> Self {
        Self {
            taken_at: Instant::now(),
            cpus,
            processes,
        }
    }

    pub fn taken_at(&self) -> Instant {
        self.taken_at
    }

    pub fn cpus(&self) -> &BTreeMap<LogicalProcessor, CpuTicks> {
        &self.cpus
    }

    pub fn processes(&self) -> &HashMap<Pid, ProcessTicks> {
        &self.processes
    }
}

/// Capture processor and process counters back to back.
pub fn capture(paths: &SystemPaths) -> Result<CounterSnapshot> {
    let cpus = capture_cpu_counters(paths)?;
    let processes = capture_process_counters(paths)?;
    debug!(
        "captured counters for {} processors and {} processes",
        cpus.len(),
        processes.len()
    );
    Ok(CounterSnapshot::new(cpus, processes))
}

/// Read `<proc>/stat` once and return the ticks of every `cpuN` line.
pub fn capture_cpu_counters(paths: &SystemPaths) -> Result<BTreeMap<LogicalProcessor, CpuTicks>> {
    let path = paths.proc_stat();
    let raw = std::fs::read_to_string(&path)
        .map_err(|source| SampleError::CounterUnavailable { path, source })?;
    Ok(parse_proc_stat(&raw))
}

/// Enumerate `<proc>/<pid>/stat` for every live process.
///
/// Processes that exit while being read are skipped.
pub fn capture_process_counters(paths: &SystemPaths) -> Result<HashMap<Pid, ProcessTicks>> {
    let root = &paths.proc_root;
    let entries = std::fs::read_dir(root).map_err(|source| SampleError::CounterUnavailable {
        path: root.clone(),
        source,
    })?;

    let mut processes = HashMap::with_capacity(512);
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|s| s.parse::<Pid>().ok()) else {
            continue;
        };
        let stat_path = entry.path().join("stat");
        let raw = match std::fs::read_to_string(&stat_path) {
            Ok(raw) => raw,
            Err(e) => {
                trace!("skipping pid {pid}: {e}");
                continue;
            }
        };
        if let Some((parsed_pid, ticks)) = parse_pid_stat(&raw)
            && parsed_pid == pid
        {
            processes.insert(pid, ticks);
        }
    }
    Ok(processes)
}

/// Parse the per-processor lines of `/proc/stat`.
///
/// The aggregate `cpu` line and malformed lines are ignored.
pub fn parse_proc_stat(raw: &str) -> BTreeMap<LogicalProcessor, CpuTicks> {
    let mut cpus = BTreeMap::new();
    for line in raw.lines() {
        let Some(rest) = line.strip_prefix("cpu") else {
            continue;
        };
        if !rest.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let mut fields = rest.split_whitespace();
        let Some(id) = fields.next().and_then(|s| s.parse::<LogicalProcessor>().ok()) else {
            continue;
        };
        let Ok(columns) = fields
            .take(STAT_ACCOUNTED_COLUMNS)
            .map(str::parse::<u64>)
            .collect::<std::result::Result<Vec<u64>, _>>()
        else {
            continue;
        };
        if columns.len() <= STAT_IDLE {
            continue;
        }
        let total: u64 = columns.iter().sum();
        let idle = columns[STAT_IDLE] + columns.get(STAT_IOWAIT).copied().unwrap_or(0);
        cpus.insert(
            id,
            CpuTicks {
                total,
                used: total.saturating_sub(idle),
            },
        );
    }
    cpus
}

/// Parse one `/proc/<pid>/stat` line.
///
/// `comm` may itself contain spaces and parentheses, so positional fields
/// are counted from the last `)`.
pub fn parse_pid_stat(raw: &str) -> Option<(Pid, ProcessTicks)> {
    let open = raw.find('(')?;
    let close = raw.rfind(')')?;
    if close <= open {
        return None;
    }
    let pid = raw[..open].trim().parse::<Pid>().ok()?;
    let comm = raw[open + 1..close].to_string();
    let fields: Vec<&str> = raw[close + 1..].split_whitespace().collect();

    let field = |idx: usize| fields.get(idx).and_then(|s| s.parse::<u64>().ok());
    let user = field(PID_STAT_UTIME)?;
    let system = field(PID_STAT_STIME)?;
    let processor = LogicalProcessor::try_from(field(PID_STAT_PROCESSOR)?).ok()?;

    Some((
        pid,
        ProcessTicks {
            user,
            system,
            processor,
            comm,
        },
    ))
}

/// Resolves the command line that launched a process.
pub trait CommandSource {
    /// Full command line, or `None` if it is empty or the process is gone.
    fn command_line(&self, pid: Pid) -> Option<String>;
}

/// Reads `<proc>/<pid>/cmdline`.
#[derive(Debug, Clone)]
pub struct ProcCommands {
    proc_root: PathBuf,
}

impl ProcCommands {
    pub fn new(proc_root: &Path) -> Self {
        Self {
            proc_root: proc_root.to_path_buf(),
        }
    }
}

impl CommandSource for ProcCommands {
    fn command_line(&self, pid: Pid) -> Option<String> {
        let raw = std::fs::read(self.proc_root.join(pid.to_string()).join("cmdline")).ok()?;
        normalize_cmdline(&raw)
    }
}

#[cfg(test)]
impl CommandSource for HashMap<Pid, String> {
    fn command_line(&self, pid: Pid) -> Option<String> {
        self.get(&pid).filter(|s| !s.is_empty()).cloned()
    }
}

/// Join NUL-separated argv into one space-separated string.
pub fn normalize_cmdline(raw: &[u8]) -> Option<String> {
    let joined = String::from_utf8_lossy(raw).replace('\0', " ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
