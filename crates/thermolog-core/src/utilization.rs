//! Utilization Engine: tick deltas between two counter snapshots.
//!
//! Percentages are not clamped. Process ticks and processor ticks are read
//! a few microseconds apart, so the per-process shares on a busy processor
//! can add up to slightly more than 100.

use std::collections::{BTreeMap, BTreeSet};

use crate::counters::{CommandSource, CounterSnapshot};
use crate::error::{Result, SampleError};
use crate::types::{LogicalProcessor, ProcessSample};

/// Per-processor and per-process utilization over one interval.
#[derive(Debug, Clone, Default)]
pub struct UtilizationReport {
    /// Busy share of each processor with a non-zero tick delta.
    pub processors: BTreeMap<LogicalProcessor, f64>,
    /// Processors whose total tick delta was zero.
    pub degenerate: BTreeSet<LogicalProcessor>,
    /// One sample per process seen in both snapshots, ascending by usage.
    pub processes: Vec<ProcessSample>,
}

impl UtilizationReport {
    /// Usage of one processor, or why it has none this cycle.
    pub fn processor_usage(&self, processor: LogicalProcessor) -> Result<Option<f64>> {
        if self.degenerate.contains(&processor) {
            return Err(SampleError::ZeroIntervalTicks { processor });
        }
        Ok(self.processors.get(&processor).copied())
    }
}

/// Compare two snapshots taken `interval` apart.
///
/// Only processes present under the same pid in both snapshots produce a
/// sample; the processor a process is charged to comes from `t1`.
pub fn compute_utilization(
    t0: &CounterSnapshot,
    t1: &CounterSnapshot,
    commands: &impl CommandSource,
) -> UtilizationReport {
    let mut report = UtilizationReport::default();
    let mut delta_totals: BTreeMap<LogicalProcessor, u64> = BTreeMap::new();

    for (&processor, end) in t1.cpus() {
        let Some(start) = t0.cpus().get(&processor) else {
            continue;
        };
        let delta_total = end.total.saturating_sub(start.total);
        if delta_total == 0 {
            report.degenerate.insert(processor);
            continue;
        }
        let delta_used = end.used.saturating_sub(start.used);
        report
            .processors
            .insert(processor, delta_used as f64 / delta_total as f64 * 100.0);
        delta_totals.insert(processor, delta_total);
    }

    for (&pid, end) in t1.processes() {
        let Some(start) = t0.processes().get(&pid) else {
            continue;
        };
        let Some(&delta_total) = delta_totals.get(&end.processor) else {
            continue;
        };
        let delta_ticks = end.busy().saturating_sub(start.busy());
        let command = commands
            .command_line(pid)
            .unwrap_or_else(|| format!("[{}]", end.comm));
        report.processes.push(ProcessSample {
            pid,
            processor: end.processor,
            usage_percent: delta_ticks as f64 / delta_total as f64 * 100.0,
            command,
        });
    }

    report.processes.sort_by(|a, b| {
        a.usage_percent
            .total_cmp(&b.usage_percent)
            .then(a.pid.cmp(&b.pid))
    });
    report
}
