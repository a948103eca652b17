//! One sampling cycle, start to finish.
//!
//! A cycle resolves the topology, brackets `interval` with two counter
//! snapshots, attributes load per processor, reads the coretemp sensors and
//! joins everything into one record per logical processor. Nothing is kept
//! between cycles.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{NaiveDateTime, SubsecRound};
use log::{debug, info};

use crate::attribution::reduce;
use crate::compose::compose;
use crate::config::SamplerConfig;
use crate::counters::{ProcCommands, capture};
use crate::error::{Result, SampleError};
use crate::thermal::CoretempSensors;
use crate::topology::resolve_topology;
use crate::types::{LogicalProcessor, Record};
use crate::utilization::compute_utilization;

/// How often interruptible sleeps check the run flag.
pub(crate) const POLL: Duration = Duration::from_millis(10);

/// Output of one successful cycle.
#[derive(Debug, Clone)]
pub struct Cycle {
    /// Local wall-clock time the cycle started; shared by every record.
    pub sample_time: NaiveDateTime,
    pub records: Vec<Record>,
    /// Busy share of every processor over the interval.
    pub processor_usage: BTreeMap<LogicalProcessor, f64>,
    /// Wall-clock time actually spent between the two snapshots.
    pub measured: Duration,
}

/// Runs sampling cycles against one set of system paths.
#[derive(Debug, Clone)]
pub struct Sampler {
    config: SamplerConfig,
}

impl Sampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Run one cycle with the configured warm-up.
    pub fn run_cycle(&self, running: &AtomicBool) -> Result<Cycle> {
        self.run_cycle_with_warmup(running, self.config.warmup)
    }

    /// Run one cycle, overriding the configured warm-up.
    ///
    /// Fails with [`SampleError::Interrupted`] as soon as `running` is
    /// cleared during either sleep; no partial records are returned.
    pub fn run_cycle_with_warmup(
        &self,
        running: &AtomicBool,
        warmup: Option<Duration>,
    ) -> Result<Cycle> {
        let paths = &self.config.paths;
        // Storage keeps microseconds.
        let sample_time = chrono::Local::now().naive_local().trunc_subsecs(6);

        let topology = resolve_topology(paths)?;
        debug!("topology: {} logical processors", topology.len());

        let t0 = capture(paths)?;
        if !sleep_while_running(self.config.interval, running) {
            return Err(SampleError::Interrupted);
        }
        let t1 = capture(paths)?;
        let measured = t1.taken_at().duration_since(t0.taken_at());
        debug!(
            "captured {} processes over {:.3}s",
            t1.processes().len(),
            measured.as_secs_f64()
        );

        let report = compute_utilization(&t0, &t1, &ProcCommands::new(&paths.proc_root));
        if let Some(&processor) = topology
            .keys()
            .find(|processor| report.degenerate.contains(processor))
        {
            return Err(SampleError::ZeroIntervalTicks { processor });
        }
        let attribution = reduce(&report.processes);

        let sensors = CoretempSensors::discover(paths)?;
        if let Some(delay) = warmup {
            debug!("warming up for {:.3}s before reading temperatures", delay.as_secs_f64());
            if !sleep_while_running(delay, running) {
                return Err(SampleError::Interrupted);
            }
        }
        let temperatures = sensors.read()?;

        let records = compose(&topology, &temperatures, &attribution, sample_time)?;
        info!("sampled {} processors at {sample_time}", records.len());

        Ok(Cycle {
            sample_time,
            records,
            processor_usage: report.processors,
            measured,
        })
    }
}

/// Sleep for `duration`, waking every 10 ms to check `running`.
///
/// Returns `false` if the flag was cleared before the time ran out.
pub fn sleep_while_running(duration: Duration, running: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(POLL.min(deadline - now));
    }
}
