//! `--schedule`: sample on every trigger until Ctrl+C.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use thermolog_core::{
    HostHandle, RecordStore, Result, SampleError, Sampler, Scheduler, Trigger, local_hostname,
};

use crate::plan::ScheduledLog;

pub fn run(database: &Path, scheduled: &ScheduledLog, running: &AtomicBool) -> Result<()> {
    let mut store = super::open_store(database)?;
    let identifier = local_hostname();
    let sampler = Sampler::new(scheduled.sampler.clone());

    println!("Scheduled sampling");
    println!("  Host:     {identifier}");
    match scheduled.schedule.trigger {
        Trigger::Cron(fields) => println!("  Trigger:  cron {fields:?}"),
        Trigger::Interval(period) => println!("  Trigger:  every {}s", period.as_secs()),
    }
    match scheduled.schedule.misfire_grace {
        Some(grace) => println!("  Misfire:  {:.1}s grace", grace.as_secs_f64()),
        None => println!("  Misfire:  late cycles always run"),
    }
    println!("  Database: {}", database.display());
    println!("  Stop with Ctrl+C");
    println!();

    let scheduler = Scheduler::new(scheduled.schedule.clone());
    let mut host: Option<HostHandle> = None;
    let result = scheduler.run(running, |warm| {
        let warmup = if warm { scheduled.warmup } else { None };
        let cycle = sampler.run_cycle_with_warmup(running, warmup)?;
        let handle = match host.take() {
            Some(handle) => handle,
            None => store.get_or_create_host(&identifier)?,
        };
        let stored = super::sample::store_cycle(&mut store, &handle, &cycle);
        host = Some(handle);
        stored
    });
    match result {
        // Ctrl+C is the normal way to end a schedule.
        Err(SampleError::Interrupted) => {
            println!("Schedule stopped.");
            Ok(())
        }
        other => other,
    }
}
