//! `--log`: take one sample now and store it.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use log::info;
use thermolog_core::{
    Cycle, HostHandle, RecordStore, Result, Sampler, SamplerConfig, SqliteStore, local_hostname,
};

pub fn run(database: &Path, config: &SamplerConfig, running: &AtomicBool) -> Result<()> {
    let mut store = super::open_store(database)?;
    let identifier = local_hostname();

    println!(
        "Sampling {identifier} for {:.1}s...",
        config.interval.as_secs_f64()
    );
    let cycle = Sampler::new(config.clone()).run_cycle(running)?;
    // Hosts come into being with their first records.
    let host = store.get_or_create_host(&identifier)?;
    store_cycle(&mut store, &host, &cycle)?;
    print_cycle(&cycle);
    Ok(())
}

/// Append one cycle's records as a single batch.
pub fn store_cycle(store: &mut SqliteStore, host: &HostHandle, cycle: &Cycle) -> Result<()> {
    store.append_records(host, &cycle.records)?;
    info!(
        "stored {} records for {} at {}",
        cycle.records.len(),
        host.identifier,
        cycle.sample_time
    );
    Ok(())
}

pub fn print_cycle(cycle: &Cycle) {
    println!();
    println!("  Sample at {}", cycle.sample_time.format("%Y-%m-%d %H:%M:%S"));
    println!(
        "  {:>4} {:>4} {:>8} {:>8} {:>8}  {}",
        "CPU", "Core", "Temp", "Usage", "Top", "Heaviest process"
    );
    println!("  {}", "-".repeat(72));
    for r in &cycle.records {
        println!(
            "  {:>4} {:>4} {:>6.1}°C {:>7.1}% {:>7.1}%  {}",
            r.processor,
            r.core,
            r.temperature_celsius(),
            r.processor_usage_percent,
            r.heaviest_process_usage_percent,
            truncate(&r.heaviest_process_command, 40)
        );
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
