//! CLI for thermolog: log, schedule and view per-core temperature and CPU load.

mod commands;
mod exit_code;
mod plan;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use log::warn;
use thermolog_core::SampleError;

use crate::exit_code::ExitCode;
use crate::plan::RunPlan;

#[derive(Parser, Debug)]
#[command(name = "thermolog")]
#[command(about = "Logs and views per-core CPU temperature and utilization")]
#[command(version = thermolog_core::VERSION)]
pub struct Cli {
    /// Create the database schema and exit
    #[arg(long = "create_database")]
    pub create_database: bool,

    /// Take one sample now (runs before --schedule or --view)
    #[arg(long)]
    pub log: bool,

    /// Seconds between the two counter snapshots of a sample
    #[arg(long, default_value_t = 1.0)]
    pub interval: f64,

    /// Seconds to wait before reading temperatures in a fresh process
    #[arg(long, default_value_t = 1.0)]
    pub warmup: f64,

    /// Keep sampling on a cron or interval schedule until Ctrl+C
    #[arg(long)]
    pub schedule: bool,

    /// Schedule type: cron (calendar fields) or interval (summed period)
    #[arg(long = "job_type")]
    pub job_type: Option<String>,

    #[arg(long, visible_alias = "years")]
    pub year: Option<i32>,

    #[arg(long, visible_alias = "months")]
    pub month: Option<u32>,

    /// ISO week number (cron) or number of weeks (interval)
    #[arg(long, visible_alias = "weeks")]
    pub week: Option<u32>,

    #[arg(long, visible_alias = "days")]
    pub day: Option<u32>,

    #[arg(long, visible_alias = "hours")]
    pub hour: Option<u32>,

    #[arg(long, visible_alias = "minutes")]
    pub minute: Option<u32>,

    #[arg(long, visible_alias = "seconds")]
    pub second: Option<u32>,

    /// Seconds a scheduled sample may start late before it is skipped (default: never)
    #[arg(long)]
    pub misfire: Option<f64>,

    /// Show stored history
    #[arg(long)]
    pub view: bool,

    /// Host to view (defaults to this machine)
    #[arg(long)]
    pub host: Option<String>,

    /// temperature or usage
    #[arg(long, default_value = "temperature")]
    pub measurement: String,

    /// Only records after this time (YY/MM/DD[-HH[:MM[:SS]]])
    #[arg(long = "start_time")]
    pub start_time: Option<String>,

    /// Only records before this time (YY/MM/DD[-HH[:MM[:SS]]])
    #[arg(long = "end_time")]
    pub end_time: Option<String>,

    /// Limit the view to the current login session
    #[arg(long = "this_session")]
    pub this_session: bool,

    /// Average sibling processors into one series per physical core
    #[arg(long)]
    pub core: bool,

    /// Write the viewed series as JSON to this path
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, env = "THERMOLOG_DB", default_value = "thermolog.db")]
    pub database: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let plan = match RunPlan::from_cli(&cli) {
        Ok(plan) => plan,
        Err(e) => fail(&e),
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Ctrl+C handler unavailable: {e}");
    }

    if let Err(e) = commands::execute(&plan, &running) {
        fail(&e);
    }
}

fn fail(error: &SampleError) -> ! {
    eprintln!("Error: {error}");
    std::process::exit(ExitCode::from(error).into());
}
