pub mod init;
pub mod sample;
pub mod schedule;
pub mod view;

use std::path::Path;
use std::sync::atomic::AtomicBool;

use serde::Serialize;
use thermolog_core::{RecordStore, Result, SqliteStore};

use crate::plan::RunPlan;

/// Run every step of `plan` in order: create, log, then schedule or view.
pub fn execute(plan: &RunPlan, running: &AtomicBool) -> Result<()> {
    if plan.create_database {
        return init::run(&plan.database);
    }
    if let Some(sampler) = &plan.log {
        sample::run(&plan.database, sampler, running)?;
    }
    if let Some(scheduled) = &plan.schedule {
        schedule::run(&plan.database, scheduled, running)?;
    }
    if let Some(request) = &plan.view {
        view::run(&plan.database, request)?;
    }
    Ok(())
}

/// Open the database, creating the schema on first use.
pub fn open_store(path: &Path) -> Result<SqliteStore> {
    let mut store = SqliteStore::open(path)?;
    store.initialize()?;
    Ok(store)
}

/// Pretty-print `value` as JSON to `path`.
pub fn write_json<T: Serialize>(value: &T, path: &Path, label: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    println!("{label} written to {}", path.display());
    Ok(())
}
