//! `--view`: print stored series for one host and optionally export them.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;
use thermolog_core::{
    Grouping, Measurement, Record, RecordStore, Result, Series, SeriesSummary, SqliteStore,
    SystemPaths, TimeRange, build_series, local_hostname, resolve_window, session_window,
};

use crate::plan::ViewRequest;

#[derive(Serialize)]
struct ViewReport<'a> {
    host: &'a str,
    measurement: Measurement,
    unit: &'static str,
    grouping: Grouping,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
    series: Vec<SeriesEntry>,
}

#[derive(Serialize)]
struct SeriesEntry {
    #[serde(flatten)]
    series: Series,
    summary: Option<SeriesSummary>,
}

pub fn run(database: &Path, request: &ViewRequest) -> Result<()> {
    let store = super::open_store(database)?;
    let identifier = request.host.clone().unwrap_or_else(local_hostname);

    let session = if request.this_session {
        Some(session_window(&SystemPaths::default())?)
    } else {
        None
    };
    let range = resolve_window(request.from, request.to, session);

    let Some(records) = load(&store, &identifier, range)? else {
        println!("No records for host '{identifier}'.");
        let known = store.hosts()?;
        if !known.is_empty() {
            println!("Known hosts: {}", known.join(", "));
        }
        return Ok(());
    };

    let series = build_series(&records, request.measurement, request.grouping);
    print_table(&identifier, request.measurement, range, &series);

    if let Some(path) = &request.output {
        let report = ViewReport {
            host: &identifier,
            measurement: request.measurement,
            unit: request.measurement.unit(),
            grouping: request.grouping,
            from: range.from,
            to: range.to,
            series: series
                .into_iter()
                .map(|series| SeriesEntry {
                    summary: series.summary(),
                    series,
                })
                .collect(),
        };
        super::write_json(&report, path, "Series")?;
    }
    Ok(())
}

/// `None` when the host was never recorded; viewing never creates hosts.
fn load(store: &SqliteStore, identifier: &str, range: TimeRange) -> Result<Option<Vec<Record>>> {
    match store.find_host(identifier)? {
        Some(host) => Ok(Some(store.query_records(&host, range)?)),
        None => Ok(None),
    }
}

fn print_table(host: &str, measurement: Measurement, range: TimeRange, series: &[Series]) {
    let bound = |t: Option<NaiveDateTime>| {
        t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    println!("{measurement} on {host}");
    println!("  Window: {} .. {}", bound(range.from), bound(range.to));
    println!();

    if series.is_empty() {
        println!("  No records in this window.");
        return;
    }

    let unit = measurement.unit();
    println!(
        "  {:<14} {:>7} {:>10} {:>10} {:>10} {:>10}",
        "Series", "Points", "Min", "Mean", "Max", "Last"
    );
    println!("  {}", "-".repeat(66));
    for s in series {
        let Some(summary) = s.summary() else {
            continue;
        };
        println!(
            "  {:<14} {:>7} {:>10} {:>10} {:>10} {:>10}",
            s.label,
            summary.count,
            format!("{:.1}{unit}", summary.min),
            format!("{:.1}{unit}", summary.mean),
            format!("{:.1}{unit}", summary.max),
            format!("{:.1}{unit}", summary.last),
        );
    }
}
