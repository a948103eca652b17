//! Sample Composer: join topology, temperatures and attribution into records.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::attribution::Attribution;
use crate::error::{Result, SampleError};
use crate::thermal::Temperatures;
use crate::topology::Topology;
use crate::types::{LogicalProcessor, Record};

/// Build one record per processor in `topology`, all stamped `sample_time`.
///
/// Temperatures are keyed by physical core, so sibling hyperthreads report
/// the same reading. Any gap fails the whole batch.
pub fn compose(
    topology: &Topology,
    temperatures: &Temperatures,
    attribution: &BTreeMap<LogicalProcessor, Attribution>,
    sample_time: NaiveDateTime,
) -> Result<Vec<Record>> {
    topology
        .iter()
        .map(|(&processor, &core)| -> Result<Record> {
            let temperature = temperatures
                .get(&core)
                .copied()
                .ok_or(SampleError::IncompleteJoin {
                    processor,
                    missing: "temperature",
                })?;
            let load = attribution
                .get(&processor)
                .ok_or(SampleError::IncompleteJoin {
                    processor,
                    missing: "process attribution",
                })?;
            Ok(Record {
                core,
                processor,
                processor_usage_percent: load.processor_usage_percent,
                heaviest_process_command: load.heaviest_process_command.clone(),
                heaviest_process_usage_percent: load.heaviest_process_usage_percent,
                temperature_millidegrees: temperature,
                time: sample_time,
            })
        })
        .collect()
}
