//! Process Attribution Reducer: heaviest process and summed load per processor.

use std::collections::BTreeMap;

use crate::types::{LogicalProcessor, ProcessSample};

/// Load summary of one logical processor.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    /// Sum of every process share charged to the processor.
    pub processor_usage_percent: f64,
    pub heaviest_process_command: String,
    pub heaviest_process_usage_percent: f64,
}

/// Group samples by processor, summing their shares and keeping the largest.
///
/// On equal shares the later sample wins, matching a stable ascending sort
/// followed by last-writer-wins. Input order is otherwise irrelevant.
pub fn reduce(samples: &[ProcessSample]) -> BTreeMap<LogicalProcessor, Attribution> {
    let mut out: BTreeMap<LogicalProcessor, Attribution> = BTreeMap::new();

    for sample in samples {
        out.entry(sample.processor)
            .and_modify(|acc| {
                acc.processor_usage_percent += sample.usage_percent;
                if sample.usage_percent >= acc.heaviest_process_usage_percent {
                    acc.heaviest_process_usage_percent = sample.usage_percent;
                    acc.heaviest_process_command.clone_from(&sample.command);
                }
            })
            .or_insert_with(|| Attribution {
                processor_usage_percent: sample.usage_percent,
                heaviest_process_command: sample.command.clone(),
                heaviest_process_usage_percent: sample.usage_percent,
            });
    }

    out
}
