//! Series Renderer: rebuild plottable series from stored records.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::types::Record;

/// Which record column a series carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Measurement {
    /// Degrees Celsius.
    Temperature,
    /// Processor usage percent.
    Usage,
}

impl Measurement {
    pub fn value(self, record: &Record) -> f64 {
        match self {
            Self::Temperature => record.temperature_celsius(),
            Self::Usage => record.processor_usage_percent,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Usage => "%",
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature => write!(f, "temperature"),
            Self::Usage => write!(f, "usage"),
        }
    }
}

impl FromStr for Measurement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "temperature" | "temp" => Ok(Self::Temperature),
            "usage" | "cpu_usage" => Ok(Self::Usage),
            other => Err(format!(
                "unknown measurement '{other}', expected temperature or usage"
            )),
        }
    }
}

/// One series per logical processor, or one per physical core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    Processor,
    Core,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub time: NaiveDateTime,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub key: u32,
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

/// Min, mean, max and most recent value of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub last: f64,
    pub count: usize,
}

impl Series {
    /// `None` for an empty series.
    pub fn summary(&self) -> Option<SeriesSummary> {
        let last = self.points.last()?.value;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for point in &self.points {
            min = min.min(point.value);
            max = max.max(point.value);
            sum += point.value;
        }
        Some(SeriesSummary {
            min,
            mean: sum / self.points.len() as f64,
            max,
            last,
            count: self.points.len(),
        })
    }
}

/// Group `records` into series keyed by processor or core, ordered by key.
///
/// With [`Grouping::Core`] every point is the mean over all sibling
/// processors sampled at that same time.
pub fn build_series(records: &[Record], measurement: Measurement, grouping: Grouping) -> Vec<Series> {
    // key -> time -> (sum, count)
    let mut buckets: BTreeMap<u32, BTreeMap<NaiveDateTime, (f64, usize)>> = BTreeMap::new();

    for record in records {
        let key = match grouping {
            Grouping::Processor => record.processor,
            Grouping::Core => record.core,
        };
        let slot = buckets
            .entry(key)
            .or_default()
            .entry(record.time)
            .or_insert((0.0, 0));
        slot.0 += measurement.value(record);
        slot.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(key, points)| Series {
            key,
            label: match grouping {
                Grouping::Processor => format!("Processor {key}"),
                Grouping::Core => format!("Core {key}"),
            },
            points: points
                .into_iter()
                .map(|(time, (sum, count))| SeriesPoint {
                    time,
                    value: sum / count as f64,
                })
                .collect(),
        })
        .collect()
}
