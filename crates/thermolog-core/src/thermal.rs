//! Thermal Reader: per-core temperatures from the coretemp hwmon device.
//!
//! Discovery and reading are split so a caller can sleep between them: the
//! heat of launching the sampler itself would otherwise show up on whichever
//! core ran the launch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::config::SystemPaths;
use crate::error::{Result, SampleError};
use crate::types::PhysicalCore;

const CORETEMP: &str = "coretemp";

/// Temperatures in millidegrees Celsius keyed by physical core.
pub type Temperatures = BTreeMap<PhysicalCore, i64>;

/// One `tempN_input` file paired with the core its label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreSensor {
    pub core: PhysicalCore,
    pub label: String,
    pub input: PathBuf,
}

/// The per-core sensors exposed by the coretemp device.
#[derive(Debug, Clone)]
pub struct CoretempSensors {
    device: PathBuf,
    sensors: Vec<CoreSensor>,
}

impl CoretempSensors {
    /// Locate the coretemp device and its per-core sensor labels.
    pub fn discover(paths: &SystemPaths) -> Result<Self> {
        let device = find_coretemp(&paths.hwmon_root())?;
        let sensors = core_sensors(&device)?;
        debug!(
            "coretemp at {} exposes {} core sensors",
            device.display(),
            sensors.len()
        );
        Ok(Self { device, sensors })
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    pub fn sensors(&self) -> &[CoreSensor] {
        &self.sensors
    }

    /// Read every sensor input once.
    pub fn read(&self) -> Result<Temperatures> {
        let mut temperatures = Temperatures::new();
        for sensor in &self.sensors {
            let value = read_trimmed(&sensor.input)?;
            let millidegrees = value.parse::<i64>().map_err(|e| SampleError::ThermalRead {
                path: sensor.input.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })?;
            temperatures.insert(sensor.core, millidegrees);
        }
        Ok(temperatures)
    }
}

/// Discover and read in one step, without a warm-up pause.
pub fn read_temperatures(paths: &SystemPaths) -> Result<Temperatures> {
    CoretempSensors::discover(paths)?.read()
}

fn find_coretemp(hwmon_root: &Path) -> Result<PathBuf> {
    let Ok(entries) = std::fs::read_dir(hwmon_root) else {
        return Err(SampleError::NoThermalSource);
    };
    let mut devices: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    devices.sort();

    let mut matches = devices.into_iter().filter(|dir| {
        std::fs::read_to_string(dir.join("name"))
            .map(|name| name.trim().eq_ignore_ascii_case(CORETEMP))
            .unwrap_or(false)
    });

    let device = matches.next().ok_or(SampleError::NoThermalSource)?;
    if let Some(extra) = matches.next() {
        warn!(
            "multiple coretemp devices found, using {} and ignoring {}",
            device.display(),
            extra.display()
        );
    }
    Ok(device)
}

fn core_sensors(device: &Path) -> Result<Vec<CoreSensor>> {
    let entries = std::fs::read_dir(device).map_err(|source| SampleError::ThermalRead {
        path: device.to_path_buf(),
        source,
    })?;

    let mut sensors = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stem) = file_name.strip_suffix("_label") else {
            continue;
        };
        let label = read_trimmed(&path)?;
        if !label.to_ascii_lowercase().contains("core") {
            continue;
        }
        let Some(core) = first_number(&label) else {
            warn!("coretemp label '{label}' names no core index, skipping");
            continue;
        };
        sensors.push(CoreSensor {
            core,
            label,
            input: device.join(format!("{stem}_input")),
        });
    }
    sensors.sort_by_key(|s| s.core);
    Ok(sensors)
}

fn read_trimmed(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| SampleError::ThermalRead {
            path: path.to_path_buf(),
            source,
        })
}

/// First run of ASCII digits in `text`.
fn first_number(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
