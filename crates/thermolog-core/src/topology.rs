//! Core Topology Resolver: logical processor → physical core.

use std::collections::BTreeMap;

use crate::config::SystemPaths;
use crate::error::{Result, SampleError};
use crate::types::{LogicalProcessor, PhysicalCore};

/// Map of every logical processor to the physical core it belongs to.
pub type Topology = BTreeMap<LogicalProcessor, PhysicalCore>;

/// Read `<proc>/cpuinfo` and build the processor → core map.
pub fn resolve_topology(paths: &SystemPaths) -> Result<Topology> {
    let path = paths.cpuinfo();
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| SampleError::topology(format!("cannot read {}: {e}", path.display())))?;
    parse_cpuinfo(&raw)
}

/// Parse cpuinfo blocks.
///
/// Every non-empty block must carry both `processor` and `core id`; a
/// partial map would silently drop processors from every later join.
pub fn parse_cpuinfo(raw: &str) -> Result<Topology> {
    let mut topology = Topology::new();

    for block in raw.split("\n\n") {
        if block.trim().is_empty() {
            continue;
        }
        let processor = field_value(block, "processor")
            .ok_or_else(|| SampleError::topology("cpuinfo block without a processor id"))?;
        let core = field_value(block, "core id").ok_or_else(|| {
            SampleError::topology(format!("processor {processor} has no core id in cpuinfo"))
        })?;
        topology.insert(processor, core);
    }

    if topology.is_empty() {
        return Err(SampleError::topology("cpuinfo lists no processors"));
    }
    Ok(topology)
}

fn field_value(block: &str, key: &str) -> Option<u32> {
    block.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        if k.trim() == key {
            v.trim().parse::<u32>().ok()
        } else {
            None
        }
    })
}
