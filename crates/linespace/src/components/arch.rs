use serde::{Deserialize, Serialize};

use crate::components::Mapping;

#[derive(Clone, Debug, Serialize, Deserialize)]
/// Raw description of one storage level, as read from an architecture spec.
///
/// Every field except the name is optional; absent values fall back the same
/// way the hardware model treats them.
pub struct StorageLevelSpec {
    /// Level name, e.g. `RegFile` or `GlobalBuffer`.
    pub name: String,

    /// Total capacity in words. Absent means unbounded.
    #[serde(default)]
    pub size: Option<u64>,

    /// Words per line. Absent falls back to the peak bandwidth.
    #[serde(default)]
    pub block_size: Option<u64>,

    /// Peak read bandwidth in words per cycle.
    #[serde(default)]
    pub read_bandwidth: Option<f64>,

    /// Peak write bandwidth in words per cycle.
    #[serde(default)]
    pub write_bandwidth: Option<f64>,

    /// Number of read ports.
    #[serde(default = "default_ports")]
    pub num_read_ports: u32,

    /// Number of write ports.
    #[serde(default = "default_ports")]
    pub num_write_ports: u32,
}

fn default_ports() -> u32 {
    1
}

impl StorageLevelSpec {
    /// A level with only a name; all capacity fields unspecified.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            block_size: None,
            read_bandwidth: None,
            write_bandwidth: None,
            num_read_ports: 1,
            num_write_ports: 1,
        }
    }

    /// Set the total capacity in words.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the line width in words.
    pub fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Set read/write bandwidth in words per cycle.
    pub fn with_bandwidth(mut self, read: f64, write: f64) -> Self {
        self.read_bandwidth = Some(read);
        self.write_bandwidth = Some(write);
        self
    }
}

#[derive(Clone, Debug)]
/// The two integers that drive all layout decisions at one level.
pub(crate) struct LevelCapacity {
    /// Level name, kept for diagnostics.
    name: String,

    /// Total words the level can hold. Saturates at `u32::MAX`.
    total: u32,

    /// Words accessible in parallel per line. Saturates at `u32::MAX`.
    line: u32,
}

#[derive(Clone, Debug)]
/// Distilled view of the memory hierarchy: per-level capacities plus the
/// keep/bypass matrix, everything the design-space machinery needs.
pub struct ArchView {
    levels: Vec<LevelCapacity>,
    kept: Vec<Vec<bool>>,
}

impl ArchView {
    /// Distill `specs` into per-level capacities and materialize the keep
    /// matrix from the mapping's bypass nest.
    pub fn new(specs: &[StorageLevelSpec], mapping: &Mapping, num_dataspaces: usize) -> Self {
        let levels = specs
            .iter()
            .map(|spec| {
                let total = spec.size.unwrap_or(u64::MAX);
                let line = match spec.block_size {
                    Some(block_size) => block_size,
                    None => {
                        let read = spec.read_bandwidth.unwrap_or(0.0);
                        let write = spec.write_bandwidth.unwrap_or(0.0);
                        read.max(write) as u64
                    }
                };
                if line == 0 {
                    log::warn!(
                        "storage level {} has neither block size nor bandwidth; its line capacity is 0",
                        spec.name
                    );
                }
                LevelCapacity {
                    name: spec.name.clone(),
                    total: total.min(u32::MAX as u64) as u32,
                    line: line.min(u32::MAX as u64) as u32,
                }
            })
            .collect::<Vec<_>>();

        let kept = (0..levels.len())
            .map(|level| {
                (0..num_dataspaces)
                    .map(|ds| mapping.bypass.is_kept(ds, level))
                    .collect()
            })
            .collect();

        Self { levels, kept }
    }

    /// Number of storage levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Number of dataspaces in the keep matrix.
    pub fn num_dataspaces(&self) -> usize {
        self.kept.first().map(|row| row.len()).unwrap_or(0)
    }

    /// Total capacity in words at `level`.
    pub fn total_capacity(&self, level: usize) -> u32 {
        self.levels[level].total
    }

    /// Words per line at `level`.
    pub fn line_capacity(&self, level: usize) -> u32 {
        self.levels[level].line
    }

    /// Name of `level`, for diagnostics.
    pub fn level_name(&self, level: usize) -> &str {
        &self.levels[level].name
    }

    /// Whether `dataspace` is physically stored at `level`.
    pub fn is_kept(&self, level: usize, dataspace: usize) -> bool {
        self.kept[level][dataspace]
    }
}
