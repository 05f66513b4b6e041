use std::fmt::Display;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::components::{DimensionId, LayoutSetupError, StorageLevelSpec, WorkloadShape};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Which side of a level's layout a config entry describes.
pub enum NestKind {
    /// Iterations spanning lines.
    Interline,
    /// Iterations inside one line.
    Intraline,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
/// One entry of a layout configuration list.
///
/// `factors` is a whitespace-separated list of `rank=value` tokens;
/// `permutation` reads outermost-to-innermost left to right, one character
/// per rank, whitespace ignored.
pub struct LayoutEntry {
    /// The storage level this entry targets.
    pub target: String,

    /// Interline or intraline side.
    #[serde(rename = "type")]
    pub kind: NestKind,

    /// Factor string, e.g. `"R=3 S=3 P=7"`.
    pub factors: String,

    /// Permutation string, e.g. `"SR CQP MN"`.
    #[serde(default)]
    pub permutation: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// Factor assignment along the canonical rank order of one dataspace.
pub struct LayoutNest {
    /// The dataspace this nest belongs to.
    pub dataspace: String,

    /// Canonical rank order, innermost-first.
    pub ranks: Vec<String>,

    /// Per-rank factors. Absent ranks count as 1.
    pub factors: HashMap<String, u32>,
}

impl LayoutNest {
    /// A nest over `ranks` with every factor set to `value`.
    pub fn uniform(dataspace: impl Into<String>, ranks: Vec<String>, value: u32) -> Self {
        let factors = ranks.iter().map(|r| (r.clone(), value)).collect();
        Self {
            dataspace: dataspace.into(),
            ranks,
            factors,
        }
    }

    /// The factor of `rank`, defaulting to 1 when unset.
    pub fn factor(&self, rank: &str) -> u32 {
        self.factors.get(rank).copied().unwrap_or(1)
    }

    /// Set the factor of `rank`.
    pub fn set_factor(&mut self, rank: &str, value: u32) {
        self.factors.insert(rank.to_string(), value);
    }

    /// Product of the factors over the canonical rank order.
    pub fn product(&self) -> u64 {
        self.ranks
            .iter()
            .map(|r| self.factor(r) as u64)
            .product()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
/// The two nests of every dataspace at one storage level.
pub struct LevelLayout {
    /// Name of the storage level this layout targets.
    pub target: String,

    /// Number of read ports.
    pub num_read_ports: u32,

    /// Number of write ports.
    pub num_write_ports: u32,

    /// Across-line nests, one per dataspace.
    pub interline: Vec<LayoutNest>,

    /// Within-line nests, one per dataspace.
    pub intraline: Vec<LayoutNest>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
/// A complete physical layout: per-level, per-dataspace factor nests plus
/// the workload metadata needed to interpret them.
pub struct Layouts {
    /// Dimension names ordered by ID.
    pub dimension_order: Vec<String>,

    /// Global rank universe, outermost-first.
    pub rank_list: Vec<String>,

    /// Dataspace names in evaluation order.
    pub dataspaces: Vec<String>,

    /// Rank name to the dimension IDs it indexes.
    pub rank_to_dimensions: HashMap<String, Vec<DimensionId>>,

    /// Rank name to its stride coefficients.
    pub rank_to_coefficients: HashMap<String, Vec<u32>>,

    /// Rank name to its zero-padding count.
    pub rank_to_zero_padding: HashMap<String, u32>,

    /// Dataspace name to its ordered rank list.
    pub dataspace_to_ranks: HashMap<String, Vec<String>>,

    /// Whether address generation may assume zero padding.
    pub assume_zero_padding: bool,

    /// Whether the cost model may assume a row buffer.
    pub assume_row_buffer: bool,

    /// Whether the cost model may assume line reuse.
    pub assume_reuse: bool,

    /// Per-level layouts, innermost storage level first.
    pub levels: Vec<LevelLayout>,
}

/// Parse a whitespace-separated list of `rank=value` tokens.
fn parse_factors(factors: &str) -> Result<HashMap<String, u32>, LayoutSetupError> {
    let mut parsed = HashMap::new();
    for token in factors.split_whitespace() {
        let (rank, value) = token
            .split_once('=')
            .ok_or_else(|| LayoutSetupError::InvalidFactor {
                token: token.to_string(),
            })?;
        let value = value
            .parse::<u32>()
            .map_err(|_| LayoutSetupError::InvalidFactor {
                token: token.to_string(),
            })?;
        parsed.insert(rank.to_string(), value);
    }
    Ok(parsed)
}

/// Restrict a permutation to one dataspace's ranks and flip it to
/// innermost-first nest order.
fn nest_order(permutation: &str, dataspace_ranks: &[String]) -> Vec<String> {
    let mut order: Vec<String> = permutation
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_string())
        .filter(|r| dataspace_ranks.contains(r))
        .collect();
    order.reverse();
    order
}

impl Layouts {
    /// Build the shared metadata block from the workload shape.
    fn metadata(shape: &WorkloadShape, rank_list: Vec<String>) -> Self {
        let mut rank_to_dimensions = HashMap::new();
        let mut rank_to_coefficients = HashMap::new();
        let mut rank_to_zero_padding = HashMap::new();
        for (name, rank) in &shape.ranks {
            rank_to_dimensions.insert(name.clone(), rank.dimensions.clone());
            rank_to_coefficients.insert(name.clone(), rank.coefficients.clone());
            rank_to_zero_padding.insert(name.clone(), rank.zero_padding);
        }
        let dataspace_to_ranks = shape
            .dataspaces
            .iter()
            .map(|ds| (ds.name.clone(), ds.ranks.clone()))
            .collect();

        Self {
            dimension_order: shape.dimensions.clone(),
            rank_list,
            dataspaces: shape.dataspaces.iter().map(|ds| ds.name.clone()).collect(),
            rank_to_dimensions,
            rank_to_coefficients,
            rank_to_zero_padding,
            dataspace_to_ranks,
            assume_zero_padding: true,
            assume_row_buffer: true,
            assume_reuse: true,
            levels: Vec::new(),
        }
    }

    /// Construct a blank layout: one level per storage spec, every factor 1.
    ///
    /// This is the skeleton handed to the engine, which overwrites the
    /// factors with the concordant assignment.
    pub fn skeleton(
        shape: &WorkloadShape,
        levels: &[StorageLevelSpec],
    ) -> Result<Self, LayoutSetupError> {
        shape.validate()?;

        let mut layouts = Self::metadata(shape, shape.rank_universe());
        for spec in levels {
            let interline = shape
                .dataspaces
                .iter()
                .map(|ds| LayoutNest::uniform(ds.name.clone(), ds.ranks.clone(), 1))
                .collect();
            let intraline = shape
                .dataspaces
                .iter()
                .map(|ds| LayoutNest::uniform(ds.name.clone(), ds.ranks.clone(), 1))
                .collect();
            layouts.levels.push(LevelLayout {
                target: spec.name.clone(),
                num_read_ports: spec.num_read_ports,
                num_write_ports: spec.num_write_ports,
                interline,
                intraline,
            });
        }
        Ok(layouts)
    }

    /// Construct layouts from a configuration entry list.
    ///
    /// At least one entry must carry a permutation; it defines the global
    /// rank order. Levels without an entry for a side fall back to the
    /// dataspace rank order with unit factors.
    pub fn from_entries(
        entries: &[LayoutEntry],
        shape: &WorkloadShape,
        levels: &[StorageLevelSpec],
    ) -> Result<Self, LayoutSetupError> {
        shape.validate()?;

        let sample_permutation = entries
            .iter()
            .map(|e| e.permutation.trim())
            .find(|p| !p.is_empty())
            .ok_or(LayoutSetupError::MissingPermutation)?;
        let rank_list: Vec<String> = sample_permutation
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_string())
            .collect();

        // target -> side -> (permutation, factors)
        let mut config: HashMap<(String, NestKind), (String, HashMap<String, u32>)> =
            HashMap::new();
        for entry in entries {
            let factors = parse_factors(&entry.factors)?;
            config.insert(
                (entry.target.clone(), entry.kind),
                (entry.permutation.clone(), factors),
            );
        }

        let mut layouts = Self::metadata(shape, rank_list);
        for spec in levels {
            let build_side = |kind: NestKind, default_factor: Option<u32>| -> Vec<LayoutNest> {
                shape
                    .dataspaces
                    .iter()
                    .map(|ds| match config.get(&(spec.name.clone(), kind)) {
                        Some((permutation, factors)) => LayoutNest {
                            dataspace: ds.name.clone(),
                            ranks: nest_order(permutation, &ds.ranks),
                            factors: factors.clone(),
                        },
                        None => {
                            let factors = match default_factor {
                                Some(value) => {
                                    ds.ranks.iter().map(|r| (r.clone(), value)).collect()
                                }
                                None => HashMap::new(),
                            };
                            LayoutNest {
                                dataspace: ds.name.clone(),
                                ranks: ds.ranks.clone(),
                                factors,
                            }
                        }
                    })
                    .collect()
            };

            let interline = build_side(NestKind::Interline, None);
            let intraline = build_side(NestKind::Intraline, Some(1));
            layouts.levels.push(LevelLayout {
                target: spec.name.clone(),
                num_read_ports: spec.num_read_ports,
                num_write_ports: spec.num_write_ports,
                interline,
                intraline,
            });
        }
        Ok(layouts)
    }

    /// Number of storage levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Number of dataspaces.
    pub fn num_dataspaces(&self) -> usize {
        self.dataspaces.len()
    }

    /// Zero padding of `rank`, defaulting to 0.
    pub fn zero_padding(&self, rank: &str) -> u32 {
        self.rank_to_zero_padding.get(rank).copied().unwrap_or(0)
    }
}

impl Display for Layouts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Dimension Order: ")?;
        for (id, dim) in self.dimension_order.iter().enumerate() {
            if id > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{dim}-{id}")?;
        }
        writeln!(f)?;

        write!(f, "Rank List:")?;
        for rank in &self.rank_list {
            write!(f, " {rank}")?;
        }
        writeln!(f)?;

        for level in &self.levels {
            writeln!(f, "Target: {}", level.target)?;
            writeln!(
                f,
                " num_read_ports: {}, num_write_ports: {}",
                level.num_read_ports, level.num_write_ports
            )?;
            for (ds_idx, name) in self.dataspaces.iter().enumerate() {
                writeln!(f, "  Data space: {name}")?;
                for (label, nest) in [
                    ("interline", &level.interline[ds_idx]),
                    ("intraline", &level.intraline[ds_idx]),
                ] {
                    write!(f, "    {label}: ")?;
                    for (i, rank) in nest.ranks.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{rank}={}", nest.factor(rank))?;
                    }
                    writeln!(f)?;
                }
            }
        }
        Ok(())
    }
}
