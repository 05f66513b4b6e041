use std::fmt::{Debug, Display};

use crate::components::DimensionId;

/// Errors raised while interpreting the workload shape, the mapping, or a
/// layout configuration during engine construction.
///
/// All of these indicate a malformed input; the caller is expected to abort
/// rather than retry.
pub enum LayoutSetupError {
    /// A loop or rank references a dimension ID past the dimension table.
    DimensionOutOfRange {
        /// The offending ID.
        dimension: DimensionId,
        /// Number of dimensions in the table.
        count: usize,
    },

    /// A dataspace lists a rank that has no entry in the rank table.
    UnknownRank {
        /// The offending rank name.
        rank: String,
        /// The dataspace that listed it.
        dataspace: String,
    },

    /// A dataspace declares no ranks at all.
    EmptyDataSpace {
        /// The offending dataspace name.
        dataspace: String,
    },

    /// A rank's coefficient vector does not match its dimension list.
    CoefficientArity {
        /// The offending rank name.
        rank: String,
        /// Number of dimensions the rank indexes.
        dimensions: usize,
        /// Number of coefficients provided.
        coefficients: usize,
    },

    /// A rank carries a zero coefficient, which would collapse its extent.
    ZeroCoefficient {
        /// The offending rank name.
        rank: String,
    },

    /// A loop in the mapping has a zero iteration bound.
    ZeroLoopBound {
        /// The dimension the loop iterates.
        dimension: DimensionId,
    },

    /// The storage tiling boundaries do not partition the loop list.
    InvalidBoundaries {
        /// The boundaries as given.
        boundaries: Vec<usize>,
        /// Number of loops in the mapping.
        num_loops: usize,
    },

    /// The number of storage levels disagrees between collaborators.
    LevelCountMismatch {
        /// Levels in the layout skeleton.
        layout: usize,
        /// Levels implied by the mapping boundaries.
        mapping: usize,
    },

    /// The number of dataspaces disagrees between collaborators.
    DataSpaceCountMismatch {
        /// Dataspaces in the layout skeleton.
        layout: usize,
        /// Dataspaces covered by the bypass nest.
        bypass: usize,
    },

    /// No layout entry carries a permutation string.
    MissingPermutation,

    /// A factor token could not be parsed as `rank=value`.
    InvalidFactor {
        /// The offending token.
        token: String,
    },
}

/// Errors raised while materializing a layout from flat design-space IDs.
///
/// Out-of-range IDs are programmer errors in the caller's enumeration; the
/// divisibility variants indicate a corrupted option table and should never
/// occur after a successful init. A capacity violation merely discards the
/// candidate — the engine keeps serving other IDs.
pub enum MaterializeError {
    /// `split_id` does not address a point of the splitting space.
    SplitIdOutOfRange {
        /// The offending ID.
        id: u64,
        /// Size of the splitting space.
        size: u64,
    },

    /// `pack_id` does not address a point of the packing space.
    PackIdOutOfRange {
        /// The offending ID.
        id: u64,
        /// Size of the packing space.
        size: u64,
    },

    /// An option references a rank absent from the target nests.
    RankNotFound {
        /// The offending rank name.
        rank: String,
        /// Storage level index.
        level: usize,
        /// Dataspace index.
        dataspace: usize,
    },

    /// A splitting factor does not divide the current intraline factor.
    NonDivisibleSplit {
        /// The offending rank name.
        rank: String,
        /// Storage level index.
        level: usize,
        /// Dataspace index.
        dataspace: usize,
        /// The splitting factor applied.
        factor: u32,
        /// The intraline factor it failed to divide.
        current: u32,
    },

    /// A packing factor does not divide the current interline factor.
    NonDivisiblePack {
        /// The offending rank name.
        rank: String,
        /// Storage level index.
        level: usize,
        /// Dataspace index.
        dataspace: usize,
        /// The packing factor applied.
        factor: u32,
        /// The interline factor it failed to divide.
        current: u32,
    },

    /// After all transforms, a kept dataspace still overflows its line.
    LineCapacityExceeded {
        /// Storage level index.
        level: usize,
        /// Dataspace index.
        dataspace: usize,
        /// Product of the dataspace's intraline factors.
        intraline: u64,
        /// Words per line at this level.
        capacity: u32,
    },
}

impl Display for LayoutSetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Debug for LayoutSetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutSetupError::DimensionOutOfRange { dimension, count } => {
                writeln!(
                    f,
                    "Dimension ID {dimension} is out of range for a table of {count} dimensions."
                )
            }
            LayoutSetupError::UnknownRank { rank, dataspace } => {
                writeln!(
                    f,
                    "Rank {rank} of dataspace {dataspace} has no entry in the rank table."
                )
            }
            LayoutSetupError::EmptyDataSpace { dataspace } => {
                writeln!(f, "No ranks were provided for dataspace {dataspace}.")
            }
            LayoutSetupError::CoefficientArity {
                rank,
                dimensions,
                coefficients,
            } => {
                writeln!(
                    f,
                    "Rank {rank} indexes {dimensions} dimensions but carries {coefficients} coefficients."
                )
            }
            LayoutSetupError::ZeroCoefficient { rank } => {
                writeln!(f, "Rank {rank} carries a zero coefficient.")
            }
            LayoutSetupError::ZeroLoopBound { dimension } => {
                writeln!(f, "Loop over dimension {dimension} has a zero bound.")
            }
            LayoutSetupError::InvalidBoundaries {
                boundaries,
                num_loops,
            } => {
                writeln!(
                    f,
                    "Storage tiling boundaries {boundaries:?} do not partition a loop list of length {num_loops}: they must be strictly increasing and end at the outermost loop."
                )
            }
            LayoutSetupError::LevelCountMismatch { layout, mapping } => {
                writeln!(
                    f,
                    "Layout skeleton has {layout} storage levels but the mapping implies {mapping}."
                )
            }
            LayoutSetupError::DataSpaceCountMismatch { layout, bypass } => {
                writeln!(
                    f,
                    "Layout skeleton has {layout} dataspaces but the bypass nest covers {bypass}."
                )
            }
            LayoutSetupError::MissingPermutation => {
                writeln!(f, "No permutation key found in any layout entry.")
            }
            LayoutSetupError::InvalidFactor { token } => {
                writeln!(f, "Factor token {token:?} is not of the form rank=value.")
            }
        }
    }
}

impl Display for MaterializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Debug for MaterializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaterializeError::SplitIdOutOfRange { id, size } => {
                writeln!(f, "Splitting ID {id} exceeds the splitting space size {size}.")
            }
            MaterializeError::PackIdOutOfRange { id, size } => {
                writeln!(f, "Packing ID {id} exceeds the packing space size {size}.")
            }
            MaterializeError::RankNotFound {
                rank,
                level,
                dataspace,
            } => {
                writeln!(
                    f,
                    "Rank {rank} not found in the nests for level {level}, dataspace {dataspace}."
                )
            }
            MaterializeError::NonDivisibleSplit {
                rank,
                level,
                dataspace,
                factor,
                current,
            } => {
                writeln!(
                    f,
                    "Splitting factor {factor} does not divide intraline factor {current} for rank {rank} at level {level}, dataspace {dataspace}."
                )
            }
            MaterializeError::NonDivisiblePack {
                rank,
                level,
                dataspace,
                factor,
                current,
            } => {
                writeln!(
                    f,
                    "Packing factor {factor} does not divide interline factor {current} for rank {rank} at level {level}, dataspace {dataspace}."
                )
            }
            MaterializeError::LineCapacityExceeded {
                level,
                dataspace,
                intraline,
                capacity,
            } => {
                writeln!(
                    f,
                    "Dataspace {dataspace} intraline size {intraline} exceeds line capacity {capacity} at level {level}."
                )
            }
        }
    }
}
