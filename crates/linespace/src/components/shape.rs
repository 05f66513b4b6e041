use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::components::LayoutSetupError;

/// Stable identifier of a problem dimension (a loop variable).
///
/// IDs index the workload's dimension table and never change after the shape
/// is built.
pub type DimensionId = u32;

#[derive(Clone, Debug, Serialize, Deserialize)]
/// Geometry of one storage axis of a dataspace.
pub struct Rank {
    /// Dimension IDs this rank indexes into.
    pub dimensions: Vec<DimensionId>,

    /// Stride multiplier along each indexed dimension.
    pub coefficients: Vec<u32>,

    /// Zero padding applied at the outermost storage level only.
    #[serde(default)]
    pub zero_padding: u32,
}

impl Rank {
    /// A rank over a single dimension with unit stride and no padding.
    pub fn simple(dimension: DimensionId) -> Self {
        Self {
            dimensions: vec![dimension],
            coefficients: vec![1],
            zero_padding: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
/// One logical tensor and the ordered ranks it is stored along.
pub struct DataSpace {
    /// Human-readable tensor name.
    pub name: String,

    /// Rank names, ordered outermost-first in storage.
    pub ranks: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
/// Description of a tensor workload's geometry, independent of any mapping.
///
/// Holds the dimension table (index = [`DimensionId`]), the rank table, and
/// the dataspaces. The dimension ordering is fixed once here and reused
/// everywhere downstream.
pub struct WorkloadShape {
    /// Dimension names, indexed by ID.
    pub dimensions: Vec<String>,

    /// Rank name to geometry.
    pub ranks: HashMap<String, Rank>,

    /// Dataspaces in evaluation order.
    pub dataspaces: Vec<DataSpace>,
}

impl WorkloadShape {
    /// Look up a dimension ID by name.
    pub fn dimension_id(&self, name: &str) -> Option<DimensionId> {
        self.dimensions
            .iter()
            .position(|d| d == name)
            .map(|idx| idx as DimensionId)
    }

    /// Number of problem dimensions.
    pub fn num_dimensions(&self) -> usize {
        self.dimensions.len()
    }

    /// Number of dataspaces.
    pub fn num_dataspaces(&self) -> usize {
        self.dataspaces.len()
    }

    /// The union of all dataspace rank lists, in declaration order.
    pub fn rank_universe(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut universe = Vec::new();
        for ds in &self.dataspaces {
            for rank in &ds.ranks {
                if seen.insert(rank.clone()) {
                    universe.push(rank.clone());
                }
            }
        }
        universe
    }

    /// Check internal consistency: every dataspace has ranks, every rank is
    /// in the table, coefficient vectors match dimension lists, and all
    /// referenced dimensions exist.
    pub fn validate(&self) -> Result<(), LayoutSetupError> {
        for ds in &self.dataspaces {
            if ds.ranks.is_empty() {
                return Err(LayoutSetupError::EmptyDataSpace {
                    dataspace: ds.name.clone(),
                });
            }
            for rank_name in &ds.ranks {
                let rank =
                    self.ranks
                        .get(rank_name)
                        .ok_or_else(|| LayoutSetupError::UnknownRank {
                            rank: rank_name.clone(),
                            dataspace: ds.name.clone(),
                        })?;
                if rank.dimensions.len() != rank.coefficients.len() {
                    return Err(LayoutSetupError::CoefficientArity {
                        rank: rank_name.clone(),
                        dimensions: rank.dimensions.len(),
                        coefficients: rank.coefficients.len(),
                    });
                }
                if rank.coefficients.contains(&0) {
                    return Err(LayoutSetupError::ZeroCoefficient {
                        rank: rank_name.clone(),
                    });
                }
                for &dim in &rank.dimensions {
                    if dim as usize >= self.num_dimensions() {
                        return Err(LayoutSetupError::DimensionOutOfRange {
                            dimension: dim,
                            count: self.num_dimensions(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tensor_shape() -> WorkloadShape {
        let mut ranks = HashMap::new();
        ranks.insert("R".to_string(), Rank::simple(0));
        ranks.insert("C".to_string(), Rank::simple(1));
        ranks.insert(
            "W".to_string(),
            Rank {
                dimensions: vec![0, 1],
                coefficients: vec![1, 1],
                zero_padding: 0,
            },
        );
        WorkloadShape {
            dimensions: vec!["P".to_string(), "Q".to_string()],
            ranks,
            dataspaces: vec![
                DataSpace {
                    name: "Inputs".to_string(),
                    ranks: vec!["W".to_string(), "R".to_string()],
                },
                DataSpace {
                    name: "Outputs".to_string(),
                    ranks: vec!["R".to_string(), "C".to_string()],
                },
            ],
        }
    }

    #[test]
    fn dimension_lookup_follows_table_order() {
        let shape = two_tensor_shape();
        assert_eq!(shape.num_dimensions(), 2);
        assert_eq!(shape.dimension_id("P"), Some(0));
        assert_eq!(shape.dimension_id("Q"), Some(1));
        assert_eq!(shape.dimension_id("Z"), None);
    }

    #[test]
    fn validate_rejects_rank_dimension_past_the_table() {
        let mut shape = two_tensor_shape();
        shape.ranks.get_mut("R").unwrap().dimensions = vec![7];
        assert!(matches!(
            shape.validate(),
            Err(LayoutSetupError::DimensionOutOfRange {
                dimension: 7,
                count: 2,
            })
        ));
    }

    #[test]
    fn rank_universe_dedups_in_declaration_order() {
        let shape = two_tensor_shape();
        assert_eq!(shape.rank_universe(), vec!["W", "R", "C"]);
    }

    #[test]
    fn validate_accepts_consistent_shape() {
        assert!(two_tensor_shape().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_dataspace() {
        let mut shape = two_tensor_shape();
        shape.dataspaces[0].ranks.clear();
        assert!(matches!(
            shape.validate(),
            Err(LayoutSetupError::EmptyDataSpace { .. })
        ));
    }

    #[test]
    fn validate_rejects_coefficient_mismatch() {
        let mut shape = two_tensor_shape();
        shape.ranks.get_mut("W").unwrap().coefficients.pop();
        assert!(matches!(
            shape.validate(),
            Err(LayoutSetupError::CoefficientArity { .. })
        ));
    }

    #[test]
    fn validate_rejects_unknown_rank() {
        let mut shape = two_tensor_shape();
        shape.dataspaces[1].ranks.push("Z".to_string());
        assert!(matches!(
            shape.validate(),
            Err(LayoutSetupError::UnknownRank { .. })
        ));
    }
}
