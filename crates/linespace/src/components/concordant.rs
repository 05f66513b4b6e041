//! Derivation of the initial layout from the tiled loop nest.
//!
//! The layout built here is *concordant* with the mapping: spatial fan-out
//! becomes intraline factors (iterations delivered by one line) and temporal
//! tiling becomes interline factors (iterations that walk across lines).

use crate::components::{
    ArchView, DimensionId, LayoutSetupError, Layouts, Mapping, Spacetime,
};

/// Per-level, per-dimension cumulative bound products distilled from the
/// loop nest.
pub(crate) struct LoopProducts {
    /// Cumulative spatial product, propagated from inner levels only
    /// through levels that have spatial loops of their own.
    pub cumulative_intraline: Vec<Vec<u32>>,

    /// Unconditional cumulative product of all bounds up to each level.
    pub cumulative_overall: Vec<Vec<u32>>,
}

impl LoopProducts {
    /// Bucket every loop's bound by its storage level and spacetime class,
    /// then fold the per-level buckets into the two cumulative families.
    pub(crate) fn collect(
        mapping: &Mapping,
        num_dimensions: usize,
    ) -> Result<Self, LayoutSetupError> {
        let num_levels = mapping.num_storage_levels();
        let mut intraline = vec![vec![1u32; num_dimensions]; num_levels];
        let mut interline = vec![vec![1u32; num_dimensions]; num_levels];

        for (idx, l) in mapping.loops.iter().enumerate() {
            let dim = l.dimension as usize;
            if dim >= num_dimensions {
                return Err(LayoutSetupError::DimensionOutOfRange {
                    dimension: l.dimension,
                    count: num_dimensions,
                });
            }
            let level = mapping.level_of(idx);
            let bucket = match l.spacetime {
                Spacetime::Spatial => &mut intraline[level][dim],
                Spacetime::Temporal => &mut interline[level][dim],
            };
            *bucket = bucket.saturating_mul(l.bound);
        }

        let overall: Vec<Vec<u32>> = (0..num_levels)
            .map(|lvl| {
                (0..num_dimensions)
                    .map(|dim| intraline[lvl][dim].saturating_mul(interline[lvl][dim]))
                    .collect()
            })
            .collect();

        // Intraline footprints only accumulate through levels that fan out
        // spatially themselves; a purely temporal level serves its inner tile
        // one line at a time, so the chain restarts there.
        let mut cumulative_intraline = vec![vec![1u32; num_dimensions]; num_levels];
        cumulative_intraline[0] = intraline[0].clone();
        for lvl in 1..num_levels {
            let spatial_here = intraline[lvl].iter().any(|&v| v > 1);
            for dim in 0..num_dimensions {
                cumulative_intraline[lvl][dim] = if spatial_here {
                    intraline[lvl][dim].saturating_mul(cumulative_intraline[lvl - 1][dim])
                } else {
                    intraline[lvl][dim]
                };
            }
        }

        let mut cumulative_overall = vec![vec![1u32; num_dimensions]; num_levels];
        cumulative_overall[0] = overall[0].clone();
        for lvl in 1..num_levels {
            for dim in 0..num_dimensions {
                cumulative_overall[lvl][dim] =
                    overall[lvl][dim].saturating_mul(cumulative_overall[lvl - 1][dim]);
            }
        }

        Ok(Self {
            cumulative_intraline,
            cumulative_overall,
        })
    }
}

/// Fold per-dimension values into one rank extent.
///
/// Single-dimension ranks take the value directly. Multi-dimension ranks sum
/// coefficient-weighted contributions; the last dimension's index range is
/// half-open, so its contribution loses one, and a unit-valued dimension
/// contributes nothing there.
fn fold_rank(dimensions: &[DimensionId], coefficients: &[u32], per_dim: &[u32]) -> u32 {
    if dimensions.len() == 1 {
        return per_dim[dimensions[0] as usize];
    }
    let last = dimensions.len() - 1;
    let mut total = 0u32;
    for (idx, &dim) in dimensions.iter().enumerate() {
        let v = per_dim[dim as usize];
        let contribution = if v == 1 {
            if idx < last { 1 } else { 0 }
        } else if idx < last {
            v.saturating_mul(coefficients[idx])
        } else {
            v.saturating_mul(coefficients[idx]) - 1
        };
        total = total.saturating_add(contribution);
    }
    total
}

/// Overwrite the factors of `layouts` with the concordant assignment for
/// `mapping`.
///
/// For every kept (level, dataspace, rank), the intraline factor is the
/// cumulative spatial extent of the rank and the interline factor covers the
/// rest of the rank's extent. Bypassed dataspaces collapse to intraline 1
/// with the full extent pushed interline.
pub(crate) fn build_concordant(
    layouts: &mut Layouts,
    mapping: &Mapping,
    arch: &ArchView,
) -> Result<(), LayoutSetupError> {
    let num_dimensions = layouts.dimension_order.len();
    let products = LoopProducts::collect(mapping, num_dimensions)?;
    let num_levels = layouts.num_levels();

    for lvl in 0..num_levels {
        for ds_idx in 0..layouts.num_dataspaces() {
            let ranks = layouts.levels[lvl].intraline[ds_idx].ranks.clone();
            for rank in &ranks {
                let dimensions = layouts
                    .rank_to_dimensions
                    .get(rank)
                    .ok_or_else(|| LayoutSetupError::UnknownRank {
                        rank: rank.clone(),
                        dataspace: layouts.dataspaces[ds_idx].clone(),
                    })?
                    .clone();
                let coefficients = layouts.rank_to_coefficients[rank].clone();
                let zero_padding = if lvl == num_levels - 1 {
                    layouts.zero_padding(rank)
                } else {
                    0
                };

                let total_intraline = fold_rank(
                    &dimensions,
                    &coefficients,
                    &products.cumulative_intraline[lvl],
                );
                let total_rank_size =
                    fold_rank(&dimensions, &coefficients, &products.cumulative_overall[lvl]);
                debug_assert!(total_intraline > 0, "rank {rank} collapsed to zero extent");

                let padded = total_rank_size.saturating_sub(2 * zero_padding);
                let total_interline = padded.div_ceil(total_intraline);

                let level = &mut layouts.levels[lvl];
                if arch.is_kept(lvl, ds_idx) {
                    level.intraline[ds_idx].set_factor(rank, total_intraline);
                    level.interline[ds_idx].set_factor(rank, total_interline);
                } else {
                    level.intraline[ds_idx].set_factor(rank, 1);
                    level.interline[ds_idx].set_factor(rank, total_rank_size);
                }
            }
        }
    }
    Ok(())
}
