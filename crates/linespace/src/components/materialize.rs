//! Reconstruction of a layout from flat design-space IDs.
//!
//! A flat ID is a mixed-radix number over the participating (level,
//! dataspace) slots, peeled outermost level first and outermost dataspace
//! first within each level. Slots with no options contribute radix 1 and
//! decode to a no-op.

use crate::components::space::DesignSpace;
use crate::components::{ArchView, Layouts, MaterializeError};

/// Decode a flat ID into one option choice per (level, dataspace) slot.
pub(crate) fn decode_choices(mut id: u64, counts: &[Vec<u64>], arch: &ArchView) -> Vec<Vec<u64>> {
    let num_levels = counts.len();
    let num_dataspaces = counts.first().map(|c| c.len()).unwrap_or(0);
    let mut choices = vec![vec![0u64; num_dataspaces]; num_levels];
    for lvl in (0..num_levels).rev() {
        for ds_idx in (0..num_dataspaces).rev() {
            let radix = if counts[lvl][ds_idx] > 0 && arch.is_kept(lvl, ds_idx) {
                counts[lvl][ds_idx]
            } else {
                1
            };
            choices[lvl][ds_idx] = id % radix;
            id /= radix;
        }
    }
    choices
}

/// Apply the chosen splitting option of every slot: move each rank's factor
/// from intraline to interline. Choices past a slot's option count are
/// no-ops.
pub(crate) fn apply_splitting(
    layouts: &mut Layouts,
    space: &DesignSpace,
    choices: &[Vec<u64>],
) -> Result<(), MaterializeError> {
    for (lvl, level_choices) in choices.iter().enumerate() {
        for (ds_idx, &choice) in level_choices.iter().enumerate() {
            let options = &space.splitting[lvl][ds_idx];
            let Some(option) = options.get(choice as usize) else {
                continue;
            };
            for rank in &option.ranks {
                let factor = option.factors[rank];
                let level = &mut layouts.levels[lvl];
                if !level.intraline[ds_idx].factors.contains_key(rank)
                    || !level.interline[ds_idx].factors.contains_key(rank)
                {
                    return Err(MaterializeError::RankNotFound {
                        rank: rank.clone(),
                        level: lvl,
                        dataspace: ds_idx,
                    });
                }
                let current_intraline = level.intraline[ds_idx].factor(rank);
                let current_interline = level.interline[ds_idx].factor(rank);
                if current_intraline % factor != 0 {
                    return Err(MaterializeError::NonDivisibleSplit {
                        rank: rank.clone(),
                        level: lvl,
                        dataspace: ds_idx,
                        factor,
                        current: current_intraline,
                    });
                }
                level.intraline[ds_idx].set_factor(rank, current_intraline / factor);
                level.interline[ds_idx].set_factor(rank, current_interline * factor);
            }
        }
    }
    Ok(())
}

/// Apply the chosen packing option of every slot: move each rank's factor
/// from interline to intraline. Choices past a slot's option count are
/// no-ops.
pub(crate) fn apply_packing(
    layouts: &mut Layouts,
    space: &DesignSpace,
    choices: &[Vec<u64>],
) -> Result<(), MaterializeError> {
    for (lvl, level_choices) in choices.iter().enumerate() {
        for (ds_idx, &choice) in level_choices.iter().enumerate() {
            let options = &space.packing[lvl][ds_idx];
            let Some(option) = options.get(choice as usize) else {
                continue;
            };
            for rank in &option.ranks {
                let factor = option.factors[rank];
                let level = &mut layouts.levels[lvl];
                if !level.intraline[ds_idx].factors.contains_key(rank)
                    || !level.interline[ds_idx].factors.contains_key(rank)
                {
                    return Err(MaterializeError::RankNotFound {
                        rank: rank.clone(),
                        level: lvl,
                        dataspace: ds_idx,
                    });
                }
                let current_intraline = level.intraline[ds_idx].factor(rank);
                let current_interline = level.interline[ds_idx].factor(rank);
                if current_interline % factor != 0 {
                    return Err(MaterializeError::NonDivisiblePack {
                        rank: rank.clone(),
                        level: lvl,
                        dataspace: ds_idx,
                        factor,
                        current: current_interline,
                    });
                }
                level.intraline[ds_idx].set_factor(rank, current_intraline * factor);
                level.interline[ds_idx].set_factor(rank, current_interline / factor);
            }
        }
    }
    Ok(())
}

/// Check the line-capacity invariant for every kept (level, dataspace).
pub(crate) fn check_line_capacity(
    layouts: &Layouts,
    arch: &ArchView,
) -> Result<(), MaterializeError> {
    for lvl in 0..layouts.num_levels() {
        let capacity = arch.line_capacity(lvl);
        for ds_idx in 0..layouts.num_dataspaces() {
            if !arch.is_kept(lvl, ds_idx) {
                continue;
            }
            let intraline = layouts.levels[lvl].intraline[ds_idx].product();
            if intraline > capacity as u64 {
                return Err(MaterializeError::LineCapacityExceeded {
                    level: lvl,
                    dataspace: ds_idx,
                    intraline,
                    capacity,
                });
            }
        }
    }
    Ok(())
}
