//! Enumeration of the legal layout transformations.
//!
//! The concordant layout may overflow a level's line (hardware fans out more
//! than a line holds) or underuse it (the line has slack). Per (level,
//! dataspace) this module enumerates the two orthogonal remedies: *splitting*
//! options that move factors out of the line and *packing* options that pull
//! factors in. Each family is indexed by a flat mixed-radix ID over all
//! participating (level, dataspace) slots.

mod packing;
mod splitting;

pub use packing::*;
pub use splitting::*;

use crate::components::{ArchView, Layouts, SpaceOptions};

/// All divisors of `n`, ascending, including 1 and `n`.
pub(crate) fn divisors(n: u32) -> Vec<u32> {
    (1..=n).filter(|d| n % d == 0).collect()
}

/// All combinations of `items` indices of size 1 to `max_size`, smallest
/// size first, each in ascending index order.
pub(crate) fn combinations<T: Clone>(items: &[T], max_size: usize) -> Vec<Vec<T>> {
    let mut out = Vec::new();
    let mut current = Vec::new();

    fn extend<T: Clone>(
        items: &[T],
        size: usize,
        start: usize,
        current: &mut Vec<T>,
        out: &mut Vec<Vec<T>>,
    ) {
        if current.len() == size {
            out.push(current.clone());
            return;
        }
        for idx in start..items.len() {
            current.push(items[idx].clone());
            extend(items, size, idx + 1, current, out);
            current.pop();
        }
    }

    for size in 1..=max_size.min(items.len()) {
        extend(items, size, 0, &mut current, &mut out);
    }
    out
}

#[derive(Clone, Debug, Default)]
/// The enumerated design space: per-(level, dataspace) option tables and the
/// flat sizes of the two ID spaces.
pub struct DesignSpace {
    /// Splitting options, indexed `[level][dataspace][option]`.
    pub splitting: Vec<Vec<Vec<SplittingOption>>>,

    /// Packing options, indexed `[level][dataspace][option]`.
    pub packing: Vec<Vec<Vec<PackingOption>>>,

    /// Option counts per slot; 0 marks a slot that contributes radix 1.
    pub splitting_counts: Vec<Vec<u64>>,

    /// Option counts per slot; 0 marks a slot that contributes radix 1.
    pub packing_counts: Vec<Vec<u64>>,

    /// Size of the flat splitting space.
    pub splitting_total: u64,

    /// Size of the flat packing space.
    pub packing_total: u64,
}

impl DesignSpace {
    /// Enumerate both transformation families for `layouts` against the
    /// per-level line capacities.
    pub fn enumerate(layouts: &Layouts, arch: &ArchView, options: &SpaceOptions) -> Self {
        let num_levels = layouts.num_levels();
        let num_dataspaces = layouts.num_dataspaces();

        // What each kept dataspace currently delivers per line.
        let mut intraline_size = vec![vec![0u64; num_dataspaces]; num_levels];
        for lvl in 0..num_levels {
            for ds_idx in 0..num_dataspaces {
                if arch.is_kept(lvl, ds_idx) {
                    intraline_size[lvl][ds_idx] = layouts.levels[lvl].intraline[ds_idx].product();
                }
            }
        }

        let mut splitting = vec![vec![Vec::new(); num_dataspaces]; num_levels];
        let mut packing = vec![vec![Vec::new(); num_dataspaces]; num_levels];
        // Best total packing seen anywhere so far; drives the pruning ratio.
        let mut best_packing = 0u64;

        for lvl in 0..num_levels {
            let line_capacity = arch.line_capacity(lvl) as u64;
            for ds_idx in 0..num_dataspaces {
                if !arch.is_kept(lvl, ds_idx) {
                    continue;
                }
                let size = intraline_size[lvl][ds_idx];
                if line_capacity < size {
                    splitting[lvl][ds_idx] = enumerate_splitting(
                        &layouts.levels[lvl].intraline[ds_idx],
                        ds_idx,
                        size,
                        line_capacity,
                        options.max_split_ranks,
                    );
                    log::trace!(
                        "{} dataspace {ds_idx}: intraline {size} over line {line_capacity}, {} splitting options",
                        arch.level_name(lvl),
                        splitting[lvl][ds_idx].len()
                    );
                } else if line_capacity > size {
                    packing[lvl][ds_idx] = enumerate_packing(
                        &layouts.levels[lvl].interline[ds_idx],
                        ds_idx,
                        size,
                        line_capacity,
                        options.packing_pruning_ratio,
                        &mut best_packing,
                    );
                    log::trace!(
                        "{} dataspace {ds_idx}: intraline {size} under line {line_capacity}, {} packing options",
                        arch.level_name(lvl),
                        packing[lvl][ds_idx].len()
                    );
                }
                // Equal size: the line is a perfect fit, nothing to do.
            }
        }

        let mut space = Self {
            splitting,
            packing,
            splitting_counts: vec![vec![0; num_dataspaces]; num_levels],
            packing_counts: vec![vec![0; num_dataspaces]; num_levels],
            splitting_total: 1,
            packing_total: 1,
        };
        for lvl in 0..num_levels {
            for ds_idx in 0..num_dataspaces {
                let n_split = space.splitting[lvl][ds_idx].len() as u64;
                if n_split > 0 {
                    space.splitting_counts[lvl][ds_idx] = n_split;
                    space.splitting_total = space.splitting_total.saturating_mul(n_split);
                }
                let n_pack = space.packing[lvl][ds_idx].len() as u64;
                if n_pack > 0 {
                    space.packing_counts[lvl][ds_idx] = n_pack;
                    space.packing_total = space.packing_total.saturating_mul(n_pack);
                }
            }
        }

        log::debug!(
            "design space: {} splitting x {} packing candidates",
            space.splitting_total,
            space.packing_total
        );
        space
    }
}
