use hashbrown::HashMap;

use crate::components::LayoutNest;
use crate::components::space::divisors;

#[derive(Clone, Debug)]
/// One way to pull factors of a rank combination from interline into the
/// line's slack capacity.
pub struct PackingOption {
    /// Index of the dataspace this option transforms.
    pub dataspace: usize,

    /// The ranks involved, in canonical nest order.
    pub ranks: Vec<String>,

    /// Interline factors at enumeration time, per rank.
    pub original_interline: HashMap<String, u32>,

    /// The factor pulled into the line, per rank.
    pub factors: HashMap<String, u32>,

    /// Product of all packing factors.
    pub total_packing: u64,
}

/// Enumerate packing options for one underused (level, dataspace) slot.
///
/// Every rank with an interline factor above 1 participates; its candidate
/// factors are all divisors of that factor, including 1. A single
/// combination — the full candidate set — is walked depth-first with
/// divisors in descending order, recording every assignment that keeps the
/// intraline product within `line_capacity`. Recorded options are then
/// filtered against `pruning_ratio` times the best total packing seen so
/// far; `best_packing` is shared across the whole enumeration sweep and is
/// clamped to this slot's ceiling when it advances.
pub(crate) fn enumerate_packing(
    interline: &LayoutNest,
    dataspace: usize,
    intraline_size: u64,
    line_capacity: u64,
    pruning_ratio: f64,
    best_packing: &mut u64,
) -> Vec<PackingOption> {
    let max_packing = line_capacity / intraline_size;
    if max_packing <= 1 {
        return Vec::new();
    }

    let mut candidates: HashMap<String, Vec<u32>> = HashMap::new();
    let mut combo = Vec::new();
    for rank in &interline.ranks {
        let factor = interline.factor(rank);
        if factor > 1 {
            candidates.insert(rank.clone(), divisors(factor));
            combo.push(rank.clone());
        }
    }
    if combo.is_empty() {
        return Vec::new();
    }

    let mut satisfying = Vec::new();
    let mut chosen = Vec::with_capacity(combo.len());
    walk(
        &combo,
        &candidates,
        0,
        1,
        intraline_size,
        line_capacity,
        &mut chosen,
        &mut satisfying,
    );

    let ceiling = line_capacity.div_ceil(intraline_size);
    let mut options = Vec::new();
    for (factors, total_packing) in satisfying {
        let keeps_pace = total_packing as f64 > pruning_ratio * *best_packing as f64;
        if keeps_pace && intraline_size * total_packing <= line_capacity {
            if total_packing > *best_packing {
                *best_packing = total_packing.min(ceiling);
            }
            options.push(PackingOption {
                dataspace,
                ranks: combo.clone(),
                original_interline: combo
                    .iter()
                    .map(|r| (r.clone(), interline.factor(r)))
                    .collect(),
                factors: combo.iter().cloned().zip(factors).collect(),
                total_packing,
            });
        }
    }
    options
}

/// Exhaustive depth-first walk over candidate factors, descending, pushing
/// every assignment whose packed intraline product stays within the line.
#[allow(clippy::too_many_arguments)]
fn walk(
    combo: &[String],
    candidates: &HashMap<String, Vec<u32>>,
    idx: usize,
    packing: u64,
    intraline_size: u64,
    line_capacity: u64,
    chosen: &mut Vec<u32>,
    out: &mut Vec<(Vec<u32>, u64)>,
) {
    if idx == combo.len() {
        if intraline_size.saturating_mul(packing) <= line_capacity {
            out.push((chosen.clone(), packing));
        }
        return;
    }
    for &factor in candidates[&combo[idx]].iter().rev() {
        chosen.push(factor);
        walk(
            combo,
            candidates,
            idx + 1,
            packing.saturating_mul(factor as u64),
            intraline_size,
            line_capacity,
            chosen,
            out,
        );
        chosen.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nest(factors: &[(&str, u32)]) -> LayoutNest {
        let mut nest = LayoutNest::uniform(
            "ds",
            factors.iter().map(|(r, _)| r.to_string()).collect(),
            1,
        );
        for (rank, factor) in factors {
            nest.set_factor(rank, *factor);
        }
        nest
    }

    #[test]
    fn lone_temporal_rank_packs_the_whole_line() {
        // Interline 16 against an empty 16-word line: the exhaustive walk
        // sees 16, 8, 4, 2, 1 in that order; 16 fits first, and the pruning
        // ratio then discards everything weaker.
        let interline = nest(&[("A", 16)]);
        let mut best = 0;
        let options = enumerate_packing(&interline, 0, 1, 16, 0.9, &mut best);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].original_interline["A"], 16);
        assert_eq!(options[0].factors["A"], 16);
        assert_eq!(options[0].total_packing, 16);
        assert_eq!(best, 16);
    }

    #[test]
    fn oversized_divisors_fall_through_to_the_largest_fit() {
        // Intraline 4, line 16: divisors 16 and 8 of the interline factor
        // overflow, 4 is the best fit and survives alone.
        let interline = nest(&[("A", 16)]);
        let mut best = 0;
        let options = enumerate_packing(&interline, 0, 4, 16, 0.9, &mut best);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].factors["A"], 4);
        assert_eq!(best, 4);
    }

    #[test]
    fn near_best_packings_survive_the_ratio() {
        // Two ranks of 2 x 5 against a line of 10 slack: totals 10, 5, 2, 1.
        // With ratio 0.9 only the 10 survives; with 0.4 the 5 does too.
        let interline = nest(&[("A", 2), ("B", 5)]);
        let mut best = 0;
        let strict = enumerate_packing(&interline, 0, 1, 10, 0.9, &mut best);
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].total_packing, 10);

        let mut best = 0;
        let relaxed = enumerate_packing(&interline, 0, 1, 10, 0.4, &mut best);
        let totals: Vec<u64> = relaxed.iter().map(|o| o.total_packing).collect();
        assert_eq!(totals, vec![10, 5]);
    }

    #[test]
    fn shared_watermark_prunes_across_slots() {
        // A second slot whose best total only matches 90% of the running
        // watermark produces nothing.
        let mut best = 0;
        let first = nest(&[("A", 16)]);
        assert_eq!(
            enumerate_packing(&first, 0, 1, 16, 0.9, &mut best).len(),
            1
        );
        let second = nest(&[("B", 8)]);
        let options = enumerate_packing(&second, 0, 1, 8, 0.9, &mut best);
        assert!(options.is_empty());
        assert_eq!(best, 16);
    }

    #[test]
    fn no_slack_means_no_options() {
        let interline = nest(&[("A", 16)]);
        let mut best = 0;
        // Intraline 9 against a 16-word line: floor(16 / 9) = 1.
        assert!(enumerate_packing(&interline, 0, 9, 16, 0.9, &mut best).is_empty());
    }

    #[test]
    fn all_unit_interline_factors_mean_no_candidates() {
        let interline = nest(&[("A", 1), ("B", 1)]);
        let mut best = 0;
        assert!(enumerate_packing(&interline, 0, 1, 16, 0.9, &mut best).is_empty());
    }
}
