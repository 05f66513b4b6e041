use hashbrown::HashMap;

use crate::components::LayoutNest;
use crate::components::space::{combinations, divisors};

#[derive(Clone, Debug)]
/// One way to move factors of a rank combination from intraline to
/// interline so the dataspace fits back under the line capacity.
pub struct SplittingOption {
    /// Index of the dataspace this option transforms.
    pub dataspace: usize,

    /// The ranks involved, in canonical nest order.
    pub ranks: Vec<String>,

    /// Intraline factors at enumeration time, per rank.
    pub original_intraline: HashMap<String, u32>,

    /// The factor moved out of the line, per rank.
    pub factors: HashMap<String, u32>,

    /// Product of all splitting factors.
    pub total_reduction: u64,
}

/// Enumerate splitting options for one oversized (level, dataspace) slot.
///
/// Candidate factors per rank are the divisors > 1 of its intraline factor.
/// Combinations of up to `max_combo_size` ranks are walked smallest first;
/// for each combination the first factor assignment (ascending divisor
/// order) that brings the intraline product under `line_capacity` is
/// recorded, one option per combination. A combination that cannot satisfy
/// the bound yields nothing, and a line capacity of zero yields no options
/// at all — the slot is left to fail the post-materialization check.
pub(crate) fn enumerate_splitting(
    intraline: &LayoutNest,
    dataspace: usize,
    intraline_size: u64,
    line_capacity: u64,
    max_combo_size: usize,
) -> Vec<SplittingOption> {
    if line_capacity == 0 {
        return Vec::new();
    }

    let mut candidates: HashMap<String, Vec<u32>> = HashMap::new();
    let mut candidate_ranks = Vec::new();
    for rank in &intraline.ranks {
        let factor = intraline.factor(rank);
        if factor > 1 {
            let valid: Vec<u32> = divisors(factor).into_iter().filter(|&d| d > 1).collect();
            if !valid.is_empty() {
                candidates.insert(rank.clone(), valid);
                candidate_ranks.push(rank.clone());
            }
        }
    }

    let mut options = Vec::new();
    for combo in combinations(&candidate_ranks, max_combo_size) {
        let mut chosen = Vec::with_capacity(combo.len());
        if first_fit(
            &combo,
            &candidates,
            0,
            1,
            intraline_size,
            line_capacity,
            &mut chosen,
        ) {
            let total_reduction: u64 = chosen.iter().map(|&f| f as u64).product();
            options.push(SplittingOption {
                dataspace,
                original_intraline: combo
                    .iter()
                    .map(|r| (r.clone(), intraline.factor(r)))
                    .collect(),
                factors: combo.iter().cloned().zip(chosen).collect(),
                ranks: combo,
                total_reduction,
            });
        }
    }
    options
}

/// Depth-first search for the first factor assignment that satisfies the
/// capacity bound. Divisors are walked in ascending order, so the hit keeps
/// as much of the line as possible.
fn first_fit(
    combo: &[String],
    candidates: &HashMap<String, Vec<u32>>,
    idx: usize,
    reduction: u64,
    intraline_size: u64,
    line_capacity: u64,
    chosen: &mut Vec<u32>,
) -> bool {
    if idx == combo.len() {
        return intraline_size / reduction <= line_capacity;
    }
    for &factor in &candidates[&combo[idx]] {
        chosen.push(factor);
        if first_fit(
            combo,
            candidates,
            idx + 1,
            reduction * factor as u64,
            intraline_size,
            line_capacity,
            chosen,
        ) {
            return true;
        }
        chosen.pop();
    }
    false
}
