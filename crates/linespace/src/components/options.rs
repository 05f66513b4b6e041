#[derive(Clone, Copy, Debug)]
/// Tunables for design-space enumeration.
pub struct SpaceOptions {
    /// Keep only packings whose total factor exceeds this ratio of the best
    /// total seen so far. Filters out weak packings that would clutter the
    /// space.
    pub packing_pruning_ratio: f64,

    /// Largest number of ranks a splitting combination may involve.
    pub max_split_ranks: usize,
}

impl Default for SpaceOptions {
    fn default() -> Self {
        Self {
            packing_pruning_ratio: 0.9,
            max_split_ranks: 3,
        }
    }
}
