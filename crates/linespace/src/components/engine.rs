use crate::components::concordant::build_concordant;
use crate::components::materialize::{
    apply_packing, apply_splitting, check_line_capacity, decode_choices,
};
use crate::components::space::DesignSpace;
use crate::components::{
    ArchView, LayoutSetupError, Layouts, Mapping, MaterializeError, SpaceOptions,
};

/// The layout design-space engine.
///
/// Construction derives the concordant layout for the mapping and enumerates
/// its legal splitting and packing transformations once; afterwards the
/// engine is immutable. [`materialize`](Self::materialize) is a pure function
/// over that cached state, so parallel search workers may share one engine
/// as long as each keeps its own output layout.
pub struct LayoutSpace {
    arch: ArchView,
    concordant: Layouts,
    space: DesignSpace,
}

impl LayoutSpace {
    /// Build the engine with default enumeration options.
    pub fn new(
        arch: ArchView,
        mapping: &Mapping,
        skeleton: Layouts,
    ) -> Result<Self, LayoutSetupError> {
        Self::with_options(arch, mapping, skeleton, SpaceOptions::default())
    }

    /// Build the engine with explicit enumeration options.
    pub fn with_options(
        arch: ArchView,
        mapping: &Mapping,
        skeleton: Layouts,
        options: SpaceOptions,
    ) -> Result<Self, LayoutSetupError> {
        mapping.validate()?;
        if skeleton.num_levels() != mapping.num_storage_levels()
            || arch.num_levels() != mapping.num_storage_levels()
        {
            return Err(LayoutSetupError::LevelCountMismatch {
                layout: skeleton.num_levels(),
                mapping: mapping.num_storage_levels(),
            });
        }
        if skeleton.num_dataspaces() != mapping.bypass.num_dataspaces() {
            return Err(LayoutSetupError::DataSpaceCountMismatch {
                layout: skeleton.num_dataspaces(),
                bypass: mapping.bypass.num_dataspaces(),
            });
        }

        let mut concordant = skeleton;
        build_concordant(&mut concordant, mapping, &arch)?;
        let space = DesignSpace::enumerate(&concordant, &arch, &options);
        log::debug!(
            "layout engine ready: {} levels, {} dataspaces, {} x {} candidates",
            concordant.num_levels(),
            concordant.num_dataspaces(),
            space.splitting_total,
            space.packing_total
        );

        Ok(Self {
            arch,
            concordant,
            space,
        })
    }

    /// The initial layout concordant with the mapping.
    pub fn concordant(&self) -> &Layouts {
        &self.concordant
    }

    /// The enumerated option tables.
    pub fn space(&self) -> &DesignSpace {
        &self.space
    }

    /// Number of distinct splitting configurations.
    pub fn splitting_space_size(&self) -> u64 {
        self.space.splitting_total
    }

    /// Number of distinct packing configurations.
    pub fn packing_space_size(&self) -> u64 {
        self.space.packing_total
    }

    /// Reconstruct the layout addressed by `(split_id, pack_id)`.
    ///
    /// Starts from a fresh copy of the concordant layout, applies the
    /// decoded splitting then packing choices, and validates the
    /// line-capacity invariant for every kept (level, dataspace). The
    /// returned layout is owned by the caller; the engine is unchanged.
    pub fn materialize(
        &self,
        split_id: u64,
        pack_id: u64,
    ) -> Result<Layouts, MaterializeError> {
        if split_id >= self.space.splitting_total {
            return Err(MaterializeError::SplitIdOutOfRange {
                id: split_id,
                size: self.space.splitting_total,
            });
        }
        if pack_id >= self.space.packing_total {
            return Err(MaterializeError::PackIdOutOfRange {
                id: pack_id,
                size: self.space.packing_total,
            });
        }

        let mut layouts = self.concordant.clone();

        let split_choices = decode_choices(split_id, &self.space.splitting_counts, &self.arch);
        apply_splitting(&mut layouts, &self.space, &split_choices)?;

        let pack_choices = decode_choices(pack_id, &self.space.packing_counts, &self.arch);
        apply_packing(&mut layouts, &self.space, &pack_choices)?;

        check_line_capacity(&layouts, &self.arch)?;
        Ok(layouts)
    }

    /// Push intraline factors wholesale to the interline side, rank by rank,
    /// until each kept dataspace fits its line again.
    ///
    /// A blunt fallback for callers that want one legal-by-construction
    /// layout without searching the design space.
    pub fn sequential_factorize(&self, layouts: &mut Layouts) {
        for lvl in 0..layouts.num_levels() {
            let line_capacity = self.arch.line_capacity(lvl) as f64;
            for ds_idx in 0..layouts.num_dataspaces() {
                if !self.arch.is_kept(lvl, ds_idx) {
                    continue;
                }
                let mut ratio =
                    layouts.levels[lvl].intraline[ds_idx].product() as f64 / line_capacity;
                let ranks = layouts.levels[lvl].intraline[ds_idx].ranks.clone();
                for rank in &ranks {
                    let level = &mut layouts.levels[lvl];
                    let factor = level.intraline[ds_idx].factor(rank);
                    if factor > 1 {
                        let interline = level.interline[ds_idx].factor(rank);
                        level.interline[ds_idx].set_factor(rank, interline * factor);
                        level.intraline[ds_idx].set_factor(rank, 1);
                        ratio /= factor as f64;
                    }
                    if ratio < 1.0 {
                        break;
                    }
                }
            }
        }
    }
}
