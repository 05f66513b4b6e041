use hashbrown::HashMap;
use linespace::components::{
    ArchView, BypassNest, DataSpace, LayoutSpace, Layouts, Loop, Mapping, Rank,
    StorageLevelSpec, WorkloadShape,
};

/// One dataspace over single-dimension ranks, one rank per dimension.
fn shape_over(dimensions: &[&str], ranks: &[(&str, u32)]) -> WorkloadShape {
    let mut rank_table = HashMap::new();
    for (name, dim) in ranks {
        rank_table.insert(name.to_string(), Rank::simple(*dim));
    }
    WorkloadShape {
        dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
        ranks: rank_table,
        dataspaces: vec![DataSpace {
            name: "Data".to_string(),
            ranks: ranks.iter().map(|(name, _)| name.to_string()).collect(),
        }],
    }
}

fn engine_for(
    shape: &WorkloadShape,
    loops: Vec<Loop>,
    boundaries: Vec<usize>,
    lines: &[u64],
) -> LayoutSpace {
    let specs: Vec<StorageLevelSpec> = lines
        .iter()
        .enumerate()
        .map(|(i, &line)| StorageLevelSpec::named(format!("L{i}")).with_block_size(line))
        .collect();
    let mapping = Mapping {
        loops,
        storage_tiling_boundaries: boundaries,
        bypass: BypassNest::all_kept(shape.num_dataspaces(), lines.len()),
    };
    let arch = ArchView::new(&specs, &mapping, shape.num_dataspaces());
    let skeleton = Layouts::skeleton(shape, &specs).unwrap();
    LayoutSpace::new(arch, &mapping, skeleton).unwrap()
}

/// Check that intraline x interline is conserved per rank against the
/// concordant layout, and that every kept dataspace fits its line.
fn assert_conserved(engine: &LayoutSpace, layout: &Layouts, lines: &[u64]) {
    let concordant = engine.concordant();
    for (lvl, level) in layout.levels.iter().enumerate() {
        for (ds_idx, intraline) in level.intraline.iter().enumerate() {
            let interline = &level.interline[ds_idx];
            for rank in &intraline.ranks {
                let product = intraline.factor(rank) as u64 * interline.factor(rank) as u64;
                let reference = concordant.levels[lvl].intraline[ds_idx].factor(rank) as u64
                    * concordant.levels[lvl].interline[ds_idx].factor(rank) as u64;
                assert_eq!(product, reference, "rank {rank} at level {lvl}");
            }
            assert!(intraline.product() <= lines[lvl]);
        }
    }
}

#[test]
fn trivial_one_level_packs_the_full_line() {
    // One temporal rank of extent 16 against a 16-word line: the sole
    // packing option pulls the whole extent into the line.
    let shape = shape_over(&["X"], &[("R", 0)]);
    let engine = engine_for(&shape, vec![Loop::temporal(0, 16)], vec![0], &[16]);

    let concordant = engine.concordant();
    assert_eq!(concordant.levels[0].intraline[0].factor("R"), 1);
    assert_eq!(concordant.levels[0].interline[0].factor("R"), 16);
    assert_eq!(engine.splitting_space_size(), 1);
    assert_eq!(engine.packing_space_size(), 1);

    let layout = engine.materialize(0, 0).unwrap();
    assert_eq!(layout.levels[0].intraline[0].factor("R"), 16);
    assert_eq!(layout.levels[0].interline[0].factor("R"), 1);
}

#[test]
fn over_wide_line_enumerates_split_alternatives() {
    // Two spatial ranks of 8 x 8 = 64 against a 16-word line.
    let shape = shape_over(&["X", "Y"], &[("R1", 0), ("R2", 1)]);
    let engine = engine_for(
        &shape,
        vec![Loop::spatial(0, 8), Loop::spatial(1, 8)],
        vec![1],
        &[16],
    );

    assert_eq!(engine.splitting_space_size(), 3);
    assert_eq!(engine.packing_space_size(), 1);

    // The whole space sits in the single (level, dataspace) slot: one option
    // per satisfiable rank combination, none for packing.
    let space = engine.space();
    assert_eq!(space.splitting_counts, vec![vec![3]]);
    assert_eq!(space.packing_counts, vec![vec![0]]);
    assert_eq!(space.splitting[0][0].len(), 3);
    assert_eq!(space.splitting[0][0][2].total_reduction, 4);

    let first = engine.materialize(0, 0).unwrap();
    assert_eq!(first.levels[0].intraline[0].factor("R1"), 2);
    assert_eq!(first.levels[0].interline[0].factor("R1"), 4);
    assert_eq!(first.levels[0].intraline[0].factor("R2"), 8);
    assert_eq!(first.levels[0].interline[0].factor("R2"), 1);

    let second = engine.materialize(1, 0).unwrap();
    assert_eq!(second.levels[0].intraline[0].factor("R1"), 8);
    assert_eq!(second.levels[0].intraline[0].factor("R2"), 2);

    let third = engine.materialize(2, 0).unwrap();
    assert_eq!(third.levels[0].intraline[0].factor("R1"), 4);
    assert_eq!(third.levels[0].intraline[0].factor("R2"), 4);
}

#[test]
fn slack_line_packs_to_the_best_fit() {
    // Spatial extent 4 of a 64-wide rank against a 16-word line: the only
    // retained packing multiplies the line occupancy by 4.
    let shape = shape_over(&["X"], &[("R", 0)]);
    let engine = engine_for(
        &shape,
        vec![Loop::spatial(0, 4), Loop::temporal(0, 16)],
        vec![1],
        &[16],
    );

    let concordant = engine.concordant();
    assert_eq!(concordant.levels[0].intraline[0].factor("R"), 4);
    assert_eq!(concordant.levels[0].interline[0].factor("R"), 16);
    assert_eq!(engine.packing_space_size(), 1);

    let layout = engine.materialize(0, 0).unwrap();
    assert_eq!(layout.levels[0].intraline[0].factor("R"), 16);
    assert_eq!(layout.levels[0].interline[0].factor("R"), 4);
}

#[test]
fn bypassed_dataspace_is_excluded_from_both_spaces() {
    let shape = shape_over(&["X"], &[("R", 0)]);
    let specs = [StorageLevelSpec::named("L0").with_block_size(16)];
    let mut bypass = BypassNest::all_kept(1, 1);
    bypass.bypass(0, 0);
    let mapping = Mapping {
        loops: vec![Loop::spatial(0, 8), Loop::temporal(0, 4)],
        storage_tiling_boundaries: vec![1],
        bypass,
    };
    let arch = ArchView::new(&specs, &mapping, 1);
    let skeleton = Layouts::skeleton(&shape, &specs).unwrap();
    let engine = LayoutSpace::new(arch, &mapping, skeleton).unwrap();

    // The collapse pushes the whole extent across lines and the slot
    // contributes radix 1 to both spaces.
    let concordant = engine.concordant();
    assert_eq!(concordant.levels[0].intraline[0].factor("R"), 1);
    assert_eq!(concordant.levels[0].interline[0].factor("R"), 32);
    assert_eq!(engine.splitting_space_size(), 1);
    assert_eq!(engine.packing_space_size(), 1);
}

#[test]
fn spatial_outer_level_multiplies_the_inner_footprint() {
    // Temporal x8 inside, spatial x4 outside, same dimension: the outer
    // level's tile spans 4 copies of the inner tile within its lines.
    let shape = shape_over(&["X"], &[("R", 0)]);
    let engine = engine_for(
        &shape,
        vec![Loop::temporal(0, 8), Loop::spatial(0, 4)],
        vec![0, 1],
        &[1, 4],
    );

    let concordant = engine.concordant();
    assert_eq!(concordant.levels[0].intraline[0].factor("R"), 1);
    assert_eq!(concordant.levels[0].interline[0].factor("R"), 8);
    assert_eq!(concordant.levels[1].intraline[0].factor("R"), 4);
    assert_eq!(concordant.levels[1].interline[0].factor("R"), 8);

    // Both levels fit their lines exactly: the concordant layout is the
    // only point of the space.
    assert_eq!(engine.splitting_space_size(), 1);
    assert_eq!(engine.packing_space_size(), 1);
    let layout = engine.materialize(0, 0).unwrap();
    assert_eq!(layout.levels[1].intraline[0].factor("R"), 4);
}

#[test]
fn multi_dimension_rank_spans_its_bounding_box() {
    // A rank over two dimensions valued 3 and 5 with unit coefficients
    // covers 3 + 5 - 1 = 7 points; with a stride of 2 on the first, 10.
    let mut shape = shape_over(&["A", "B"], &[]);
    shape.ranks.insert(
        "W".to_string(),
        Rank {
            dimensions: vec![0, 1],
            coefficients: vec![1, 1],
            zero_padding: 0,
        },
    );
    shape.dataspaces[0].ranks = vec!["W".to_string()];
    let engine = engine_for(
        &shape,
        vec![Loop::temporal(0, 3), Loop::temporal(1, 5)],
        vec![1],
        &[8],
    );
    assert_eq!(engine.concordant().levels[0].interline[0].factor("W"), 7);

    let mut strided = shape.clone();
    strided.ranks.get_mut("W").unwrap().coefficients = vec![2, 1];
    let engine = engine_for(
        &strided,
        vec![Loop::temporal(0, 3), Loop::temporal(1, 5)],
        vec![1],
        &[16],
    );
    assert_eq!(engine.concordant().levels[0].interline[0].factor("W"), 10);
}

#[test]
fn zero_padding_shrinks_the_outermost_extent() {
    let mut shape = shape_over(&["X"], &[("R", 0)]);
    shape.ranks.get_mut("R").unwrap().zero_padding = 2;
    let engine = engine_for(&shape, vec![Loop::temporal(0, 16)], vec![0], &[1]);

    // 16 - 2 * 2 = 12 interline iterations at the outermost level.
    assert_eq!(engine.concordant().levels[0].interline[0].factor("R"), 12);
}

#[test]
fn whole_id_space_materializes_without_index_errors() {
    let shape = shape_over(&["X", "Y"], &[("R1", 0), ("R2", 1)]);
    let engine = engine_for(
        &shape,
        vec![Loop::spatial(0, 8), Loop::spatial(1, 8)],
        vec![1],
        &[16],
    );

    let total = engine.splitting_space_size() * engine.packing_space_size();
    assert_eq!(total, 3);
    for split_id in 0..engine.splitting_space_size() {
        for pack_id in 0..engine.packing_space_size() {
            let layout = engine.materialize(split_id, pack_id).unwrap();
            assert_conserved(&engine, &layout, &[16]);
        }
    }
}

#[test]
fn tied_packings_survive_the_pruning_ratio_together() {
    // Interline 6 x 6 against a 12-word line: two assignments reach the
    // same total packing of 12, and both survive the 0.9 ratio.
    let shape = shape_over(&["X", "Y"], &[("R1", 0), ("R2", 1)]);
    let engine = engine_for(
        &shape,
        vec![Loop::temporal(0, 6), Loop::temporal(1, 6)],
        vec![1],
        &[12],
    );

    assert_eq!(engine.packing_space_size(), 2);
    let totals: Vec<u64> = engine.space().packing[0][0]
        .iter()
        .map(|o| o.total_packing)
        .collect();
    assert_eq!(totals, vec![12, 12]);

    let first = engine.materialize(0, 0).unwrap();
    assert_eq!(first.levels[0].intraline[0].factor("R1"), 6);
    assert_eq!(first.levels[0].intraline[0].factor("R2"), 2);
    assert_conserved(&engine, &first, &[12]);

    let second = engine.materialize(0, 1).unwrap();
    assert_eq!(second.levels[0].intraline[0].factor("R1"), 2);
    assert_eq!(second.levels[0].intraline[0].factor("R2"), 6);
    assert_conserved(&engine, &second, &[12]);
}

#[test]
fn unsplittable_slot_fails_the_capacity_check_instead_of_init() {
    // Four spatial ranks of 2 against a 1-word line: no combination of up
    // to three ranks can shed enough, so the slot enumerates no options and
    // the lone candidate fails validation at materialization time.
    let shape = shape_over(
        &["A", "B", "C", "D"],
        &[("R1", 0), ("R2", 1), ("R3", 2), ("R4", 3)],
    );
    let engine = engine_for(
        &shape,
        vec![
            Loop::spatial(0, 2),
            Loop::spatial(1, 2),
            Loop::spatial(2, 2),
            Loop::spatial(3, 2),
        ],
        vec![3],
        &[1],
    );

    assert_eq!(engine.splitting_space_size(), 1);
    assert!(matches!(
        engine.materialize(0, 0),
        Err(linespace::components::MaterializeError::LineCapacityExceeded { .. })
    ));
}

#[test]
fn materialization_is_deterministic() {
    let shape = shape_over(&["X", "Y"], &[("R1", 0), ("R2", 1)]);
    let engine = engine_for(
        &shape,
        vec![Loop::spatial(0, 8), Loop::spatial(1, 8)],
        vec![1],
        &[16],
    );

    for split_id in 0..engine.splitting_space_size() {
        let a = engine.materialize(split_id, 0).unwrap();
        let b = engine.materialize(split_id, 0).unwrap();
        for lvl in 0..a.num_levels() {
            assert_eq!(a.levels[lvl].intraline, b.levels[lvl].intraline);
            assert_eq!(a.levels[lvl].interline, b.levels[lvl].interline);
        }
    }
}

#[test]
fn concordance_holds_on_the_initial_layout() {
    // intraline x interline covers the rank extent, exactly when divisible.
    let shape = shape_over(&["X"], &[("R", 0)]);
    let engine = engine_for(
        &shape,
        vec![Loop::spatial(0, 4), Loop::temporal(0, 16)],
        vec![1],
        &[16],
    );
    let concordant = engine.concordant();
    let product = concordant.levels[0].intraline[0].factor("R") as u64
        * concordant.levels[0].interline[0].factor("R") as u64;
    assert_eq!(product, 64);

    // Non-divisible extents round the interline side up.
    let engine = engine_for(
        &shape,
        vec![Loop::spatial(0, 4), Loop::temporal(0, 3)],
        vec![1],
        &[4],
    );
    let concordant = engine.concordant();
    assert_eq!(concordant.levels[0].intraline[0].factor("R"), 4);
    assert_eq!(concordant.levels[0].interline[0].factor("R"), 3);
}
