//! End-to-end packing scenarios and engine-wide invariants.

use polybin_core::{Aabb, CancelToken, Config, Strategy};
use polybin_d2::{
    optimize_and_pack, pack, pack_ordered, parse_problem, Bin, PackSolution, Piece, EPS,
};

fn dim100() -> Aabb {
    Aabb::with_size(100.0, 100.0)
}

fn default_pack(pieces: &[Piece]) -> PackSolution {
    pack(pieces, dim100(), &Config::default(), &CancelToken::new())
}

/// Engine-wide invariants every returned solution must satisfy.
fn assert_solution_invariants(solution: &PackSolution, input: &[Piece]) {
    for bin in &solution.bins {
        // Pieces inside the bin, pairwise interior-disjoint.
        for piece in bin.placed() {
            assert!(
                piece.is_inside(bin.dimension()),
                "piece {} leaks out of its bin",
                piece.id()
            );
        }
        for i in 0..bin.placed().len() {
            for j in (i + 1)..bin.placed().len() {
                assert!(
                    !bin.placed()[i].intersects(&bin.placed()[j]),
                    "pieces {} and {} overlap",
                    bin.placed()[i].id(),
                    bin.placed()[j].id()
                );
            }
        }

        // Free rectangles inside the bin, clear of placed boxes, maximal.
        for free in bin.free_rects() {
            assert!(bin.dimension().contains(free, EPS));
            for piece in bin.placed() {
                if let Some(cut) = free.intersection(&piece.bbox()) {
                    assert!(
                        cut.width() <= EPS || cut.height() <= EPS,
                        "free rectangle overlaps a placed bounding box"
                    );
                }
            }
        }
        for (i, a) in bin.free_rects().iter().enumerate() {
            for (j, b) in bin.free_rects().iter().enumerate() {
                if i != j {
                    assert!(
                        !(b.contains(a, EPS) && a.area() < b.area() - EPS),
                        "free rectangle strictly contained in another"
                    );
                }
            }
        }
    }

    // Area conservation.
    let input_area: f64 = input.iter().map(Piece::area).sum();
    let placed_area = solution.occupied_area();
    assert!(placed_area <= input_area + 1e-6);
    if solution.all_placed() {
        assert!((placed_area - input_area).abs() < 1e-6);
    }

    // Id preservation: each output id appears once and comes from the
    // input.
    let mut output_ids: Vec<u32> = solution.placements().iter().map(|p| p.id).collect();
    output_ids.sort_unstable();
    let mut deduped = output_ids.clone();
    deduped.dedup();
    assert_eq!(output_ids, deduped, "an id was placed twice");
    let input_ids: Vec<u32> = input.iter().map(Piece::id).collect();
    for id in &output_ids {
        assert!(input_ids.contains(id));
    }
}

#[test]
fn scenario_single_square_fits_trivially() {
    let pieces = vec![Piece::rectangle(20.0, 20.0, 1)];
    let solution = default_pack(&pieces);

    assert_eq!(solution.bins.len(), 1);
    let placements = solution.placements();
    assert_eq!(placements.len(), 1);
    assert!(placements[0].x.abs() < EPS);
    assert!(placements[0].y.abs() < EPS);
    assert_eq!(placements[0].rotation, 0.0);
    assert_solution_invariants(&solution, &pieces);
}

#[test]
fn scenario_two_squares_share_a_bin() {
    let pieces = vec![
        Piece::rectangle(30.0, 30.0, 1),
        Piece::rectangle(30.0, 30.0, 2),
    ];
    let solution = default_pack(&pieces);

    assert_eq!(solution.bins.len(), 1);
    assert!(solution.all_placed());
    let bin = &solution.bins[0];
    let a = bin.placed()[0].bbox();
    let b = bin.placed()[1].bbox();
    if let Some(cut) = a.intersection(&b) {
        assert!(cut.width() <= EPS || cut.height() <= EPS);
    }
    assert_solution_invariants(&solution, &pieces);
}

#[test]
fn scenario_piece_too_large_is_reported() {
    let pieces = vec![Piece::rectangle(120.0, 120.0, 1)];
    let solution = default_pack(&pieces);

    assert!(solution.bins.is_empty());
    assert_eq!(solution.unplaced.len(), 1);
    assert_eq!(solution.unplaced[0].id(), 1);
    assert_solution_invariants(&solution, &pieces);
}

#[test]
fn scenario_drop_stacks_pieces() {
    let mut bin = Bin::new(dim100());
    let residual = bin.drop_pieces(vec![
        Piece::rectangle(20.0, 30.0, 1),
        Piece::rectangle(20.0, 30.0, 2),
    ]);

    assert!(residual.is_empty());
    let first = bin.placed()[0].bbox();
    let second = bin.placed()[1].bbox();
    assert!((second.min_y - first.max_y).abs() < EPS);
}

#[test]
fn scenario_compress_reaches_the_origin() {
    // Place a single square mid-bin via an ordered pack, then rely on the
    // strategy's built-in compression.
    let mut piece = Piece::rectangle(20.0, 20.0, 1);
    piece.place_at(50.0, 50.0);
    let solution = pack_ordered(
        vec![piece],
        dim100(),
        &Config::default(),
        &CancelToken::new(),
    );

    let placements = solution.placements();
    assert_eq!(placements.len(), 1);
    assert!(placements[0].x.abs() < EPS);
    assert!(placements[0].y.abs() < EPS);
}

#[test]
fn scenario_small_square_enters_the_l_concavity() {
    // L-shape with a 10x10 = 100 area concavity; square of side 4.
    let pieces = vec![
        Piece::l_shape(20.0, 20.0, 10.0, 10.0, 1),
        Piece::rectangle(4.0, 4.0, 2),
    ];
    let solution = default_pack(&pieces);

    assert_eq!(solution.bins.len(), 1);
    assert!(solution.all_placed());
    let bin = &solution.bins[0];
    let l = bin.placed().iter().find(|p| p.id() == 1).unwrap();
    let square = bin.placed().iter().find(|p| p.id() == 2).unwrap();
    assert!(!l.intersects(square));
    assert!(l.bbox().contains(&square.bbox(), EPS));
    assert_solution_invariants(&solution, &pieces);
}

#[test]
fn exact_fit_piece_fills_a_bin_alone() {
    let pieces = vec![
        Piece::rectangle(100.0, 100.0, 1),
        Piece::rectangle(10.0, 10.0, 2),
    ];
    let solution = default_pack(&pieces);

    assert_eq!(solution.bins.len(), 2);
    assert!(solution.all_placed());
    let exact_bin = solution
        .bins
        .iter()
        .find(|b| b.placed().iter().any(|p| p.id() == 1))
        .unwrap();
    assert_eq!(exact_bin.n_placed(), 1);
    assert!((exact_bin.utilization() - 1.0).abs() < 1e-9);
    assert_solution_invariants(&solution, &pieces);
}

#[test]
fn concave_piece_with_bin_sized_bbox() {
    // The L's bounding box equals the bin, but its shape is well within
    // the invariants against no other piece.
    let pieces = vec![Piece::l_shape(100.0, 100.0, 40.0, 40.0, 1)];
    let solution = default_pack(&pieces);

    assert_eq!(solution.bins.len(), 1);
    assert!(solution.all_placed());
    assert_solution_invariants(&solution, &pieces);
}

#[test]
fn mixed_fleet_across_bins() {
    let pieces: Vec<Piece> = vec![
        Piece::rectangle(60.0, 60.0, 1),
        Piece::rectangle(60.0, 60.0, 2),
        Piece::rectangle(40.0, 35.0, 3),
        Piece::l_shape(30.0, 30.0, 12.0, 12.0, 4),
        Piece::rectangle(25.0, 10.0, 5),
        Piece::rectangle(8.0, 8.0, 6),
    ];
    let solution = default_pack(&pieces);

    assert!(solution.all_placed());
    assert!(solution.bins.len() >= 2);
    assert_solution_invariants(&solution, &pieces);
}

#[test]
fn narrow_bin_packs_in_one_bin() {
    let pieces: Vec<Piece> = (1..=3).map(|i| Piece::rectangle(30.0, 10.0, i)).collect();
    let solution = pack(
        &pieces,
        Aabb::with_size(35.0, 95.0),
        &Config::default(),
        &CancelToken::new(),
    );
    assert!(solution.all_placed());
    assert_eq!(solution.bins.len(), 1);
    assert_solution_invariants(&solution, &pieces);
}

#[test]
fn holed_piece_keeps_its_hole_through_packing() {
    let text = "100 100\n1\n0,0 30,0 30,30 0,30\n@ 10,10 20,10 20,20 10,20\n";
    let (bin_dim, pieces) = parse_problem(text).unwrap();
    let solution = pack(&pieces, bin_dim, &Config::default(), &CancelToken::new());

    assert!(solution.all_placed());
    let placed = &solution.bins[0].placed()[0];
    assert!((placed.area() - 800.0).abs() < 1e-6);
    assert_solution_invariants(&solution, &pieces);
}

#[test]
fn optimizers_match_invariants_too() {
    let pieces: Vec<Piece> = vec![
        Piece::rectangle(40.0, 30.0, 1),
        Piece::rectangle(35.0, 25.0, 2),
        Piece::rectangle(20.0, 45.0, 3),
        Piece::l_shape(28.0, 22.0, 10.0, 9.0, 4),
    ];

    for strategy in [
        Strategy::SimulatedAnnealing,
        Strategy::Genetic,
        Strategy::Hybrid,
    ] {
        let config = Config::default()
            .with_strategy(strategy)
            .with_seed(21)
            .with_iterations(120)
            .with_generations(6)
            .with_population_size(10)
            .with_time_limit(20_000);
        let solution =
            optimize_and_pack(&pieces, dim100(), &config, &CancelToken::new()).unwrap();

        assert!(solution.all_placed(), "{strategy:?} lost pieces");
        assert_solution_invariants(&solution, &pieces);
    }
}

#[test]
fn optimizer_never_beats_physics() {
    // Total piece area 2.56x the bin area: at least 3 bins, whatever the
    // order.
    let pieces: Vec<Piece> = (1..=16).map(|i| Piece::rectangle(40.0, 40.0, i)).collect();
    let config = Config::default()
        .with_strategy(Strategy::SimulatedAnnealing)
        .with_seed(5)
        .with_iterations(60);
    let solution = optimize_and_pack(&pieces, dim100(), &config, &CancelToken::new()).unwrap();

    assert!(solution.all_placed());
    assert!(solution.bins.len() >= 3);
    assert_solution_invariants(&solution, &pieces);
}

#[test]
fn cancellation_mid_strategy_returns_partial() {
    let token = CancelToken::new();
    token.cancel();
    let pieces: Vec<Piece> = (1..=4).map(|i| Piece::rectangle(30.0, 30.0, i)).collect();
    let solution = pack(&pieces, dim100(), &Config::default(), &token);

    // Nothing placed, nothing lost.
    assert!(solution.bins.is_empty());
    assert_eq!(solution.unplaced.len(), 4);
}
