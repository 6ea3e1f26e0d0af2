//! Cross-bin packing strategies.
//!
//! The multi-stage loop: open a bin, bounding-box pack, iteratively
//! sweep-replace and repack, then compress / drop / compress. Pieces that
//! fit nowhere flow to the next bin or back to the caller as the residual.

use log::warn;
use polybin_core::{Aabb, CancelToken, Config, Placement};

use crate::bin::Bin;
use crate::piece::Piece;

/// Outcome of a packing run: the bins and the residual.
#[derive(Debug, Clone, Default)]
pub struct PackSolution {
    /// Bins in opening order, each with its placed pieces.
    pub bins: Vec<Bin>,
    /// Pieces that could not be placed anywhere.
    pub unplaced: Vec<Piece>,
}

impl PackSolution {
    /// Total placed area over all bins.
    pub fn occupied_area(&self) -> f64 {
        self.bins.iter().map(Bin::occupied_area).sum()
    }

    /// Mean utilization over the bins; zero when no bin was opened.
    pub fn utilization(&self) -> f64 {
        if self.bins.is_empty() {
            return 0.0;
        }
        self.bins.iter().map(Bin::utilization).sum::<f64>() / self.bins.len() as f64
    }

    /// Returns whether every input piece was placed.
    pub fn all_placed(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Flattens the bins into placement records.
    pub fn placements(&self) -> Vec<Placement> {
        let mut placements = Vec::new();
        for (bin_index, bin) in self.bins.iter().enumerate() {
            for piece in bin.placed() {
                let bb = piece.bbox();
                placements.push(Placement::new(
                    piece.id(),
                    bin_index,
                    piece.rotation(),
                    bb.min_x,
                    bb.min_y,
                ));
            }
        }
        placements
    }
}

/// Packs pieces in area-descending order through the full three-stage
/// strategy.
pub fn pack(
    pieces: &[Piece],
    bin_dim: Aabb,
    config: &Config,
    token: &CancelToken,
) -> PackSolution {
    let mut ordered: Vec<Piece> = pieces.to_vec();
    ordered.sort_by(|a, b| {
        b.area()
            .partial_cmp(&a.area())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    pack_sequence(ordered, bin_dim, config, token, true)
}

/// Packs pieces in exactly the given order through the full three-stage
/// strategy. Used to materialize optimizer solutions.
pub fn pack_ordered(
    pieces: Vec<Piece>,
    bin_dim: Aabb,
    config: &Config,
    token: &CancelToken,
) -> PackSolution {
    pack_sequence(pieces, bin_dim, config, token, true)
}

/// Fast order-preserving variant that skips the stage-2 sweep-replace
/// loop. This is the evaluation path inside the optimizer fitness
/// functions, where throughput matters more than the last percent of
/// density.
pub fn pack_fast(pieces: Vec<Piece>, bin_dim: Aabb, config: &Config) -> PackSolution {
    pack_sequence(pieces, bin_dim, config, &CancelToken::new(), false)
}

fn pack_sequence(
    mut to_place: Vec<Piece>,
    bin_dim: Aabb,
    config: &Config,
    token: &CancelToken,
    with_sweep: bool,
) -> PackSolution {
    let mut bins: Vec<Bin> = Vec::new();

    // Each round either commits at least one piece to a new bin, strictly
    // shrinking `to_place`, or places nothing and breaks below.
    while !to_place.is_empty() {
        if token.is_cancelled() {
            break;
        }

        let mut bin = Bin::from_config(bin_dim, config);

        // Stage 1: bounding-box packing.
        let mut residual = bin.pack_pieces(std::mem::take(&mut to_place));

        // Stage 2: shuffle pieces into concavities, then retry the
        // residual against the reclaimed space, until nothing new lands.
        if with_sweep && bin.n_placed() > 0 && !token.is_cancelled() {
            loop {
                let placed_before = bin.n_placed();
                bin.move_and_replace(0);
                if !residual.is_empty() {
                    residual = bin.pack_pieces(residual);
                }
                if bin.n_placed() == placed_before || token.is_cancelled() {
                    break;
                }
            }
        }

        // Stage 3: settle, top-drop the stragglers, settle again.
        if !token.is_cancelled() {
            bin.compress();
            if !residual.is_empty() {
                residual = bin.drop_pieces(residual);
            }
            bin.compress();
        }

        if bin.n_placed() == 0 {
            warn!(
                "could not place any of the {} remaining piece(s); the largest may exceed the bin",
                residual.len()
            );
            to_place = residual;
            break;
        }

        debug_assert!(bin.invariants_hold());
        bins.push(bin);
        to_place = residual;
    }

    if !to_place.is_empty() {
        let ids: Vec<_> = to_place.iter().map(Piece::id).collect();
        warn!("unplaced piece ids: {ids:?}");
    }

    PackSolution {
        bins,
        unplaced: to_place,
    }
}

/// Greedy best-fit variant: every piece probes every open bin, rotation
/// and free rectangle, taking the slot that wastes the least area; a new
/// bin opens only when nothing fits anywhere.
///
/// Slower per piece than [`pack`] but occasionally tighter on instances
/// with many similar mid-size pieces.
pub fn pack_greedy(
    pieces: &[Piece],
    bin_dim: Aabb,
    config: &Config,
    token: &CancelToken,
) -> PackSolution {
    let mut ordered: Vec<Piece> = pieces.to_vec();
    ordered.sort_by(|a, b| {
        b.area()
            .partial_cmp(&a.area())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut bins: Vec<Bin> = Vec::new();
    let mut unplaced: Vec<Piece> = Vec::new();

    for piece in ordered {
        if token.is_cancelled() {
            unplaced.push(piece);
            continue;
        }
        if place_greedily(&piece, &mut bins, config) {
            continue;
        }
        bins.push(Bin::from_config(bin_dim, config));
        if !place_greedily(&piece, &mut bins, config) {
            warn!("piece {} does not fit in an empty bin", piece.id());
            bins.pop();
            unplaced.push(piece);
        }
    }

    PackSolution { bins, unplaced }
}

fn place_greedily(piece: &Piece, bins: &mut [Bin], config: &Config) -> bool {
    let mut best: Option<(usize, usize, f64, f64)> = None; // (bin, rect, angle, waste)

    for (bin_index, bin) in bins.iter().enumerate() {
        for &angle in &config.rotation_angles {
            let mut candidate = piece.clone();
            if angle != 0.0 {
                candidate.rotate(angle);
            }
            for rect_index in 0..bin.free_rects().len() {
                if !bin.can_place_in(&candidate, rect_index) {
                    continue;
                }
                let waste = bin.free_rects()[rect_index].area() - candidate.area();
                if waste >= 0.0 && best.map_or(true, |(_, _, _, w)| waste < w) {
                    best = Some((bin_index, rect_index, angle, waste));
                }
            }
        }
    }

    if let Some((bin_index, rect_index, angle, _)) = best {
        let mut candidate = piece.clone();
        if angle != 0.0 {
            candidate.rotate(angle);
        }
        return bins[bin_index].place_in(&candidate, rect_index);
    }
    false
}
