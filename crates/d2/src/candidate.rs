//! Candidate-sequence evaluation shared by the optimizers.
//!
//! The metaheuristics search over (permutation, per-piece rotation index)
//! pairs. This module materializes such a pair into a piece sequence,
//! memoizing rotated shapes, and scores it with the fast packing variant.

use geo::MultiPolygon;
use polybin_core::{Aabb, CacheStats, CancelToken, Config, ShapeCache};
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::packing::{pack_fast, pack_ordered, PackSolution};
use crate::piece::Piece;
use crate::EPS;

/// Fitness assigned to a sequence that could not open a single bin.
pub(crate) const UNPACKABLE_FITNESS: f64 = -1e18;

/// Evaluator over a fixed piece set and bin.
pub(crate) struct SequenceEval<'a> {
    pieces: &'a [Piece],
    bin_dim: Aabb,
    config: &'a Config,
    cache: ShapeCache<MultiPolygon<f64>>,
    bin_area: f64,
}

impl<'a> SequenceEval<'a> {
    pub fn new(pieces: &'a [Piece], bin_dim: Aabb, config: &'a Config) -> Self {
        Self {
            pieces,
            bin_dim,
            config,
            cache: ShapeCache::new(),
            bin_area: bin_dim.area(),
        }
    }

    /// Number of pieces in the solution space.
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Number of rotation options per piece.
    pub fn rotation_options(&self) -> usize {
        self.config.rotation_angles.len().max(1)
    }

    /// Angle in degrees for a rotation index.
    pub fn angle(&self, index: usize) -> f64 {
        self.config.rotation_angles[index % self.rotation_options()]
    }

    /// Turns (order, rotations) into a concrete piece sequence.
    pub fn materialize(&self, order: &[usize], rotations: &[usize]) -> Vec<Piece> {
        order
            .iter()
            .zip(rotations)
            .map(|(&piece_index, &rotation_index)| {
                let piece = &self.pieces[piece_index];
                let angle = self.angle(rotation_index);
                if angle.abs() < EPS {
                    piece.clone()
                } else {
                    piece.rotated_cached(angle, &self.cache)
                }
            })
            .collect()
    }

    /// Scores a candidate: `-bin_area * bins + occupied_area`, so fewer
    /// bins always dominates and packed area breaks ties. Higher is
    /// better.
    pub fn fitness(&self, order: &[usize], rotations: &[usize]) -> f64 {
        let sequence = self.materialize(order, rotations);
        let solution = pack_fast(sequence, self.bin_dim, self.config);
        score(&solution, self.bin_area)
    }

    /// Materializes the candidate through the full (sweep-replace
    /// included) strategy to produce the final answer.
    pub fn final_pack(
        &self,
        order: &[usize],
        rotations: &[usize],
        token: &CancelToken,
    ) -> PackSolution {
        let sequence = self.materialize(order, rotations);
        pack_ordered(sequence, self.bin_dim, self.config, token)
    }

    /// Hit/miss counters of the rotation cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Shared fitness formula.
pub(crate) fn score(solution: &PackSolution, bin_area: f64) -> f64 {
    if solution.bins.is_empty() {
        return UNPACKABLE_FITNESS;
    }
    -bin_area * solution.bins.len() as f64 + solution.occupied_area()
}

/// Seeds an RNG from the configuration, falling back to entropy.
pub(crate) fn seed_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Swaps two positions, carrying the rotations along.
pub(crate) fn swap_move<R: Rng>(order: &mut [usize], rotations: &mut [usize], rng: &mut R) {
    if order.len() < 2 {
        return;
    }
    let i = rng.gen_range(0..order.len());
    let j = rng.gen_range(0..order.len());
    order.swap(i, j);
    rotations.swap(i, j);
}

/// Re-rolls a single rotation.
pub(crate) fn rotation_move<R: Rng>(rotations: &mut [usize], options: usize, rng: &mut R) {
    if rotations.is_empty() || options <= 1 {
        return;
    }
    let i = rng.gen_range(0..rotations.len());
    rotations[i] = rng.gen_range(0..options);
}

/// Excises a contiguous block (length up to n/4) and reinserts it at
/// another position, rotations included.
pub(crate) fn block_move<R: Rng>(
    order: &mut Vec<usize>,
    rotations: &mut Vec<usize>,
    rng: &mut R,
) {
    let n = order.len();
    if n < 2 {
        return;
    }
    let max_block = (n / 4).max(1);
    let block = rng.gen_range(1..=max_block);
    let start = rng.gen_range(0..=n - block);
    let target = rng.gen_range(0..=n - block);

    let moved_order: Vec<usize> = order.drain(start..start + block).collect();
    let moved_rotations: Vec<usize> = rotations.drain(start..start + block).collect();
    order.splice(target..target, moved_order);
    rotations.splice(target..target, moved_rotations);
}

/// Applies one of the three neighborhood moves, chosen uniformly.
pub(crate) fn random_move<R: Rng>(
    order: &mut Vec<usize>,
    rotations: &mut Vec<usize>,
    options: usize,
    rng: &mut R,
) {
    match rng.gen_range(0..3) {
        0 => swap_move(order, rotations, rng),
        1 => rotation_move(rotations, options, rng),
        _ => block_move(order, rotations, rng),
    }
}
