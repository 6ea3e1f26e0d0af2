//! Simulated-annealing optimization of the packing order.
//!
//! The solution space is a permutation of piece indices plus a rotation
//! index per position. Neighbors swap positions (rotations included),
//! re-roll a rotation, or relocate a contiguous block. Candidates are
//! scored with the fast packing variant; the winner is materialized
//! through the full strategy.

use std::time::{Duration, Instant};

use log::{debug, info};
use polybin_core::sa::{SaConfig, SaProblem, SaResult, SaRunner, SaSolution};
use polybin_core::{Aabb, CancelToken, Config, ProgressCallback, ProgressInfo};
use rand::prelude::*;

use crate::candidate::{random_move, seed_rng, SequenceEval};
use crate::packing::{pack, PackSolution};
use crate::piece::Piece;

/// How often the annealer reports progress, in iterations.
const PROGRESS_STRIDE: u64 = 200;

/// A point in the (ordering, rotations) search space.
#[derive(Debug, Clone)]
pub struct OrderSolution {
    /// Permutation of piece indices.
    pub order: Vec<usize>,
    /// Rotation index per position.
    pub rotations: Vec<usize>,
    objective: f64,
}

impl OrderSolution {
    fn random<R: Rng>(n: usize, rotation_options: usize, rng: &mut R) -> Self {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        let rotations = (0..n)
            .map(|_| rng.gen_range(0..rotation_options.max(1)))
            .collect();
        Self {
            order,
            rotations,
            objective: f64::NEG_INFINITY,
        }
    }
}

impl SaSolution for OrderSolution {
    fn objective(&self) -> f64 {
        self.objective
    }
}

struct OrderProblem<'a> {
    eval: &'a SequenceEval<'a>,
    progress: Option<&'a ProgressCallback>,
    start: Instant,
}

impl SaProblem for OrderProblem<'_> {
    type Solution = OrderSolution;

    /// Best of a handful of random samples, so the walk starts from a
    /// reasonable point rather than an arbitrary shuffle.
    fn initial_solution<R: Rng>(&self, rng: &mut R) -> OrderSolution {
        let mut best: Option<OrderSolution> = None;
        for _ in 0..10 {
            let mut candidate =
                OrderSolution::random(self.eval.len(), self.eval.rotation_options(), rng);
            self.evaluate(&mut candidate);
            if best
                .as_ref()
                .map_or(true, |b| candidate.objective > b.objective)
            {
                best = Some(candidate);
            }
        }
        best.expect("sampled at least one initial solution")
    }

    fn neighbor<R: Rng>(&self, solution: &OrderSolution, rng: &mut R) -> OrderSolution {
        let mut next = solution.clone();
        random_move(
            &mut next.order,
            &mut next.rotations,
            self.eval.rotation_options(),
            rng,
        );
        next.objective = f64::NEG_INFINITY;
        next
    }

    fn evaluate(&self, solution: &mut OrderSolution) {
        solution.objective = self.eval.fitness(&solution.order, &solution.rotations);
    }

    fn on_iteration(&self, iteration: u64, temperature: f64, best: &OrderSolution) {
        if iteration % PROGRESS_STRIDE != 0 {
            return;
        }
        debug!(
            "iteration {iteration}: best {:.2}, temperature {temperature:.4}",
            best.objective()
        );
        if let Some(callback) = self.progress {
            callback(ProgressInfo {
                iteration,
                best_fitness: best.objective(),
                temperature: Some(temperature),
                cache_hit_rate: Some(self.eval.cache_stats().hit_rate()),
                elapsed_ms: self.start.elapsed().as_millis() as u64,
            });
        }
    }
}

/// Runs simulated annealing over piece orderings, then packs the best
/// ordering through the full strategy.
pub fn optimize_sa(
    pieces: &[Piece],
    bin_dim: Aabb,
    config: &Config,
    token: &CancelToken,
) -> PackSolution {
    optimize_sa_with_progress(pieces, bin_dim, config, token, None)
}

/// [`optimize_sa`] with a progress callback invoked every few hundred
/// iterations.
pub fn optimize_sa_with_progress(
    pieces: &[Piece],
    bin_dim: Aabb,
    config: &Config,
    token: &CancelToken,
    progress: Option<&ProgressCallback>,
) -> PackSolution {
    if pieces.len() < 2 {
        return pack(pieces, bin_dim, config, token);
    }

    let eval = SequenceEval::new(pieces, bin_dim, config);
    let mut sa_config = SaConfig::new()
        .with_initial_temperature(config.initial_temperature)
        .with_cooling_rate(config.cooling_rate)
        .with_max_iterations(config.iterations);
    if config.time_limit_ms > 0 {
        sa_config = sa_config.with_time_limit(Duration::from_millis(config.time_limit_ms));
    }

    let problem = OrderProblem {
        eval: &eval,
        progress,
        start: Instant::now(),
    };
    let runner = SaRunner::new(sa_config, problem, token.clone());
    let mut rng = seed_rng(config.seed);
    let result: SaResult<OrderSolution> = runner.run_with_rng(&mut rng);

    let stats = eval.cache_stats();
    info!(
        "annealing finished: {} iterations, best fitness {:.2}, cache hit rate {:.0}%",
        result.iterations,
        result.best.objective(),
        stats.hit_rate() * 100.0
    );

    eval.final_pack(&result.best.order, &result.best.rotations, token)
}
