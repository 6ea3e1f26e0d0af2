//! Hybrid optimization: greedy seeds, a capped evolutionary phase, and a
//! local-search polish.
//!
//! The initial population mixes greedy orderings under several sort keys
//! with random ones; the GA runs under a generation cap and wall-clock
//! budget; the best survivor is hill-climbed with the same neighborhood
//! moves the annealer uses.

use std::time::{Duration, Instant};

use log::info;
use polybin_core::ga::{GaRunner, Individual};
use polybin_core::{Aabb, CacheStats, CancelToken, Config};

use crate::candidate::{random_move, seed_rng, SequenceEval};
use crate::ga_packing::{ga_config_from, OrderingProblem};
use crate::packing::{pack, PackSolution};
use crate::piece::Piece;

/// Wall-clock budget applied when the configuration leaves it unlimited.
const DEFAULT_TIME_BUDGET_MS: u64 = 30_000;

/// How many neighbors the polish samples per iteration.
const LOCAL_SEARCH_SAMPLES: usize = 4;

/// Counters from a hybrid run.
#[derive(Debug, Clone, Default)]
pub struct HybridStats {
    /// Generations performed by the evolutionary phase.
    pub generations: u32,
    /// Iterations performed by the local-search polish.
    pub local_search_iterations: u32,
    /// Best fitness reached.
    pub best_fitness: f64,
    /// Rotation-cache counters.
    pub cache: CacheStats,
}

/// Greedy seed orderings: indices sorted descending under each key.
fn greedy_seed_orders(pieces: &[Piece]) -> Vec<Vec<usize>> {
    let keys: Vec<Box<dyn Fn(&Piece) -> f64>> = vec![
        Box::new(|p| p.area()),
        Box::new(|p| p.perimeter()),
        Box::new(|p| p.bbox().width().max(p.bbox().height())),
        Box::new(|p| p.bbox().width()),
        Box::new(|p| p.bbox().height()),
        Box::new(|p| {
            let bb = p.bbox();
            let (long, short) = if bb.width() >= bb.height() {
                (bb.width(), bb.height())
            } else {
                (bb.height(), bb.width())
            };
            if short > 0.0 {
                long / short
            } else {
                f64::MAX
            }
        }),
        Box::new(|p| {
            let bbox_area = p.bbox().area();
            if bbox_area > 0.0 {
                p.area() / bbox_area
            } else {
                0.0
            }
        }),
    ];

    keys.iter()
        .map(|key| {
            let mut order: Vec<usize> = (0..pieces.len()).collect();
            order.sort_by(|&a, &b| {
                key(&pieces[b])
                    .partial_cmp(&key(&pieces[a]))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            order
        })
        .collect()
}

/// Runs the hybrid optimizer and materializes the winner through the full
/// strategy.
pub fn optimize_hybrid(
    pieces: &[Piece],
    bin_dim: Aabb,
    config: &Config,
    token: &CancelToken,
) -> (PackSolution, HybridStats) {
    if pieces.len() < 2 {
        let solution = pack(pieces, bin_dim, config, token);
        return (solution, HybridStats::default());
    }

    let start = Instant::now();
    let budget = Duration::from_millis(if config.time_limit_ms > 0 {
        config.time_limit_ms
    } else {
        DEFAULT_TIME_BUDGET_MS
    });

    let eval = SequenceEval::new(pieces, bin_dim, config);
    let mut rng = seed_rng(config.seed);

    // Evolutionary phase, seeded with the greedy orderings.
    let problem = OrderingProblem {
        eval: &eval,
        seeds: greedy_seed_orders(pieces),
        progress: None,
        start,
    };
    let ga_config = ga_config_from(config).with_time_limit(budget);
    let runner = GaRunner::new(ga_config, problem, token.clone());
    let ga_result = runner.run_with_rng(&mut rng);

    let mut best = ga_result.best;

    // Local-search polish: sample a few neighbors per iteration and keep
    // improvements.
    let options = eval.rotation_options();
    let mut stall = 0u32;
    let mut ls_iterations = 0u32;
    while stall < config.no_improvement_limit
        && !token.is_cancelled()
        && start.elapsed() < budget
    {
        let mut improved = false;
        for _ in 0..LOCAL_SEARCH_SAMPLES {
            let mut neighbor = best.clone();
            random_move(&mut neighbor.order, &mut neighbor.rotations, options, &mut rng);
            let fitness = eval.fitness(&neighbor.order, &neighbor.rotations);
            if fitness > best.fitness() {
                neighbor.set_fitness(fitness);
                best = neighbor;
                improved = true;
            }
        }
        ls_iterations += 1;
        if improved {
            stall = 0;
        } else {
            stall += 1;
        }
    }

    let stats = HybridStats {
        generations: ga_result.generations,
        local_search_iterations: ls_iterations,
        best_fitness: best.fitness(),
        cache: eval.cache_stats(),
    };
    info!(
        "hybrid finished: {} generations + {} polish iterations, best fitness {:.2}, cache hit rate {:.0}%",
        stats.generations,
        stats.local_search_iterations,
        stats.best_fitness,
        stats.cache.hit_rate() * 100.0
    );

    let solution = eval.final_pack(&best.order, &best.rotations, token);
    (solution, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim100() -> Aabb {
        Aabb::with_size(100.0, 100.0)
    }

    fn quick_config() -> Config {
        Config::default()
            .with_seed(13)
            .with_generations(5)
            .with_population_size(10)
            .with_time_limit(10_000)
    }

    #[test]
    fn seed_orders_are_permutations() {
        let pieces = vec![
            Piece::rectangle(30.0, 10.0, 1),
            Piece::rectangle(20.0, 20.0, 2),
            Piece::l_shape(25.0, 25.0, 10.0, 10.0, 3),
        ];
        let seeds = greedy_seed_orders(&pieces);
        assert_eq!(seeds.len(), 7);
        for order in seeds {
            let mut sorted = order.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2]);
        }
    }

    #[test]
    fn area_seed_is_descending() {
        let pieces = vec![
            Piece::rectangle(10.0, 10.0, 1),
            Piece::rectangle(40.0, 40.0, 2),
            Piece::rectangle(20.0, 20.0, 3),
        ];
        let seeds = greedy_seed_orders(&pieces);
        // The first key is area.
        assert_eq!(seeds[0], vec![1, 2, 0]);
    }

    #[test]
    fn places_everything_on_easy_input() {
        let pieces: Vec<Piece> = (1..=4).map(|i| Piece::rectangle(20.0, 20.0, i)).collect();
        let (solution, stats) =
            optimize_hybrid(&pieces, dim100(), &quick_config(), &CancelToken::new());
        assert_eq!(solution.bins.len(), 1);
        assert!(solution.all_placed());
        assert!(stats.best_fitness > -20_000.0);
        for bin in &solution.bins {
            assert!(bin.invariants_hold());
        }
    }

    #[test]
    fn single_piece_skips_the_search() {
        let pieces = vec![Piece::rectangle(20.0, 20.0, 1)];
        let (solution, stats) =
            optimize_hybrid(&pieces, dim100(), &quick_config(), &CancelToken::new());
        assert!(solution.all_placed());
        assert_eq!(stats.generations, 0);
    }
}
