//! Genetic-algorithm optimization of the packing order.
//!
//! Chromosomes pair a permutation of piece indices with a rotation index
//! per position. Order crossover (OX1) recombines permutations; mutation
//! swaps positions or re-rolls a rotation. Fitness comes from the fast
//! packing variant.

use std::time::{Duration, Instant};

use log::{debug, info};
use polybin_core::ga::{GaConfig, GaProblem, GaRunner, Individual};
use polybin_core::{Aabb, CancelToken, Config, ProgressCallback, ProgressInfo};
use rand::prelude::*;

use crate::candidate::{seed_rng, SequenceEval};
use crate::packing::{pack, PackSolution};
use crate::piece::Piece;

/// A GA chromosome: placement order plus rotations.
#[derive(Debug, Clone)]
pub struct PackOrdering {
    /// Permutation of piece indices.
    pub order: Vec<usize>,
    /// Rotation index per position.
    pub rotations: Vec<usize>,
    rotation_options: usize,
    fitness: f64,
}

impl PackOrdering {
    /// Identity ordering with no rotations.
    pub fn identity(n: usize, rotation_options: usize) -> Self {
        Self {
            order: (0..n).collect(),
            rotations: vec![0; n],
            rotation_options: rotation_options.max(1),
            fitness: f64::NEG_INFINITY,
        }
    }

    /// Uniformly random ordering and rotations.
    pub fn random<R: Rng>(n: usize, rotation_options: usize, rng: &mut R) -> Self {
        let mut chromosome = Self::identity(n, rotation_options);
        chromosome.order.shuffle(rng);
        for rotation in chromosome.rotations.iter_mut() {
            *rotation = rng.gen_range(0..chromosome.rotation_options);
        }
        chromosome
    }

    pub(crate) fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    /// A specific order with zero rotations, used for greedy seeds.
    pub fn from_order(order: Vec<usize>, rotation_options: usize) -> Self {
        let n = order.len();
        Self {
            order,
            rotations: vec![0; n],
            rotation_options: rotation_options.max(1),
            fitness: f64::NEG_INFINITY,
        }
    }

    /// Order crossover (OX1): copy a segment from this parent, then fill
    /// the remaining positions with the other parent's pieces in their
    /// order, skipping those already present.
    fn order_crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let n = self.order.len();
        if n < 2 {
            return self.clone();
        }

        let (mut lo, mut hi) = (rng.gen_range(0..n), rng.gen_range(0..n));
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }

        let mut child_order = vec![usize::MAX; n];
        let mut taken = vec![false; n];
        for i in lo..=hi {
            child_order[i] = self.order[i];
            taken[self.order[i]] = true;
        }

        let mut source = (hi + 1) % n;
        for offset in 0..n {
            let position = (hi + 1 + offset) % n;
            if child_order[position] != usize::MAX {
                continue;
            }
            while taken[other.order[source]] {
                source = (source + 1) % n;
            }
            child_order[position] = other.order[source];
            taken[other.order[source]] = true;
            source = (source + 1) % n;
        }

        // Rotations inherit uniformly.
        let rotations = self
            .rotations
            .iter()
            .zip(&other.rotations)
            .map(|(&a, &b)| if rng.gen() { a } else { b })
            .collect();

        Self {
            order: child_order,
            rotations,
            rotation_options: self.rotation_options,
            fitness: f64::NEG_INFINITY,
        }
    }
}

impl Individual for PackOrdering {
    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        self.order_crossover(other, rng)
    }

    fn mutate<R: Rng>(&mut self, rng: &mut R) {
        if self.order.len() < 2 {
            return;
        }
        if rng.gen::<f64>() < 0.7 || self.rotation_options <= 1 {
            let i = rng.gen_range(0..self.order.len());
            let j = rng.gen_range(0..self.order.len());
            self.order.swap(i, j);
            self.rotations.swap(i, j);
        } else {
            let i = rng.gen_range(0..self.rotations.len());
            self.rotations[i] = rng.gen_range(0..self.rotation_options);
        }
        self.fitness = f64::NEG_INFINITY;
    }
}

pub(crate) struct OrderingProblem<'a> {
    pub eval: &'a SequenceEval<'a>,
    /// Seed orderings injected into the initial population.
    pub seeds: Vec<Vec<usize>>,
    pub progress: Option<&'a ProgressCallback>,
    pub start: Instant,
}

impl GaProblem for OrderingProblem<'_> {
    type Individual = PackOrdering;

    fn evaluate(&self, individual: &mut PackOrdering) {
        individual.fitness = self.eval.fitness(&individual.order, &individual.rotations);
    }

    fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<PackOrdering> {
        let options = self.eval.rotation_options();
        let mut population: Vec<PackOrdering> = self
            .seeds
            .iter()
            .take(size)
            .map(|order| PackOrdering::from_order(order.clone(), options))
            .collect();
        while population.len() < size {
            population.push(PackOrdering::random(self.eval.len(), options, rng));
        }
        population
    }

    fn on_generation(&self, generation: u32, best: &PackOrdering) {
        debug!("generation {generation}: best {:.2}", best.fitness());
        if let Some(callback) = self.progress {
            callback(ProgressInfo {
                iteration: u64::from(generation),
                best_fitness: best.fitness(),
                temperature: None,
                cache_hit_rate: Some(self.eval.cache_stats().hit_rate()),
                elapsed_ms: self.start.elapsed().as_millis() as u64,
            });
        }
    }
}

pub(crate) fn ga_config_from(config: &Config) -> GaConfig {
    let mut ga_config = GaConfig::new()
        .with_population_size(config.population_size)
        .with_max_generations(config.generations)
        .with_crossover_rate(config.crossover_rate)
        .with_mutation_rate(config.mutation_rate)
        .with_elite_count(config.elite_count)
        .with_stagnation_limit(config.no_improvement_limit)
        .with_parallel(config.parallel);
    if config.time_limit_ms > 0 {
        ga_config = ga_config.with_time_limit(Duration::from_millis(config.time_limit_ms));
    }
    ga_config
}

/// Runs the GA over piece orderings, then packs the best ordering through
/// the full strategy.
pub fn optimize_ga(
    pieces: &[Piece],
    bin_dim: Aabb,
    config: &Config,
    token: &CancelToken,
) -> PackSolution {
    optimize_ga_with_progress(pieces, bin_dim, config, token, None)
}

/// [`optimize_ga`] with a progress callback invoked once per generation.
pub fn optimize_ga_with_progress(
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
    let problem = OrderingProblem {
        eval: &eval,
        seeds: Vec::new(),
        progress,
        start: Instant::now(),
    };
    let runner = GaRunner::new(ga_config_from(config), problem, token.clone());
    let mut rng = seed_rng(config.seed);
    let result = runner.run_with_rng(&mut rng);

    let stats = eval.cache_stats();
    info!(
        "evolution finished: {} generations, best fitness {:.2}, cache hit rate {:.0}%",
        result.generations,
        result.best.fitness(),
        stats.hit_rate() * 100.0
    );

    eval.final_pack(&result.best.order, &result.best.rotations, token)
}
