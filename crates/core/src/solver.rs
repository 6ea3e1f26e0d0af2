//! Solver trait, configuration and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Packing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Strategy {
    /// Plain multi-stage packing in area-descending order (fast).
    #[default]
    FirstFit,
    /// Simulated annealing over piece orderings and rotations.
    SimulatedAnnealing,
    /// Genetic algorithm over piece orderings and rotations.
    Genetic,
    /// Greedy-seeded population search with a local-search polish.
    Hybrid,
}

/// Configuration shared by the packing strategies.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Packing strategy.
    pub strategy: Strategy,

    /// Evaluate candidate solutions in parallel. The sequential path is
    /// usually faster for small piece counts.
    pub parallel: bool,

    /// Rotation angles in degrees tried by the drop stage and by the
    /// optimizers. Stage-1 placement always probes 0/90 through the
    /// bounding-box fit tests.
    pub rotation_angles: Vec<f64>,

    /// Horizontal step divisor for the drop sweep.
    pub dive_factor: u32,

    /// Horizontal grid divisor for sweep-replace.
    pub sweep_dx_factor: u32,

    /// Vertical grid divisor for sweep-replace.
    pub sweep_dy_factor: u32,

    /// RNG seed for the optimizers. `None` derives one from the clock.
    pub seed: Option<u64>,

    /// Wall-clock budget in milliseconds (0 = unlimited).
    pub time_limit_ms: u64,

    // Metaheuristic sub-options.
    /// Population size (GA, hybrid).
    pub population_size: usize,

    /// Maximum generations (GA, hybrid).
    pub generations: u32,

    /// Maximum iterations (SA).
    pub iterations: u64,

    /// Initial temperature (SA).
    pub initial_temperature: f64,

    /// Geometric cooling rate applied per iteration (SA).
    pub cooling_rate: f64,

    /// Elite individuals preserved per generation (GA, hybrid).
    pub elite_count: usize,

    /// Mutation rate (GA, hybrid).
    pub mutation_rate: f64,

    /// Crossover rate (GA, hybrid).
    pub crossover_rate: f64,

    /// Generations without improvement before stopping (GA, hybrid
    /// local search).
    pub no_improvement_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            parallel: false,
            rotation_angles: vec![0.0, 90.0, 180.0, 270.0],
            dive_factor: 3,
            sweep_dx_factor: 10,
            sweep_dy_factor: 2,
            seed: None,
            time_limit_ms: 0,
            population_size: 50,
            generations: 100,
            iterations: 10_000,
            initial_temperature: 1000.0,
            cooling_rate: 0.995,
            elite_count: 2,
            mutation_rate: 0.05,
            crossover_rate: 0.85,
            no_improvement_limit: 20,
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the packing strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enables or disables parallel candidate evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the rotation angles in degrees.
    pub fn with_rotation_angles(mut self, angles: Vec<f64>) -> Self {
        self.rotation_angles = angles;
        self
    }

    /// Sets the drop-sweep step divisor.
    pub fn with_dive_factor(mut self, factor: u32) -> Self {
        self.dive_factor = factor.max(1);
        self
    }

    /// Sets the sweep-replace grid divisors.
    pub fn with_sweep_factors(mut self, dx: u32, dy: u32) -> Self {
        self.sweep_dx_factor = dx.max(1);
        self.sweep_dy_factor = dy.max(1);
        self
    }

    /// Sets the optimizer RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the wall-clock budget in milliseconds.
    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    /// Sets the SA iteration budget.
    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the GA generation budget.
    pub fn with_generations(mut self, generations: u32) -> Self {
        self.generations = generations;
        self
    }

    /// Sets the GA/hybrid population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(2);
        self
    }

    /// Checks the configuration for inconsistencies.
    pub fn validate(&self) -> Result<()> {
        if self.rotation_angles.is_empty() {
            return Err(crate::Error::Config(
                "rotation_angles must not be empty".into(),
            ));
        }
        if self.dive_factor == 0 || self.sweep_dx_factor == 0 || self.sweep_dy_factor == 0 {
            return Err(crate::Error::Config(
                "step divisors must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate)
            || !(0.0..=1.0).contains(&self.crossover_rate)
        {
            return Err(crate::Error::Config(
                "mutation and crossover rates must be in [0, 1]".into(),
            ));
        }
        if self.cooling_rate <= 0.0 || self.cooling_rate >= 1.0 {
            return Err(crate::Error::Config(
                "cooling_rate must be in (0, 1)".into(),
            ));
        }
        Ok(())
    }
}

/// Cooperative cancellation token.
///
/// The caller owns the token; the engine only reads it, at documented
/// boundaries (between bins, between optimizer iterations). On cancel the
/// best partial result is returned.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Progress callback for long-running solves.
pub type ProgressCallback = Box<dyn Fn(ProgressInfo) + Send + Sync>;

/// Snapshot of optimizer progress.
#[derive(Debug, Clone, Default)]
pub struct ProgressInfo {
    /// Current iteration or generation.
    pub iteration: u64,
    /// Best fitness observed so far.
    pub best_fitness: f64,
    /// Current temperature (SA only).
    pub temperature: Option<f64>,
    /// Shape-cache hit rate, when a cache is active.
    pub cache_hit_rate: Option<f64>,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: u64,
}

/// Common interface for the packing strategies.
pub trait Solver {
    /// Input piece type.
    type Piece;
    /// Produced solution type.
    type Solution;

    /// Runs the solver over the given pieces.
    fn solve(&self, pieces: &[Self::Piece]) -> Result<Self::Solution>;

    /// Requests cancellation of an ongoing solve.
    fn cancel(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_empty_rotations() {
        let config = Config::default().with_rotation_angles(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_clamps_factors() {
        let config = Config::default().with_dive_factor(0).with_sweep_factors(0, 0);
        assert_eq!(config.dive_factor, 1);
        assert_eq!(config.sweep_dx_factor, 1);
        assert_eq!(config.sweep_dy_factor, 1);
    }

    #[test]
    fn cancel_token_roundtrip() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
    }
}
