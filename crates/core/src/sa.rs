//! Simulated annealing framework.
//!
//! Generic runner over a problem-supplied solution space. The packing
//! engine plugs in a permutation-plus-rotations solution; the runner only
//! sees objectives.

use std::time::{Duration, Instant};

use rand::prelude::*;

use crate::solver::CancelToken;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a simulated-annealing run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SaConfig {
    /// Initial temperature.
    pub initial_temperature: f64,
    /// Geometric cooling factor applied after every iteration.
    pub cooling_rate: f64,
    /// Temperature below which the run stops.
    pub final_temperature: f64,
    /// Iteration budget.
    pub max_iterations: u64,
    /// Optional wall-clock budget.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub time_limit: Option<Duration>,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 1000.0,
            cooling_rate: 0.995,
            final_temperature: 1e-3,
            max_iterations: 10_000,
            time_limit: None,
        }
    }
}

impl SaConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial temperature.
    pub fn with_initial_temperature(mut self, t0: f64) -> Self {
        self.initial_temperature = t0.max(1e-6);
        self
    }

    /// Sets the geometric cooling rate.
    pub fn with_cooling_rate(mut self, rate: f64) -> Self {
        self.cooling_rate = rate.clamp(1e-3, 1.0 - 1e-9);
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iterations(mut self, iterations: u64) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

/// A candidate solution with a cached objective. Higher is better.
pub trait SaSolution: Clone {
    /// Returns the cached objective value.
    fn objective(&self) -> f64;
}

/// Problem hooks for the annealing runner.
pub trait SaProblem {
    /// Solution type explored by the run.
    type Solution: SaSolution;

    /// Produces the starting solution, already evaluated.
    fn initial_solution<R: Rng>(&self, rng: &mut R) -> Self::Solution;

    /// Produces an unevaluated neighbor of `solution`.
    fn neighbor<R: Rng>(&self, solution: &Self::Solution, rng: &mut R) -> Self::Solution;

    /// Evaluates a solution, caching its objective.
    fn evaluate(&self, solution: &mut Self::Solution);

    /// Called after each iteration; default does nothing.
    fn on_iteration(&self, _iteration: u64, _temperature: f64, _best: &Self::Solution) {}
}

/// Outcome of an annealing run.
#[derive(Debug, Clone)]
pub struct SaResult<S> {
    /// Best solution observed.
    pub best: S,
    /// Iterations actually performed.
    pub iterations: u64,
    /// Temperature at the end of the run.
    pub final_temperature: f64,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
    /// Best objective sampled every 100 iterations.
    pub history: Vec<f64>,
}

/// Simulated-annealing runner.
pub struct SaRunner<P: SaProblem> {
    config: SaConfig,
    problem: P,
    token: CancelToken,
}

impl<P: SaProblem> SaRunner<P> {
    /// Creates a runner over the given problem.
    pub fn new(config: SaConfig, problem: P, token: CancelToken) -> Self {
        Self {
            config,
            problem,
            token,
        }
    }

    /// Returns the wrapped problem.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Runs the annealing loop with the given RNG.
    ///
    /// Accepts an improving neighbor unconditionally and a worsening one
    /// with probability `exp(delta / T)`. The temperature cools
    /// geometrically after every step. Cancellation is polled between
    /// iterations; the best-so-far is always returned.
    pub fn run_with_rng<R: Rng>(&self, rng: &mut R) -> SaResult<P::Solution> {
        let start = Instant::now();
        let mut history = Vec::new();

        let mut current = self.problem.initial_solution(rng);
        let mut best = current.clone();

        let mut temperature = self.config.initial_temperature;
        let mut iteration = 0u64;

        while iteration < self.config.max_iterations
            && temperature > self.config.final_temperature
        {
            if self.token.is_cancelled() {
                break;
            }
            if let Some(limit) = self.config.time_limit {
                if start.elapsed() > limit {
                    break;
                }
            }

            let mut neighbor = self.problem.neighbor(&current, rng);
            self.problem.evaluate(&mut neighbor);

            let delta = neighbor.objective() - current.objective();
            let accept = delta >= 0.0 || rng.gen::<f64>() < (delta / temperature).exp();

            if accept {
                current = neighbor;
                if current.objective() > best.objective() {
                    best = current.clone();
                }
            }

            temperature *= self.config.cooling_rate;
            iteration += 1;

            if iteration % 100 == 0 {
                history.push(best.objective());
            }
            self.problem.on_iteration(iteration, temperature, &best);
        }

        history.push(best.objective());

        SaResult {
            best,
            iterations: iteration,
            final_temperature: temperature,
            elapsed: start.elapsed(),
            history,
        }
    }
}
