//! Genetic algorithm framework.
//!
//! Tournament selection, elitism, generational replacement. Crossover and
//! mutation live on the individual; evaluation lives on the problem so it
//! can be parallelized.

use std::time::{Duration, Instant};

use rand::prelude::*;
use rayon::prelude::*;

use crate::solver::CancelToken;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a GA run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaConfig {
    /// Population size.
    pub population_size: usize,
    /// Generation budget.
    pub max_generations: u32,
    /// Probability that a child is produced by crossover rather than
    /// cloning the first parent.
    pub crossover_rate: f64,
    /// Probability that a child is mutated.
    pub mutation_rate: f64,
    /// Individuals copied unchanged into the next generation.
    pub elite_count: usize,
    /// Tournament size for parent selection.
    pub tournament_size: usize,
    /// Generations without improvement before stopping (None = run out the
    /// budget).
    pub stagnation_limit: Option<u32>,
    /// Optional wall-clock budget.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub time_limit: Option<Duration>,
    /// Evaluate offspring in parallel with rayon.
    pub parallel: bool,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: 100,
            crossover_rate: 0.85,
            mutation_rate: 0.05,
            elite_count: 2,
            tournament_size: 3,
            stagnation_limit: Some(50),
            time_limit: None,
            parallel: false,
        }
    }
}

impl GaConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(2);
        self
    }

    /// Sets the generation budget.
    pub fn with_max_generations(mut self, generations: u32) -> Self {
        self.max_generations = generations;
        self
    }

    /// Sets the crossover rate.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the elite count.
    pub fn with_elite_count(mut self, count: usize) -> Self {
        self.elite_count = count;
        self
    }

    /// Sets the stagnation limit.
    pub fn with_stagnation_limit(mut self, generations: u32) -> Self {
        self.stagnation_limit = Some(generations);
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// An individual in the population. Fitness is cached; higher is better.
pub trait Individual: Clone + Send + Sync {
    /// Returns the cached fitness.
    fn fitness(&self) -> f64;

    /// Recombines with another individual.
    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self;

    /// Mutates in place, invalidating the cached fitness.
    fn mutate<R: Rng>(&mut self, rng: &mut R);
}

/// Problem hooks for the GA runner.
pub trait GaProblem: Sync {
    /// Individual type evolved by the run.
    type Individual: Individual;

    /// Evaluates one individual, caching its fitness.
    fn evaluate(&self, individual: &mut Self::Individual);

    /// Evaluates a batch, optionally in parallel.
    fn evaluate_all(&self, individuals: &mut [Self::Individual], parallel: bool) {
        if parallel {
            individuals.par_iter_mut().for_each(|ind| self.evaluate(ind));
        } else {
            for ind in individuals.iter_mut() {
                self.evaluate(ind);
            }
        }
    }

    /// Builds the initial population (unevaluated).
    fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R)
        -> Vec<Self::Individual>;

    /// Called after each generation; default does nothing.
    fn on_generation(&self, _generation: u32, _best: &Self::Individual) {}
}

/// Outcome of a GA run.
#[derive(Debug, Clone)]
pub struct GaResult<I> {
    /// Best individual observed.
    pub best: I,
    /// Generations actually performed.
    pub generations: u32,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
    /// Best fitness per generation.
    pub history: Vec<f64>,
}

/// Genetic-algorithm runner.
pub struct GaRunner<P: GaProblem> {
    config: GaConfig,
    problem: P,
    token: CancelToken,
}

impl<P: GaProblem> GaRunner<P> {
    /// Creates a runner over the given problem.
    pub fn new(config: GaConfig, problem: P, token: CancelToken) -> Self {
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

    fn tournament_select<'a, R: Rng>(
        &self,
        population: &'a [P::Individual],
        rng: &mut R,
    ) -> &'a P::Individual {
        let mut best = &population[rng.gen_range(0..population.len())];
        for _ in 1..self.config.tournament_size.max(1) {
            let challenger = &population[rng.gen_range(0..population.len())];
            if challenger.fitness() > best.fitness() {
                best = challenger;
            }
        }
        best
    }

    /// Runs the evolutionary loop with the given RNG.
    ///
    /// Cancellation is polled between generations; the best-so-far is
    /// always returned.
    pub fn run_with_rng<R: Rng>(&self, rng: &mut R) -> GaResult<P::Individual> {
        let start = Instant::now();
        let mut history = Vec::new();

        let mut population = self
            .problem
            .initialize_population(self.config.population_size, rng);
        self.problem.evaluate_all(&mut population, self.config.parallel);
        population.sort_by(|a, b| {
            b.fitness()
                .partial_cmp(&a.fitness())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut best = population[0].clone();
        let mut stagnation = 0u32;
        let mut generation = 0u32;

        while generation < self.config.max_generations {
            if self.token.is_cancelled() {
                break;
            }
            if let Some(limit) = self.config.time_limit {
                if start.elapsed() > limit {
                    break;
                }
            }

            let elite_count = self.config.elite_count.min(population.len());
            let mut next: Vec<P::Individual> =
                population.iter().take(elite_count).cloned().collect();

            let mut children =
                Vec::with_capacity(self.config.population_size - next.len());
            while children.len() + next.len() < self.config.population_size {
                let parent1 = self.tournament_select(&population, rng);
                let parent2 = self.tournament_select(&population, rng);

                let mut child = if rng.gen::<f64>() < self.config.crossover_rate {
                    parent1.crossover(parent2, rng)
                } else {
                    parent1.clone()
                };
                if rng.gen::<f64>() < self.config.mutation_rate {
                    child.mutate(rng);
                }
                children.push(child);
            }

            self.problem.evaluate_all(&mut children, self.config.parallel);
            next.extend(children);
            next.sort_by(|a, b| {
                b.fitness()
                    .partial_cmp(&a.fitness())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            if next[0].fitness() > best.fitness() {
                best = next[0].clone();
                stagnation = 0;
            } else {
                stagnation += 1;
            }

            history.push(best.fitness());
            self.problem.on_generation(generation, &best);

            population = next;
            generation += 1;

            if let Some(limit) = self.config.stagnation_limit {
                if stagnation >= limit {
                    break;
                }
            }
        }

        GaResult {
            best,
            generations: generation,
            elapsed: start.elapsed(),
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    /// Toy problem: maximize the number of ones in a bit vector.
    struct OneMax {
        size: usize,
    }

    #[derive(Debug, Clone)]
    struct BitVec {
        bits: Vec<bool>,
        fitness: f64,
    }

    impl Individual for BitVec {
        fn fitness(&self) -> f64 {
            self.fitness
        }

        fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
            let cut = rng.gen_range(0..self.bits.len());
            let mut bits = self.bits[..cut].to_vec();
            bits.extend_from_slice(&other.bits[cut..]);
            BitVec {
                bits,
                fitness: f64::NEG_INFINITY,
            }
        }

        fn mutate<R: Rng>(&mut self, rng: &mut R) {
            let i = rng.gen_range(0..self.bits.len());
            self.bits[i] = !self.bits[i];
            self.fitness = f64::NEG_INFINITY;
        }
    }

    impl GaProblem for OneMax {
        type Individual = BitVec;

        fn evaluate(&self, individual: &mut BitVec) {
            individual.fitness = individual.bits.iter().filter(|&&b| b).count() as f64;
        }

        fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<BitVec> {
            (0..size)
                .map(|_| BitVec {
                    bits: (0..self.size).map(|_| rng.gen()).collect(),
                    fitness: f64::NEG_INFINITY,
                })
                .collect()
        }
    }

    #[test]
    fn evolves_toward_all_ones() {
        let config = GaConfig::default()
            .with_population_size(30)
            .with_max_generations(60)
            .with_mutation_rate(0.2);
        let runner = GaRunner::new(config, OneMax { size: 16 }, CancelToken::new());
        let mut rng = StdRng::seed_from_u64(11);
        let result = runner.run_with_rng(&mut rng);
        assert!(result.best.fitness() >= 14.0);
        assert!(result.generations > 0);
    }

    #[test]
    fn elitism_never_loses_the_best() {
        let config = GaConfig::default()
            .with_population_size(10)
            .with_max_generations(30);
        let runner = GaRunner::new(config, OneMax { size: 8 }, CancelToken::new());
        let mut rng = StdRng::seed_from_u64(5);
        let result = runner.run_with_rng(&mut rng);
        for window in result.history.windows(2) {
            assert!(window[1] >= window[0]);
        }
    }

    #[test]
    fn cancellation_stops_immediately() {
        let token = CancelToken::new();
        token.cancel();
        let runner = GaRunner::new(GaConfig::default(), OneMax { size: 8 }, token);
        let mut rng = StdRng::seed_from_u64(2);
        let result = runner.run_with_rng(&mut rng);
        assert_eq!(result.generations, 0);
    }
}
