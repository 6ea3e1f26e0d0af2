//! polybin command-line front-end.
//!
//! Reads a problem file, packs it with the selected strategy, and writes
//! one placement file per bin.
//!
//! Exit codes: 0 on success, 1 on a missing or malformed input file, 2
//! when the run was cancelled and partial results were written.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::{error, info};
use polybin_core::{CancelToken, Config, PlacementStats, Strategy};
use polybin_d2::{load_problem, optimize_and_pack, write_bins};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Multi-stage packing in area order (fast).
    FirstFit,
    /// Simulated annealing over piece orderings.
    Sa,
    /// Genetic algorithm over piece orderings.
    Genetic,
    /// Greedy-seeded population search with local polish.
    Hybrid,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::FirstFit => Strategy::FirstFit,
            StrategyArg::Sa => Strategy::SimulatedAnnealing,
            StrategyArg::Genetic => Strategy::Genetic,
            StrategyArg::Hybrid => Strategy::Hybrid,
        }
    }
}

#[derive(Parser)]
#[command(name = "polybin")]
#[command(about = "2D irregular-shape bin packing")]
#[command(version)]
struct Cli {
    /// Problem file: bin size, piece count, then one piece per line.
    input: PathBuf,

    /// Packing strategy.
    #[arg(short, long, value_enum, default_value = "first-fit")]
    strategy: StrategyArg,

    /// Evaluate optimizer candidates in parallel.
    #[arg(long)]
    parallel: bool,

    /// RNG seed for the optimizers (derived from the clock if omitted).
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for the per-bin output files.
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Iteration budget for simulated annealing.
    #[arg(long)]
    iterations: Option<u64>,

    /// Generation budget for the genetic and hybrid strategies.
    #[arg(long)]
    generations: Option<u32>,

    /// Population size for the genetic and hybrid strategies.
    #[arg(long)]
    population: Option<usize>,

    /// Wall-clock budget in milliseconds (0 = unlimited).
    #[arg(long)]
    time_limit_ms: Option<u64>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let (bin_dim, pieces) = match load_problem(&cli.input) {
        Ok(problem) => problem,
        Err(err) => {
            error!("failed to load {}: {err}", cli.input.display());
            return ExitCode::from(1);
        }
    };
    info!(
        "loaded {} piece(s), bin {} x {}",
        pieces.len(),
        bin_dim.width(),
        bin_dim.height()
    );

    let mut config = Config::default()
        .with_strategy(cli.strategy.into())
        .with_parallel(cli.parallel);
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if let Some(iterations) = cli.iterations {
        config = config.with_iterations(iterations);
    }
    if let Some(generations) = cli.generations {
        config = config.with_generations(generations);
    }
    if let Some(population) = cli.population {
        config = config.with_population_size(population);
    }
    if let Some(limit) = cli.time_limit_ms {
        config = config.with_time_limit(limit);
    }

    let token = CancelToken::new();
    let solution = match optimize_and_pack(&pieces, bin_dim, &config, &token) {
        Ok(solution) => solution,
        Err(err) => {
            error!("packing failed: {err}");
            return ExitCode::from(1);
        }
    };

    let stats = PlacementStats::from_placements(&solution.placements());
    info!(
        "packed {} piece(s) ({} rotated) into {} bin(s), mean utilization {:.1}%",
        stats.placed,
        stats.rotated,
        stats.bins_used,
        solution.utilization() * 100.0
    );
    if !solution.unplaced.is_empty() {
        let ids: Vec<_> = solution.unplaced.iter().map(|p| p.id()).collect();
        error!("{} piece(s) could not be placed: {ids:?}", ids.len());
    }

    if let Err(err) = write_bins(&cli.out, &solution.bins) {
        error!("failed to write results to {}: {err}", cli.out.display());
        return ExitCode::from(1);
    }

    if token.is_cancelled() {
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}
