//! Top-level solver over the packing strategies.

use log::info;
use polybin_core::{Aabb, CancelToken, Config, Result, Solver, Strategy};

use crate::ga_packing::optimize_ga;
use crate::hybrid_packing::optimize_hybrid;
use crate::packing::{pack, PackSolution};
use crate::piece::Piece;
use crate::sa_packing::optimize_sa;

/// Packs pieces with the configured strategy.
///
/// Equivalent to constructing a [`Packer`] and calling
/// [`Solver::solve`]; provided for one-shot callers.
pub fn optimize_and_pack(
    pieces: &[Piece],
    bin_dim: Aabb,
    config: &Config,
    token: &CancelToken,
) -> Result<PackSolution> {
    config.validate()?;
    if bin_dim.width() <= 0.0 || bin_dim.height() <= 0.0 {
        return Err(polybin_core::Error::InvalidBin(format!(
            "bin must have positive dimensions, got {} x {}",
            bin_dim.width(),
            bin_dim.height()
        )));
    }

    Ok(match config.strategy {
        Strategy::FirstFit => pack(pieces, bin_dim, config, token),
        Strategy::SimulatedAnnealing => optimize_sa(pieces, bin_dim, config, token),
        Strategy::Genetic => optimize_ga(pieces, bin_dim, config, token),
        Strategy::Hybrid => {
            let (solution, stats) = optimize_hybrid(pieces, bin_dim, config, token);
            info!(
                "hybrid stats: {} generations, {} polish iterations",
                stats.generations, stats.local_search_iterations
            );
            solution
        }
    })
}

/// A configured packing solver bound to one bin size.
pub struct Packer {
    bin_dim: Aabb,
    config: Config,
    token: CancelToken,
}

impl Packer {
    /// Creates a packer; the configuration is validated up front.
    pub fn new(bin_dim: Aabb, config: Config) -> Result<Self> {
        config.validate()?;
        if bin_dim.width() <= 0.0 || bin_dim.height() <= 0.0 {
            return Err(polybin_core::Error::InvalidBin(
                "bin must have positive dimensions".into(),
            ));
        }
        Ok(Self {
            bin_dim,
            config,
            token: CancelToken::new(),
        })
    }

    /// The cancellation token this packer polls. Clone it to cancel from
    /// another thread.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The bin rectangle.
    pub fn bin_dim(&self) -> &Aabb {
        &self.bin_dim
    }
}

impl Solver for Packer {
    type Piece = Piece;
    type Solution = PackSolution;

    fn solve(&self, pieces: &[Piece]) -> Result<PackSolution> {
        optimize_and_pack(pieces, self.bin_dim, &self.config, &self.token)
    }

    fn cancel(&self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_bin() {
        assert!(Packer::new(Aabb::with_size(0.0, 10.0), Config::default()).is_err());
        assert!(Packer::new(Aabb::with_size(10.0, -5.0), Config::default()).is_err());
    }

    #[test]
    fn rejects_bad_config() {
        let config = Config::default().with_rotation_angles(vec![]);
        assert!(Packer::new(Aabb::with_size(10.0, 10.0), config).is_err());
    }

    #[test]
    fn solves_with_default_strategy() {
        let packer = Packer::new(Aabb::with_size(100.0, 100.0), Config::default()).unwrap();
        let pieces = vec![Piece::rectangle(20.0, 20.0, 1)];
        let solution = packer.solve(&pieces).unwrap();
        assert_eq!(solution.bins.len(), 1);
        assert!(solution.all_placed());
    }

    #[test]
    fn cancel_through_the_trait() {
        let packer = Packer::new(Aabb::with_size(100.0, 100.0), Config::default()).unwrap();
        packer.cancel();
        let pieces = vec![Piece::rectangle(20.0, 20.0, 1)];
        let solution = packer.solve(&pieces).unwrap();
        assert!(solution.bins.is_empty());
        assert_eq!(solution.unplaced.len(), 1);
    }
}
