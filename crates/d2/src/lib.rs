//! # polybin-d2
//!
//! Two-dimensional irregular-shape bin packing.
//!
//! Given polygonal pieces (possibly concave, possibly holed) and a fixed
//! rectangular bin size, the engine assigns each piece a bin and a rigid
//! placement so that pieces stay inside their bin, interiors never
//! overlap, and few bins are used.
//!
//! ## Architecture
//!
//! - [`Piece`] - polygon geometry with id and accumulated rotation
//! - [`PieceIndex`] - R*-tree broad phase over placed bounding boxes
//! - [`Bin`] - Maximal-Rectangles engine: placement search, free-space
//!   bookkeeping, compaction, drop and sweep-replace
//! - [`pack`] / [`pack_ordered`] / [`pack_fast`] / [`pack_greedy`] -
//!   cross-bin strategies
//! - [`optimize_sa`], [`optimize_ga`], [`optimize_hybrid`] - search over
//!   piece orderings and rotations
//! - [`load_problem`] / [`write_bins`] - problem file I/O
//!
//! ## Quick start
//!
//! ```rust
//! use polybin_core::{Aabb, CancelToken, Config};
//! use polybin_d2::{pack, Piece};
//!
//! let pieces = vec![
//!     Piece::rectangle(30.0, 20.0, 1),
//!     Piece::l_shape(25.0, 25.0, 10.0, 10.0, 2),
//! ];
//! let bin = Aabb::with_size(100.0, 100.0);
//!
//! let solution = pack(&pieces, bin, &Config::default(), &CancelToken::new());
//! assert!(solution.all_placed());
//! println!("bins: {}, utilization: {:.1}%",
//!     solution.bins.len(),
//!     solution.utilization() * 100.0);
//! ```
//!
//! ## Optimizing
//!
//! ```rust,no_run
//! use polybin_core::{Aabb, CancelToken, Config, Strategy};
//! use polybin_d2::{optimize_and_pack, Piece};
//!
//! let pieces = vec![Piece::rectangle(30.0, 20.0, 1)];
//! let config = Config::default()
//!     .with_strategy(Strategy::SimulatedAnnealing)
//!     .with_seed(42)
//!     .with_iterations(5_000);
//!
//! let solution = optimize_and_pack(
//!     &pieces,
//!     Aabb::with_size(100.0, 100.0),
//!     &config,
//!     &CancelToken::new(),
//! ).unwrap();
//! ```

pub mod bin;
mod candidate;
pub mod ga_packing;
pub mod hybrid_packing;
pub mod io;
pub mod packer;
pub mod packing;
pub mod piece;
pub mod sa_packing;
pub mod spatial_index;

/// Crate-wide tolerance for coordinate comparisons, rectangle-split
/// thresholds and containment pruning.
pub const EPS: f64 = 1e-9;

// Re-exports
pub use bin::{Bin, PlacementChoice};
pub use ga_packing::{optimize_ga, optimize_ga_with_progress, PackOrdering};
pub use hybrid_packing::{optimize_hybrid, HybridStats};
pub use io::{load_problem, parse_problem, write_bins};
pub use packer::{optimize_and_pack, Packer};
pub use packing::{pack, pack_fast, pack_greedy, pack_ordered, PackSolution};
pub use piece::Piece;
pub use sa_packing::{optimize_sa, optimize_sa_with_progress, OrderSolution};
pub use spatial_index::{IndexEntry, PieceIndex};
pub use polybin_core::{Aabb, CancelToken, Config, Placement, Solver, Strategy, Vector};
