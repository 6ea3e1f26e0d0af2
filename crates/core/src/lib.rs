//! # polybin-core
//!
//! Core abstractions for the polybin 2D bin-packing engine.
//!
//! This crate holds everything that is independent of the concrete
//! geometry kernel: error and result types, the placement record,
//! axis-aligned rectangle primitives, solver configuration and
//! cancellation, the simulated-annealing and genetic-algorithm frameworks,
//! and a content-addressed memoization cache for derived shapes.
//!
//! ## Components
//!
//! - [`Error`] / [`Result`] - the library error surface
//! - [`Aabb`], [`Vector`] - rectangle and displacement primitives
//! - [`Placement`] - per-piece output record
//! - [`Config`], [`Strategy`], [`CancelToken`], [`Solver`] - solver surface
//! - [`SaRunner`] / [`SaProblem`] - simulated-annealing framework
//! - [`GaRunner`] / [`GaProblem`] - genetic-algorithm framework
//! - [`ShapeCache`] - memoization for expensive geometry
//!
//! ## Feature flags
//!
//! - `serde`: serialization support on public config and result types

pub mod error;
pub mod ga;
pub mod geom;
pub mod memory;
pub mod placement;
pub mod sa;
pub mod solver;

// Re-exports
pub use error::{Error, Result};
pub use ga::{GaConfig, GaProblem, GaResult, GaRunner, Individual};
pub use geom::{Aabb, Vector};
pub use memory::{CacheStats, ShapeCache, ShapeKey};
pub use placement::{PieceId, Placement, PlacementStats};
pub use sa::{SaConfig, SaProblem, SaResult, SaRunner, SaSolution};
pub use solver::{
    CancelToken, Config, ProgressCallback, ProgressInfo, Solver, Strategy,
};
