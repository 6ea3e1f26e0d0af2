//! Error types for polybin.

use thiserror::Error;

/// Result type alias for polybin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur around the packing core.
///
/// The core itself is total: "could not place" is a normal return value,
/// never an error. These variants surface from input loading, configuration
/// validation, and invariant violations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed problem input (bad file, zero-area piece, degenerate polygon).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid bin dimensions.
    #[error("invalid bin: {0}")]
    InvalidBin(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Underlying I/O failure while reading or writing problem files.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Invariant violation; a bug in the engine rather than in the input.
    #[error("internal error: {0}")]
    Internal(String),
}
