//! Placement records produced by the packing engine.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier carried by a piece through every transform and placement.
pub type PieceId = u32;

/// Final placement of a single piece.
///
/// `x`/`y` is the min corner of the piece's bounding box after rotation and
/// translation, in bin coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    /// Id of the placed piece.
    pub id: PieceId,
    /// Index of the bin the piece landed in.
    pub bin: usize,
    /// Accumulated rotation in degrees, normalized to `[0, 360)`.
    pub rotation: f64,
    /// Bounding-box min-corner x.
    pub x: f64,
    /// Bounding-box min-corner y.
    pub y: f64,
}

impl Placement {
    /// Creates a new placement record.
    pub fn new(id: PieceId, bin: usize, rotation: f64, x: f64, y: f64) -> Self {
        Self {
            id,
            bin,
            rotation,
            x,
            y,
        }
    }
}

/// Aggregate statistics over a set of placements.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlacementStats {
    /// Number of placed pieces.
    pub placed: usize,
    /// Number of bins referenced by the placements.
    pub bins_used: usize,
    /// Number of pieces that were placed rotated (non-zero angle).
    pub rotated: usize,
}

impl PlacementStats {
    /// Computes statistics from a placement list.
    pub fn from_placements(placements: &[Placement]) -> Self {
        let bins_used = placements
            .iter()
            .map(|p| p.bin + 1)
            .max()
            .unwrap_or(0);
        let rotated = placements.iter().filter(|p| p.rotation != 0.0).count();
        Self {
            placed: placements.len(),
            bins_used,
            rotated,
        }
    }
}
