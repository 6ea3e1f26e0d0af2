//! Broad-phase collision index over placed pieces.
//!
//! An R*-tree keyed by bounding box. Entries carry the slot of the piece
//! in the bin's placed list; queries return candidate slots and the caller
//! performs the precise geometric follow-up.

use polybin_core::Aabb;
use rstar::{RTree, RTreeObject, AABB};

/// One placed piece in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Position of the piece in the bin's placed list.
    pub slot: usize,
    aabb: [f64; 4],
}

impl IndexEntry {
    /// Creates an entry for a slot with the given bounding box.
    pub fn new(slot: usize, bbox: &Aabb) -> Self {
        Self {
            slot,
            aabb: [bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y],
        }
    }
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.aabb[0], self.aabb[1]], [self.aabb[2], self.aabb[3]])
    }
}

/// R*-tree broad phase over placed-piece bounding boxes.
#[derive(Debug, Clone, Default)]
pub struct PieceIndex {
    tree: RTree<IndexEntry>,
}

impl PieceIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a slot with its bounding box.
    pub fn insert(&mut self, slot: usize, bbox: &Aabb) {
        self.tree.insert(IndexEntry::new(slot, bbox));
    }

    /// Removes a slot previously inserted with the same bounding box.
    /// Returns whether an entry was found.
    pub fn remove(&mut self, slot: usize, bbox: &Aabb) -> bool {
        self.tree.remove(&IndexEntry::new(slot, bbox)).is_some()
    }

    /// Returns the slots whose bounding boxes intersect the query box.
    pub fn query(&self, bbox: &Aabb) -> Vec<usize> {
        let envelope = AABB::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.slot)
            .collect()
    }

    /// Number of indexed pieces.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Drops all entries.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    /// Iterates over all entries, for invariant checks.
    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.tree.iter()
    }
}
