//! Single-bin placement engine.
//!
//! Maximal-Rectangles bookkeeping over one bin: placement search by
//! min-side wastage, four-way free-rectangle splitting with containment
//! pruning, gravity compaction, top-drop, and sweep-replace into the
//! concavities of already-placed pieces.

use polybin_core::{Aabb, Config, Vector};

use crate::piece::Piece;
use crate::spatial_index::PieceIndex;
use crate::EPS;

/// Where `find_placement` wants to put a piece.
#[derive(Debug, Clone, Copy)]
pub struct PlacementChoice {
    /// Index into the free-rectangle list.
    pub rect_index: usize,
    /// Whether the piece goes in turned by 90 degrees.
    pub rotated: bool,
    /// min(leftover width, leftover height) for the chosen rectangle.
    pub wastage: f64,
}

/// A bin with its placed pieces, free rectangles and spatial index.
///
/// The placed list is insertion-ordered; the index entries correspond
/// one-to-one with it by slot. Every operation is total: "could not
/// place" is a normal return value.
#[derive(Debug, Clone)]
pub struct Bin {
    dimension: Aabb,
    placed: Vec<Piece>,
    free_rects: Vec<Aabb>,
    index: PieceIndex,

    dive_factor: u32,
    sweep_dx_factor: u32,
    sweep_dy_factor: u32,
    rotation_angles: Vec<f64>,
}

impl Bin {
    /// Creates an empty bin with default step factors and rotations.
    pub fn new(dimension: Aabb) -> Self {
        Self::from_config(dimension, &Config::default())
    }

    /// Creates an empty bin taking its knobs from a configuration.
    pub fn from_config(dimension: Aabb, config: &Config) -> Self {
        Self {
            dimension,
            placed: Vec::new(),
            free_rects: vec![dimension],
            index: PieceIndex::new(),
            dive_factor: config.dive_factor.max(1),
            sweep_dx_factor: config.sweep_dx_factor.max(1),
            sweep_dy_factor: config.sweep_dy_factor.max(1),
            rotation_angles: config.rotation_angles.clone(),
        }
    }

    /// The bin rectangle.
    pub fn dimension(&self) -> &Aabb {
        &self.dimension
    }

    /// The placed pieces, in placement order.
    pub fn placed(&self) -> &[Piece] {
        &self.placed
    }

    /// Number of placed pieces.
    pub fn n_placed(&self) -> usize {
        self.placed.len()
    }

    /// The current maximal free rectangles.
    pub fn free_rects(&self) -> &[Aabb] {
        &self.free_rects
    }

    /// Total area of the placed pieces.
    pub fn occupied_area(&self) -> f64 {
        self.placed.iter().map(Piece::area).sum()
    }

    /// Bin area not covered by placed pieces.
    pub fn empty_area(&self) -> f64 {
        self.dimension.area() - self.occupied_area()
    }

    /// Occupied fraction of the bin, in `[0, 1]`.
    pub fn utilization(&self) -> f64 {
        if self.dimension.area() <= 0.0 {
            return 0.0;
        }
        self.occupied_area() / self.dimension.area()
    }

    /// Two-phase collision query: R-tree broad phase on the piece's
    /// bounding box, then precise interior-intersection tests against the
    /// candidates, skipping `ignored`.
    pub fn collides(&self, piece: &Piece, ignored: Option<usize>) -> bool {
        if piece.is_empty() {
            return false;
        }
        self.index
            .query(&piece.bbox())
            .into_iter()
            .filter(|&slot| Some(slot) != ignored)
            .any(|slot| piece.intersects(&self.placed[slot]))
    }

    /// Finds the free rectangle and orientation with the smallest
    /// min-side wastage for the piece's bounding box.
    ///
    /// Iterates the free list in reverse so the latest-added rectangle
    /// wins ties; leaving tall or wide strips intact beats fragmenting
    /// them.
    pub fn find_placement(&self, piece: &Piece) -> Option<PlacementChoice> {
        let bb = piece.bbox();
        let mut best: Option<PlacementChoice> = None;

        for (rect_index, free) in self.free_rects.iter().enumerate().rev() {
            if bb.fits(free) {
                let wastage = (free.width() - bb.width()).min(free.height() - bb.height());
                if best.map_or(true, |b| wastage < b.wastage) {
                    best = Some(PlacementChoice {
                        rect_index,
                        rotated: false,
                        wastage,
                    });
                }
            }
            if bb.fits_rotated(free) {
                let wastage = (free.width() - bb.height()).min(free.height() - bb.width());
                if best.map_or(true, |b| wastage < b.wastage) {
                    best = Some(PlacementChoice {
                        rect_index,
                        rotated: true,
                        wastage,
                    });
                }
            }
        }
        best
    }

    /// Stage-1 bounding-box packing over a sequence of pieces, in the
    /// given order. Returns the residual that did not fit.
    pub fn pack_pieces(&mut self, pieces: Vec<Piece>) -> Vec<Piece> {
        let mut residual = Vec::new();
        for piece in pieces {
            if !self.try_place(&piece) {
                residual.push(piece);
            }
        }
        residual
    }

    /// Attempts to place one piece through the placement search.
    ///
    /// The bounding box fitting does not imply the shape fits: a concave
    /// neighbor can intrude into the free rectangle, so a precise
    /// collision check guards the commit.
    pub fn try_place(&mut self, piece: &Piece) -> bool {
        let Some(choice) = self.find_placement(piece) else {
            return false;
        };
        let target = self.free_rects[choice.rect_index];

        let mut placed = piece.clone();
        if choice.rotated {
            placed.rotate(90.0);
        }
        placed.place_at(target.min_x, target.min_y);

        if self.collides(&placed, None) {
            return false;
        }
        self.commit(placed);
        true
    }

    /// Checks whether the piece can go at a specific free rectangle's min
    /// corner without colliding.
    pub fn can_place_in(&self, piece: &Piece, rect_index: usize) -> bool {
        let Some(target) = self.free_rects.get(rect_index) else {
            return false;
        };
        if !piece.bbox().fits(target) {
            return false;
        }
        let mut candidate = piece.clone();
        candidate.place_at(target.min_x, target.min_y);
        !self.collides(&candidate, None)
    }

    /// Places the piece at a specific free rectangle's min corner.
    pub fn place_in(&mut self, piece: &Piece, rect_index: usize) -> bool {
        if !self.can_place_in(piece, rect_index) {
            return false;
        }
        let target = self.free_rects[rect_index];
        let mut placed = piece.clone();
        placed.place_at(target.min_x, target.min_y);
        self.commit(placed);
        true
    }

    fn commit(&mut self, piece: Piece) {
        let bbox = piece.bbox();
        self.split_free_rects(&bbox);
        self.prune_free_rects();
        let slot = self.placed.len();
        self.placed.push(piece);
        self.index.insert(slot, &bbox);
    }

    /// Replaces every free rectangle that overlaps `placed_bbox` with up
    /// to four slices around the overlap, keeping only slices of extent
    /// greater than the tolerance.
    fn split_free_rects(&mut self, placed_bbox: &Aabb) {
        let mut next = Vec::with_capacity(self.free_rects.len() + 3);
        for free in &self.free_rects {
            let Some(cut) = free.intersection(placed_bbox) else {
                next.push(*free);
                continue;
            };
            if free.max_y - cut.max_y > EPS {
                next.push(Aabb::new(free.min_x, cut.max_y, free.max_x, free.max_y));
            }
            if cut.min_y - free.min_y > EPS {
                next.push(Aabb::new(free.min_x, free.min_y, free.max_x, cut.min_y));
            }
            if cut.min_x - free.min_x > EPS {
                next.push(Aabb::new(free.min_x, free.min_y, cut.min_x, free.max_y));
            }
            if free.max_x - cut.max_x > EPS {
                next.push(Aabb::new(cut.max_x, free.min_y, free.max_x, free.max_y));
            }
        }
        self.free_rects = next;
    }

    /// Restores maximality: drops any free rectangle contained (within
    /// tolerance) in a larger one. Quadratic, but the list stays small.
    fn prune_free_rects(&mut self) {
        self.free_rects.sort_by(|a, b| {
            b.area()
                .partial_cmp(&a.area())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut kept: Vec<Aabb> = Vec::with_capacity(self.free_rects.len());
        for rect in self.free_rects.drain(..) {
            if !kept.iter().any(|k| k.contains(&rect, EPS)) {
                kept.push(rect);
            }
        }
        self.free_rects = kept;
    }

    /// Gravity compaction toward the bin's min corner: passes over all
    /// pieces until a full pass moves nothing.
    ///
    /// Each accepted step strictly decreases the sum of centroid
    /// coordinates along the compaction direction, which is bounded below,
    /// so the loop terminates.
    pub fn compress(&mut self) {
        self.compress_along(Vector::new(-1.0, -1.0));
    }

    /// Gravity compaction along an arbitrary direction.
    pub fn compress_along(&mut self, vector: Vector) {
        if self.placed.is_empty() {
            return;
        }
        let mut anything_moved = false;
        let mut moved = true;
        while moved {
            moved = false;
            for slot in 0..self.placed.len() {
                if self.compress_piece(slot, vector) {
                    moved = true;
                    anything_moved = true;
                }
            }
        }

        // Sliding pieces may have crossed into free rectangles; carve so
        // the free list stays disjoint from the placed boxes.
        if anything_moved {
            let bboxes: Vec<Aabb> = self.placed.iter().map(Piece::bbox).collect();
            for bb in &bboxes {
                self.split_free_rects(bb);
            }
            self.prune_free_rects();
        }
    }

    /// Repeatedly steps one piece along the vector's y then x component,
    /// keeping a step iff the piece stays inside the bin and
    /// collision-free. Returns whether the piece moved at all.
    pub fn compress_piece(&mut self, slot: usize, vector: Vector) -> bool {
        if vector.dx == 0.0 && vector.dy == 0.0 {
            return false;
        }

        // Take the piece out of the index so it cannot collide with
        // itself while it moves.
        let original_bbox = self.placed[slot].bbox();
        self.index.remove(slot, &original_bbox);

        let mut total_moves = 0usize;
        let mut moved = true;
        while moved {
            moved = false;

            if vector.dy != 0.0 {
                let step = vector.y_component();
                self.placed[slot].translate(step);
                if self.placed[slot].is_inside(&self.dimension)
                    && !self.collides(&self.placed[slot], Some(slot))
                {
                    moved = true;
                    total_moves += 1;
                } else {
                    self.placed[slot].translate(step.inverse());
                }
            }

            if vector.dx != 0.0 {
                let step = vector.x_component();
                self.placed[slot].translate(step);
                if self.placed[slot].is_inside(&self.dimension)
                    && !self.collides(&self.placed[slot], Some(slot))
                {
                    moved = true;
                    total_moves += 1;
                } else {
                    self.placed[slot].translate(step.inverse());
                }
            }
        }

        let new_bbox = self.placed[slot].bbox();
        self.index.insert(slot, &new_bbox);
        total_moves > 0
    }

    /// Drop placement for pieces that fit in no free rectangle: start at
    /// the top edge, sweep x, and let gravity pull the piece down from
    /// the first collision-free start. Returns the residual.
    pub fn drop_pieces(&mut self, pieces: Vec<Piece>) -> Vec<Piece> {
        let angles = self.rotation_angles.clone();
        let mut unplaced = Vec::new();

        for piece in pieces {
            let mut was_placed = false;
            for &angle in &angles {
                let mut candidate = piece.clone();
                if angle.abs() > EPS {
                    candidate.rotate(angle);
                }
                if self.dive(candidate) {
                    was_placed = true;
                    break;
                }
            }
            if !was_placed {
                unplaced.push(piece);
            }
        }
        unplaced
    }

    fn dive(&mut self, piece: Piece) -> bool {
        let bb = piece.bbox();
        let (piece_w, piece_h) = (bb.width(), bb.height());
        let (bin_w, bin_h) = (self.dimension.width(), self.dimension.height());

        if piece_w > bin_w || piece_h > bin_h {
            return false;
        }

        let mut dx = piece_w / self.dive_factor as f64;
        if dx < EPS {
            dx = 1.0;
        }

        let top_y = self.dimension.min_y + bin_h - piece_h;
        let mut x = 0.0;
        while x + piece_w <= bin_w + EPS {
            if self.try_dive_at(&piece, self.dimension.min_x + x, top_y) {
                return true;
            }
            x += dx;
        }
        // Last resort: flush against the right edge.
        self.try_dive_at(&piece, self.dimension.min_x + bin_w - piece_w, top_y)
    }

    fn try_dive_at(&mut self, piece: &Piece, x: f64, y: f64) -> bool {
        let mut candidate = piece.clone();
        candidate.place_at(x, y);
        if self.collides(&candidate, None) {
            return false;
        }

        // Commit at the top, then let gravity pull it down.
        let bbox = candidate.bbox();
        let slot = self.placed.len();
        self.placed.push(candidate);
        self.index.insert(slot, &bbox);
        self.compress_piece(slot, Vector::new(0.0, -1.0));

        let final_bbox = self.placed[slot].bbox();
        self.split_free_rects(&final_bbox);
        self.prune_free_rects();
        true
    }

    /// Sweep-replace: walks the placed list from the end down to
    /// `index_limit` and tries to relocate each piece into the bounding
    /// box of an earlier piece whose concavity budget can hold it.
    /// Returns whether anything moved.
    pub fn move_and_replace(&mut self, index_limit: usize) -> bool {
        let mut movement = false;

        let mut i = self.placed.len();
        while i > index_limit {
            i -= 1;

            'containers: for j in 0..i {
                if self.placed[j].free_area() <= self.placed[i].area() {
                    continue;
                }
                let container_bbox = self.placed[j].bbox();

                for rotated in [false, true] {
                    let mut candidate = self.placed[i].clone();
                    if rotated {
                        candidate.rotate(90.0);
                    }
                    candidate.place_at(container_bbox.min_x, container_bbox.min_y);

                    if let Some(swept) = self.sweep(j, candidate, i) {
                        let old_bbox = self.placed[i].bbox();
                        self.index.remove(i, &old_bbox);
                        self.placed[i] = swept;
                        self.index.insert(i, &self.placed[i].bbox());
                        self.compress_piece(i, Vector::new(-1.0, -1.0));

                        // Reclaim the vacated region, carving it against
                        // any bounding boxes that still reach into it.
                        self.free_rects.push(old_bbox);
                        let new_bbox = self.placed[i].bbox();
                        self.split_free_rects(&new_bbox);
                        for slot in self.index.query(&old_bbox) {
                            let bb = self.placed[slot].bbox();
                            self.split_free_rects(&bb);
                        }
                        self.prune_free_rects();

                        movement = true;
                        break 'containers;
                    }
                }
            }
        }
        movement
    }

    /// Grid-scans `inside` over the container's bounding box, looking for
    /// a position where it avoids the container's actual geometry (its
    /// concavities and holes are fair game), collides with nothing else,
    /// and stays inside the bin.
    fn sweep(&self, container_slot: usize, mut inside: Piece, ignored: usize) -> Option<Piece> {
        let container = &self.placed[container_slot];

        if inside.is_inside(&self.dimension)
            && !inside.intersects(container)
            && !self.collides(&inside, Some(ignored))
        {
            return Some(inside);
        }

        let container_bbox = container.bbox();
        let inside_bbox = inside.bbox();

        let (mut dx_factor, mut dy_factor) =
            (self.sweep_dx_factor as f64, self.sweep_dy_factor as f64);
        if inside.vertex_count() > 100 {
            // Heavy polygons get a coarser grid.
            dx_factor = 2.0;
            dy_factor = 1.0;
        }

        let mut dx = inside_bbox.width() / dx_factor;
        let mut dy = inside_bbox.height() / dy_factor;
        if dx < EPS {
            dx = 1.0;
        }
        if dy < EPS {
            dy = 1.0;
        }

        let mut y = container_bbox.min_y;
        while y + inside_bbox.height() <= container_bbox.max_y + EPS {
            let mut x = container_bbox.min_x;
            while x + inside_bbox.width() <= container_bbox.max_x + EPS {
                inside.place_at(x, y);
                if inside.is_inside(&self.dimension)
                    && !inside.intersects(container)
                    && !self.collides(&inside, Some(ignored))
                {
                    return Some(inside);
                }
                x += dx;
            }
            y += dy;
        }
        None
    }

    /// Checks the bin's structural invariants. Used by `debug_assert!`
    /// at strategy boundaries and by the integration tests.
    pub fn invariants_hold(&self) -> bool {
        // Every piece inside the bin.
        if !self.placed.iter().all(|p| p.is_inside(&self.dimension)) {
            return false;
        }
        // Pairwise interior-disjoint.
        for i in 0..self.placed.len() {
            for j in (i + 1)..self.placed.len() {
                if self.placed[i].intersects(&self.placed[j]) {
                    return false;
                }
            }
        }
        // Free rectangles inside the bin and clear of placed boxes.
        for free in &self.free_rects {
            if !self.dimension.contains(free, EPS) {
                return false;
            }
            for piece in &self.placed {
                if let Some(cut) = free.intersection(&piece.bbox()) {
                    if cut.width() > EPS && cut.height() > EPS {
                        return false;
                    }
                }
            }
        }
        // Maximality: no strict containment among free rectangles.
        for (i, a) in self.free_rects.iter().enumerate() {
            for (j, b) in self.free_rects.iter().enumerate() {
                if i != j && b.contains(a, EPS) && a.area() < b.area() - EPS {
                    return false;
                }
            }
        }
        // Index entries correspond one-to-one with the placed list.
        if self.index.len() != self.placed.len() {
            return false;
        }
        let mut slots: Vec<usize> = self.index.iter().map(|e| e.slot).collect();
        slots.sort_unstable();
        slots == (0..self.placed.len()).collect::<Vec<_>>()
    }
}
