//! Piece geometry.
//!
//! A [`Piece`] wraps a `geo::MultiPolygon` with the identifier and the
//! accumulated rotation that the packing engine carries through every
//! transform. Exterior rings are counter-clockwise, interior rings
//! clockwise; winding is corrected at construction.

use geo::coordinate_position::CoordPos;
use geo::dimensions::Dimensions;
use geo::orient::{Direction, Orient};
use geo::{
    Area, BooleanOps, BoundingRect, Coord, Euclidean, Length, LineString, MultiPolygon, Point,
    Polygon, Relate, Rotate, Translate,
};
use polybin_core::{Aabb, PieceId, ShapeCache, ShapeKey, Vector};

use crate::EPS;

/// A polygonal piece, possibly concave, possibly with holes.
#[derive(Debug, Clone)]
pub struct Piece {
    /// Identifier carried through all transforms.
    id: PieceId,

    /// The shape; may consist of several polygons after boolean ops.
    shape: MultiPolygon<f64>,

    /// Accumulated rotation in degrees, normalized to `[0, 360)`.
    rotation: f64,
}

impl Piece {
    /// Builds a piece from a vertex list. Winding is corrected to the
    /// canonical orientation; an empty list yields an empty piece.
    pub fn from_points(points: &[(f64, f64)], id: PieceId) -> Self {
        if points.len() < 3 {
            return Self {
                id,
                shape: MultiPolygon(vec![]),
                rotation: 0.0,
            };
        }
        let ring: LineString<f64> = points
            .iter()
            .map(|&(x, y)| Coord { x, y })
            .collect::<Vec<_>>()
            .into();
        let polygon = Polygon::new(ring, vec![]).orient(Direction::Default);
        Self {
            id,
            shape: MultiPolygon(vec![polygon]),
            rotation: 0.0,
        }
    }

    /// Builds a piece from an outer ring with a hole punched out.
    pub fn with_hole(outer: &[(f64, f64)], hole: &[(f64, f64)], id: PieceId) -> Self {
        let outer_piece = Self::from_points(outer, id);
        let hole_piece = Self::from_points(hole, id);
        outer_piece.difference(&hole_piece)
    }

    /// Axis-aligned rectangle piece with its min corner at the origin.
    pub fn rectangle(width: f64, height: f64, id: PieceId) -> Self {
        Self::from_points(
            &[
                (0.0, 0.0),
                (width, 0.0),
                (width, height),
                (0.0, height),
            ],
            id,
        )
    }

    /// L-shaped piece: a `width` x `height` rectangle with the top-right
    /// corner cut away, leaving arms `arm_x` wide and `arm_y` tall.
    pub fn l_shape(width: f64, height: f64, arm_x: f64, arm_y: f64, id: PieceId) -> Self {
        Self::from_points(
            &[
                (0.0, 0.0),
                (width, 0.0),
                (width, arm_y),
                (arm_x, arm_y),
                (arm_x, height),
                (0.0, height),
            ],
            id,
        )
    }

    /// Wraps an existing multi-polygon.
    pub(crate) fn from_shape(shape: MultiPolygon<f64>, id: PieceId, rotation: f64) -> Self {
        Self {
            id,
            shape,
            rotation,
        }
    }

    /// Returns the piece identifier.
    pub fn id(&self) -> PieceId {
        self.id
    }

    /// Returns the accumulated rotation in degrees.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Returns the underlying shape.
    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    /// Returns whether the piece has no geometry.
    pub fn is_empty(&self) -> bool {
        self.shape.0.iter().all(|p| p.exterior().0.len() < 4)
    }

    /// Non-negative shape area: exterior rings minus holes.
    pub fn area(&self) -> f64 {
        self.shape.unsigned_area()
    }

    /// Total boundary length over all rings.
    pub fn perimeter(&self) -> f64 {
        self.shape
            .0
            .iter()
            .map(|polygon| {
                let mut length = polygon.exterior().length::<Euclidean>();
                for hole in polygon.interiors() {
                    length += hole.length::<Euclidean>();
                }
                length
            })
            .sum()
    }

    /// Bounding box; degenerate at the origin for an empty piece.
    pub fn bbox(&self) -> Aabb {
        match self.shape.bounding_rect() {
            Some(rect) => Aabb::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y),
            None => Aabb::new(0.0, 0.0, 0.0, 0.0),
        }
    }

    /// Bounding-box area minus shape area: the concavity budget that
    /// sweep-replace exploits.
    pub fn free_area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.bbox().area() - self.area()
    }

    /// Vertices of the first polygon's exterior ring, without the closing
    /// duplicate.
    pub fn outer_vertices(&self) -> Vec<(f64, f64)> {
        let Some(polygon) = self.shape.0.first() else {
            return Vec::new();
        };
        let coords = &polygon.exterior().0;
        let mut vertices: Vec<(f64, f64)> = coords.iter().map(|c| (c.x, c.y)).collect();
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        vertices
    }

    /// Total vertex count over all rings (closing duplicates included).
    pub fn vertex_count(&self) -> usize {
        self.shape
            .0
            .iter()
            .map(|polygon| {
                polygon.exterior().0.len()
                    + polygon
                        .interiors()
                        .iter()
                        .map(|ring| ring.0.len())
                        .sum::<usize>()
            })
            .sum()
    }

    /// All ring coordinates flattened, used for content-addressed cache
    /// keys.
    pub(crate) fn all_vertices(&self) -> Vec<(f64, f64)> {
        let mut vertices = Vec::new();
        for polygon in &self.shape.0 {
            vertices.extend(polygon.exterior().0.iter().map(|c| (c.x, c.y)));
            for ring in polygon.interiors() {
                vertices.extend(ring.0.iter().map(|c| (c.x, c.y)));
            }
        }
        vertices
    }

    /// Translates the piece by a displacement.
    pub fn translate(&mut self, v: Vector) {
        if self.is_empty() {
            return;
        }
        self.shape = self.shape.translate(v.dx, v.dy);
    }

    /// Rotates the piece about its bounding-box center, composing with the
    /// stored rotation.
    pub fn rotate(&mut self, degrees: f64) {
        if self.is_empty() {
            return;
        }
        self.rotation = (self.rotation + degrees).rem_euclid(360.0);
        let (cx, cy) = self.bbox().center();
        self.shape = self.shape.rotate_around_point(degrees, Point::new(cx, cy));
    }

    /// Returns a rotated copy, memoizing the rotated shape.
    ///
    /// The cache key is the canonicalized vertex list plus the angle, so
    /// repeated instances of a shape rotate once. A miss computes fresh,
    /// which is always correct.
    pub fn rotated_cached(&self, degrees: f64, cache: &ShapeCache<MultiPolygon<f64>>) -> Self {
        if self.is_empty() || degrees.abs() < EPS {
            return self.clone();
        }
        let key = ShapeKey::from_points(&self.all_vertices(), degrees, EPS);
        let shape = cache.get_or_compute(key, || {
            let mut rotated = self.clone();
            rotated.rotate(degrees);
            rotated.place_at(0.0, 0.0);
            rotated.shape
        });
        Self {
            id: self.id,
            shape: (*shape).clone(),
            rotation: (self.rotation + degrees).rem_euclid(360.0),
        }
    }

    /// Translates the piece so its bounding-box min corner lands at
    /// `(x, y)`.
    pub fn place_at(&mut self, x: f64, y: f64) {
        if self.is_empty() {
            return;
        }
        let bb = self.bbox();
        self.translate(Vector::new(x - bb.min_x, y - bb.min_y));
    }

    /// Boolean union; keeps this piece's id and rotation.
    pub fn union(&self, other: &Piece) -> Piece {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return Piece::from_shape(other.shape.clone(), self.id, self.rotation);
        }
        Piece::from_shape(self.shape.union(&other.shape), self.id, self.rotation)
    }

    /// Boolean difference; keeps this piece's id and rotation.
    pub fn difference(&self, other: &Piece) -> Piece {
        if self.is_empty() || other.is_empty() {
            return self.clone();
        }
        Piece::from_shape(self.shape.difference(&other.shape), self.id, self.rotation)
    }

    /// Boolean intersection; keeps this piece's id and rotation.
    pub fn intersection(&self, other: &Piece) -> Piece {
        if self.is_empty() || other.is_empty() {
            return Piece::from_shape(MultiPolygon(vec![]), self.id, self.rotation);
        }
        Piece::from_shape(self.shape.intersection(&other.shape), self.id, self.rotation)
    }

    /// Returns whether the interiors of the two pieces overlap.
    ///
    /// Touching along a shared edge or corner with disjoint interiors is
    /// not an intersection.
    pub fn intersects(&self, other: &Piece) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if !self.bbox().intersects(&other.bbox()) {
            return false;
        }
        let matrix = self.shape.relate(&other.shape);
        matrix.get(CoordPos::Inside, CoordPos::Inside) != Dimensions::Empty
    }

    /// Returns whether the piece lies entirely inside the rectangle,
    /// within tolerance. Empty pieces are vacuously inside.
    pub fn is_inside(&self, rect: &Aabb) -> bool {
        if self.is_empty() {
            return true;
        }
        rect.contains(&self.bbox(), EPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rectangle_area_and_bbox() {
        let piece = Piece::rectangle(10.0, 5.0, 1);
        assert_relative_eq!(piece.area(), 50.0, epsilon = 1e-9);
        let bb = piece.bbox();
        assert_relative_eq!(bb.width(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(bb.height(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn winding_is_corrected() {
        // Clockwise input still yields a positive area.
        let piece = Piece::from_points(&[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)], 1);
        assert_relative_eq!(piece.area(), 16.0, epsilon = 1e-9);
    }

    #[test]
    fn hole_subtracts_area() {
        let piece = Piece::with_hole(
            &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            &[(2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0)],
            3,
        );
        assert_relative_eq!(piece.area(), 100.0 - 36.0, epsilon = 1e-6);
        assert_relative_eq!(piece.free_area(), 36.0, epsilon = 1e-6);
    }

    #[test]
    fn l_shape_free_area() {
        let piece = Piece::l_shape(20.0, 20.0, 10.0, 10.0, 1);
        assert_relative_eq!(piece.area(), 300.0, epsilon = 1e-9);
        assert_relative_eq!(piece.free_area(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn rotation_accumulates_mod_360() {
        let mut piece = Piece::rectangle(10.0, 4.0, 1);
        piece.rotate(90.0);
        assert_relative_eq!(piece.rotation(), 90.0);
        piece.rotate(300.0);
        assert_relative_eq!(piece.rotation(), 30.0, epsilon = 1e-9);
    }

    #[test]
    fn rotate_90_swaps_bbox_extents() {
        let mut piece = Piece::rectangle(10.0, 4.0, 1);
        piece.rotate(90.0);
        let bb = piece.bbox();
        assert_relative_eq!(bb.width(), 4.0, epsilon = 1e-9);
        assert_relative_eq!(bb.height(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(piece.area(), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn full_turn_is_identity() {
        let mut piece = Piece::l_shape(20.0, 20.0, 10.0, 10.0, 1);
        piece.place_at(5.0, 5.0);
        let before = piece.bbox();
        piece.rotate(360.0);
        let after = piece.bbox();
        assert_relative_eq!(piece.rotation(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(before.min_x, after.min_x, epsilon = 1e-9);
        assert_relative_eq!(before.min_y, after.min_y, epsilon = 1e-9);
        assert_relative_eq!(piece.area(), 300.0, epsilon = 1e-9);
    }

    #[test]
    fn place_at_roundtrip() {
        let mut piece = Piece::rectangle(7.0, 3.0, 1);
        piece.place_at(12.5, -4.25);
        let bb = piece.bbox();
        assert_relative_eq!(bb.min_x, 12.5, epsilon = 1e-9);
        assert_relative_eq!(bb.min_y, -4.25, epsilon = 1e-9);
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Piece::rectangle(10.0, 10.0, 1);
        let mut b = Piece::rectangle(10.0, 10.0, 2);
        b.place_at(10.0, 0.0);
        assert!(!a.intersects(&b));

        // Corner touch only.
        let mut c = Piece::rectangle(10.0, 10.0, 3);
        c.place_at(10.0, 10.0);
        assert!(!a.intersects(&c));
    }

    #[test]
    fn overlapping_interiors_intersect() {
        let a = Piece::rectangle(10.0, 10.0, 1);
        let mut b = Piece::rectangle(10.0, 10.0, 2);
        b.place_at(5.0, 5.0);
        assert!(a.intersects(&b));
    }

    #[test]
    fn square_in_concavity_does_not_intersect() {
        let l = Piece::l_shape(20.0, 20.0, 10.0, 10.0, 1);
        let mut square = Piece::rectangle(4.0, 4.0, 2);
        square.place_at(14.0, 14.0);
        assert!(!l.intersects(&square));
        // But placed onto an arm it does.
        square.place_at(2.0, 2.0);
        assert!(l.intersects(&square));
    }

    #[test]
    fn boolean_ops_preserve_area() {
        let a = Piece::rectangle(10.0, 10.0, 1);
        let mut b = Piece::rectangle(10.0, 10.0, 2);
        b.place_at(5.0, 0.0);

        assert_relative_eq!(a.union(&b).area(), 150.0, epsilon = 1e-6);
        assert_relative_eq!(a.intersection(&b).area(), 50.0, epsilon = 1e-6);
        assert_relative_eq!(a.difference(&b).area(), 50.0, epsilon = 1e-6);
    }

    #[test]
    fn empty_inputs_yield_empty_outputs() {
        let empty = Piece::from_points(&[], 0);
        let square = Piece::rectangle(5.0, 5.0, 1);
        assert!(empty.is_empty());
        assert_relative_eq!(empty.area(), 0.0);
        assert!(!empty.intersects(&square));
        assert!(!square.intersects(&empty));
        assert!(empty.intersection(&square).is_empty());
        assert!(empty.is_inside(&Aabb::with_size(1.0, 1.0)));
        assert_relative_eq!(square.union(&empty).area(), 25.0, epsilon = 1e-9);
    }

    #[test]
    fn rotated_cached_matches_direct_rotation() {
        let cache = ShapeCache::new();
        let piece = Piece::l_shape(12.0, 9.0, 4.0, 3.0, 7);

        let cached = piece.rotated_cached(90.0, &cache);
        let mut direct = piece.clone();
        direct.rotate(90.0);
        direct.place_at(0.0, 0.0);

        assert_relative_eq!(cached.area(), direct.area(), epsilon = 1e-9);
        assert_relative_eq!(cached.bbox().width(), direct.bbox().width(), epsilon = 1e-9);
        assert_relative_eq!(cached.rotation(), 90.0);

        // Second lookup with a congruent piece hits the cache.
        let mut moved = piece.clone();
        moved.place_at(40.0, 40.0);
        let _ = moved.rotated_cached(90.0, &cache);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn perimeter_of_rectangle() {
        let piece = Piece::rectangle(10.0, 5.0, 1);
        assert_relative_eq!(piece.perimeter(), 30.0, epsilon = 1e-9);
    }

    #[test]
    fn outer_vertices_drop_the_closing_duplicate() {
        let piece = Piece::rectangle(10.0, 5.0, 1);
        let vertices = piece.outer_vertices();
        assert_eq!(vertices.len(), 4);
        assert!(vertices.contains(&(0.0, 0.0)));
        assert!(vertices.contains(&(10.0, 5.0)));
        assert!(Piece::from_points(&[], 0).outer_vertices().is_empty());
    }
}
