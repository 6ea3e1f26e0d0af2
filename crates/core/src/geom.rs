//! Axis-aligned rectangle and displacement primitives.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A displacement in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vector {
    /// Displacement along x.
    pub dx: f64,
    /// Displacement along y.
    pub dy: f64,
}

impl Vector {
    /// Creates a new displacement vector.
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Returns the opposite displacement.
    pub fn inverse(&self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
        }
    }

    /// Returns the component along x as a vector.
    pub fn x_component(&self) -> Self {
        Self {
            dx: self.dx,
            dy: 0.0,
        }
    }

    /// Returns the component along y as a vector.
    pub fn y_component(&self) -> Self {
        Self {
            dx: 0.0,
            dy: self.dy,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum x coordinate.
    pub min_x: f64,
    /// Minimum y coordinate.
    pub min_y: f64,
    /// Maximum x coordinate.
    pub max_x: f64,
    /// Maximum y coordinate.
    pub max_y: f64,
}

impl Aabb {
    /// Creates a new box from min/max coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Creates a box with its min corner at the origin.
    pub fn with_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Tight box around a set of points. `None` when the set is empty.
    pub fn from_points(points: &[(f64, f64)]) -> Option<Self> {
        let (&(x0, y0), rest) = points.split_first()?;
        let mut bb = Self::new(x0, y0, x0, y0);
        for &(x, y) in rest {
            bb.min_x = bb.min_x.min(x);
            bb.min_y = bb.min_y.min(y);
            bb.max_x = bb.max_x.max(x);
            bb.max_y = bb.max_y.max(y);
        }
        Some(bb)
    }

    /// Returns the width of the box.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Returns the height of the box.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Returns the area of the box.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Returns the center point of the box.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Checks whether a point lies in the closed box.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Checks whether `other` lies entirely inside this box, with tolerance.
    pub fn contains(&self, other: &Self, eps: f64) -> bool {
        other.min_x >= self.min_x - eps
            && other.min_y >= self.min_y - eps
            && other.max_x <= self.max_x + eps
            && other.max_y <= self.max_y + eps
    }

    /// Checks whether the closed boxes overlap.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Returns the overlap of two boxes, if any.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }
        Some(Self {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Returns the smallest box covering both boxes.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grows the box by a margin on all sides.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    /// Checks whether this box fits inside `outer` as-is.
    pub fn fits(&self, outer: &Self) -> bool {
        self.width() <= outer.width() && self.height() <= outer.height()
    }

    /// Checks whether this box fits inside `outer` after a 90-degree turn.
    pub fn fits_rotated(&self, outer: &Self) -> bool {
        self.height() <= outer.width() && self.width() <= outer.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn vector_inverse_roundtrip() {
        let v = Vector::new(3.0, -2.0);
        let back = v.inverse().inverse();
        assert_relative_eq!(back.dx, v.dx);
        assert_relative_eq!(back.dy, v.dy);
    }

    #[test]
    fn aabb_from_points() {
        let bb = Aabb::from_points(&[(1.0, 5.0), (4.0, 2.0), (3.0, 3.0)]).unwrap();
        assert_relative_eq!(bb.min_x, 1.0);
        assert_relative_eq!(bb.min_y, 2.0);
        assert_relative_eq!(bb.max_x, 4.0);
        assert_relative_eq!(bb.max_y, 5.0);
        assert!(Aabb::from_points(&[]).is_none());
    }

    #[test]
    fn aabb_intersection() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        let b = Aabb::new(5.0, 5.0, 15.0, 15.0);
        let i = a.intersection(&b).unwrap();
        assert_relative_eq!(i.min_x, 5.0);
        assert_relative_eq!(i.max_x, 10.0);

        let c = Aabb::new(20.0, 20.0, 30.0, 30.0);
        assert!(a.intersection(&c).is_none());
    }

    #[test]
    fn aabb_contains_with_tolerance() {
        let outer = Aabb::new(0.0, 0.0, 10.0, 10.0);
        let inner = Aabb::new(-1e-12, 0.0, 10.0, 10.0);
        assert!(outer.contains(&inner, 1e-9));
        assert!(!outer.contains(&inner.expand(1.0), 1e-9));
    }

    #[test]
    fn aabb_union_and_center() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        let b = Aabb::new(20.0, 5.0, 30.0, 25.0);
        let u = a.union(&b);
        assert_relative_eq!(u.min_x, 0.0);
        assert_relative_eq!(u.max_x, 30.0);
        assert_relative_eq!(u.max_y, 25.0);

        let (cx, cy) = a.center();
        assert_relative_eq!(cx, 5.0);
        assert_relative_eq!(cy, 5.0);
        assert!(a.contains_point(10.0, 10.0));
        assert!(!a.contains_point(10.1, 10.0));
    }

    #[test]
    fn fit_probes() {
        let tall = Aabb::with_size(10.0, 30.0);
        let wide = Aabb::with_size(30.0, 12.0);
        assert!(!tall.fits(&wide));
        assert!(tall.fits_rotated(&wide));
        assert!(Aabb::with_size(30.0, 12.0).fits(&wide));
    }
}
