//! Points, tolerances, and numeric predicates.
//!
//! All algorithms in this crate work on `nalgebra` points with `f64`
//! coordinates. Equality is tolerance based: two points are the same point when
//! they are closer than [`EPSILON`]. [`PointIndex`] is the matching hash-side
//! structure, so deduplication and equality can never disagree.
//!
//! [`EPSILON`] is an absolute tolerance tuned for coordinates in `[0, 1]`.
//! Run inputs through a [`Normalizer2`]/[`Normalizer3`] first.

mod normalize;
mod point_index;
pub mod predicates;

pub use nalgebra::{Point2, Point3, Vector2, Vector3};
pub use normalize::{NormalizedPoints, Normalizer2, Normalizer3};
pub use point_index::{dedup_points2, dedup_points3, PointIndex};

/// Absolute tolerance shared by every predicate and equality test.
pub const EPSILON: f64 = 1e-5;

/// Tolerance-aware equality of 2D points.
#[inline]
pub fn approx_eq2(a: &Point2<f64>, b: &Point2<f64>) -> bool {
    (a - b).norm() < EPSILON
}

/// Tolerance-aware equality of 3D points.
#[inline]
pub fn approx_eq3(a: &Point3<f64>, b: &Point3<f64>) -> bool {
    (a - b).norm() < EPSILON
}

/// Lift a 2D point into the `z = 0` plane.
#[inline]
pub fn lift(p: &Point2<f64>) -> Point3<f64> {
    Point3::new(p.x, p.y, 0.0)
}

/// Drop the z coordinate of a 3D point.
#[inline]
pub fn flatten(p: &Point3<f64>) -> Point2<f64> {
    Point2::new(p.x, p.y)
}

/// A segment between two 2D points.
///
/// Used both as an unordered pair (hull edges, forced edges) and as a directed
/// segment from `a` to `b`, depending on context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge2 {
    /// Start point.
    pub a: Point2<f64>,
    /// End point.
    pub b: Point2<f64>,
}

impl Edge2 {
    /// Create a new edge.
    pub fn new(a: Point2<f64>, b: Point2<f64>) -> Self {
        Self { a, b }
    }

    /// The same edge with its direction reversed.
    pub fn reversed(&self) -> Self {
        Self { a: self.b, b: self.a }
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }

    /// Midpoint of the segment.
    pub fn midpoint(&self) -> Point2<f64> {
        nalgebra::center(&self.a, &self.b)
    }

    /// Whether both edges join the same two points, in either direction.
    pub fn same_undirected(&self, other: &Edge2) -> bool {
        (approx_eq2(&self.a, &other.a) && approx_eq2(&self.b, &other.b))
            || (approx_eq2(&self.a, &other.b) && approx_eq2(&self.b, &other.a))
    }

    /// Whether the two endpoints coincide.
    pub fn is_degenerate(&self) -> bool {
        approx_eq2(&self.a, &self.b)
    }
}

/// A segment between two 3D points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge3 {
    /// Start point.
    pub a: Point3<f64>,
    /// End point.
    pub b: Point3<f64>,
}

impl Edge3 {
    /// Create a new edge.
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self { a, b }
    }

    /// Squared length, the quantity compared by the farthest-pair search.
    pub fn length_squared(&self) -> f64 {
        (self.b - self.a).norm_squared()
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }
}

/// Axis-aligned bounds of a 2D point set, or `None` when it is empty.
pub fn bounds2(points: &[Point2<f64>]) -> Option<(Point2<f64>, Point2<f64>)> {
    let first = points.first()?;
    let mut min = *first;
    let mut max = *first;
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Some((min, max))
}

/// Axis-aligned bounds of a 3D point set, or `None` when it is empty.
pub fn bounds3(points: &[Point3<f64>]) -> Option<(Point3<f64>, Point3<f64>)> {
    let first = points.first()?;
    let mut min = *first;
    let mut max = *first;
    for p in points {
        for i in 0..3 {
            min[i] = min[i].min(p[i]);
            max[i] = max[i].max(p[i]);
        }
    }
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_eq() {
        let a = Point2::new(0.5, 0.5);
        assert!(approx_eq2(&a, &Point2::new(0.5 + 1e-7, 0.5)));
        assert!(!approx_eq2(&a, &Point2::new(0.5 + 1e-3, 0.5)));
    }

    #[test]
    fn test_edge_same_undirected() {
        let e = Edge2::new(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
        assert!(e.same_undirected(&e.reversed()));
        assert!((e.length() - 1.0).abs() < 1e-12);
        assert!(!e.is_degenerate());
    }

    #[test]
    fn test_bounds() {
        let points = [
            Point2::new(1.0, -2.0),
            Point2::new(-1.0, 3.0),
            Point2::new(0.0, 0.0),
        ];
        let (min, max) = bounds2(&points).unwrap();
        assert_eq!(min, Point2::new(-1.0, -2.0));
        assert_eq!(max, Point2::new(1.0, 3.0));
        assert!(bounds2(&[]).is_none());
    }
}
