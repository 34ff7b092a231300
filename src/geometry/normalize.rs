//! Coordinate normalization.
//!
//! The predicates in this crate use an absolute tolerance, and the in-circle
//! determinant grows with the fourth power of coordinate magnitude. Mapping
//! inputs into `[0, 1]` before triangulating keeps both well conditioned.
//!
//! The map is uniform: the bounding-box minimum moves to the origin and every
//! axis is divided by the largest extent, so shapes (and therefore Delaunay
//! and hull results) are preserved.
//!
//! Nothing in the crate denormalizes on its own; callers map results back with
//! the same [`Normalizer2`]/[`Normalizer3`] they normalized with.

use std::ops::Deref;

use nalgebra::{Point2, Point3};

use super::{bounds2, bounds3, EPSILON};
use crate::algo::voronoi::VoronoiCell;
use crate::error::{GeometryError, Result};
use crate::mesh::HalfEdgeMesh;

/// A point set known to be in normalized coordinates.
///
/// Triangulation entry points accept only this type, which makes the
/// normalization step impossible to skip by accident.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPoints(Vec<Point2<f64>>);

impl NormalizedPoints {
    /// Wrap points that the caller has already normalized by other means.
    pub fn assume_normalized(points: Vec<Point2<f64>>) -> Self {
        Self(points)
    }

    /// The points as a slice.
    pub fn as_slice(&self) -> &[Point2<f64>] {
        &self.0
    }

    /// Unwrap into the underlying vector.
    pub fn into_inner(self) -> Vec<Point2<f64>> {
        self.0
    }
}

impl Deref for NormalizedPoints {
    type Target = [Point2<f64>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Maps 2D points into the unit square and back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer2 {
    min: Point2<f64>,
    scale: f64,
}

impl Normalizer2 {
    /// Build a normalizer from the bounding box of `points`.
    ///
    /// Fails with [`GeometryError::DegenerateInput`] for an empty set or a
    /// set whose points all coincide.
    pub fn from_points(points: &[Point2<f64>]) -> Result<Self> {
        let (min, max) = bounds2(points)
            .ok_or_else(|| GeometryError::degenerate("cannot normalize an empty point set"))?;
        Self::from_bounds(min, max)
    }

    /// Build a normalizer from explicit bounds.
    pub fn from_bounds(min: Point2<f64>, max: Point2<f64>) -> Result<Self> {
        let scale = (max.x - min.x).max(max.y - min.y);
        if !scale.is_finite() || scale < f64::EPSILON {
            return Err(GeometryError::degenerate("bounding box has zero extent"));
        }
        Ok(Self { min, scale })
    }

    /// Minimum corner of the source bounding box.
    pub fn min(&self) -> Point2<f64> {
        self.min
    }

    /// Largest extent of the source bounding box.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Map a point into normalized coordinates.
    #[inline]
    pub fn normalize(&self, p: &Point2<f64>) -> Point2<f64> {
        Point2::from((p - self.min) / self.scale)
    }

    /// Map a normalized point back into source coordinates.
    #[inline]
    pub fn unnormalize(&self, p: &Point2<f64>) -> Point2<f64> {
        self.min + p.coords * self.scale
    }

    /// Normalize a whole point set.
    pub fn normalize_points(&self, points: &[Point2<f64>]) -> NormalizedPoints {
        NormalizedPoints(points.iter().map(|p| self.normalize(p)).collect())
    }

    /// Normalize a polygon (an obstacle or boundary outline).
    pub fn normalize_polygon(&self, polygon: &[Point2<f64>]) -> Vec<Point2<f64>> {
        polygon.iter().map(|p| self.normalize(p)).collect()
    }

    /// Map normalized points back into source coordinates.
    pub fn unnormalize_points(&self, points: &[Point2<f64>]) -> Vec<Point2<f64>> {
        points.iter().map(|p| self.unnormalize(p)).collect()
    }

    /// Map every vertex of a planar mesh back into source coordinates.
    ///
    /// Only x and y are transformed; z is left untouched.
    pub fn unnormalize_mesh(&self, mesh: &mut HalfEdgeMesh) {
        mesh.transform_positions(|p| {
            let q = self.unnormalize(&Point2::new(p.x, p.y));
            Point3::new(q.x, q.y, p.z)
        });
    }

    /// Map Voronoi cells back into source coordinates.
    pub fn unnormalize_cells(&self, cells: &mut [VoronoiCell]) {
        for cell in cells {
            cell.site = self.unnormalize(&cell.site);
            for edge in &mut cell.edges {
                edge.start = self.unnormalize(&edge.start);
                edge.end = self.unnormalize(&edge.end);
                edge.site = self.unnormalize(&edge.site);
            }
        }
    }

    /// Whether `points` already fit the unit square (with tolerance).
    pub fn is_normalized(points: &[Point2<f64>]) -> bool {
        let unit = -EPSILON..=1.0 + EPSILON;
        points
            .iter()
            .all(|p| unit.contains(&p.x) && unit.contains(&p.y))
    }
}

/// Maps 3D points into the unit cube and back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer3 {
    min: Point3<f64>,
    scale: f64,
}

impl Normalizer3 {
    /// Build a normalizer from the bounding box of `points`.
    pub fn from_points(points: &[Point3<f64>]) -> Result<Self> {
        let (min, max) = bounds3(points)
            .ok_or_else(|| GeometryError::degenerate("cannot normalize an empty point set"))?;
        let extent = max - min;
        let scale = extent.x.max(extent.y).max(extent.z);
        if !scale.is_finite() || scale < f64::EPSILON {
            return Err(GeometryError::degenerate("bounding box has zero extent"));
        }
        Ok(Self { min, scale })
    }

    /// Minimum corner of the source bounding box.
    pub fn min(&self) -> Point3<f64> {
        self.min
    }

    /// Largest extent of the source bounding box.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Map a point into normalized coordinates.
    #[inline]
    pub fn normalize(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from((p - self.min) / self.scale)
    }

    /// Map a normalized point back into source coordinates.
    #[inline]
    pub fn unnormalize(&self, p: &Point3<f64>) -> Point3<f64> {
        self.min + p.coords * self.scale
    }

    /// Normalize a whole point set.
    pub fn normalize_points(&self, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        points.iter().map(|p| self.normalize(p)).collect()
    }

    /// Map normalized points back into source coordinates.
    pub fn unnormalize_points(&self, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        points.iter().map(|p| self.unnormalize(p)).collect()
    }

    /// Map every vertex of a mesh back into source coordinates.
    pub fn unnormalize_mesh(&self, mesh: &mut HalfEdgeMesh) {
        mesh.transform_positions(|p| self.unnormalize(p));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_2d() {
        let points = vec![
            Point2::new(-100.0, 20.0),
            Point2::new(300.0, 45.5),
            Point2::new(12.25, -80.0),
        ];
        let normalizer = Normalizer2::from_points(&points).unwrap();
        let normalized = normalizer.normalize_points(&points);

        assert!(Normalizer2::is_normalized(&normalized));
        let restored = normalizer.unnormalize_points(&normalized);
        for (a, b) in points.iter().zip(restored.iter()) {
            assert!((a - b).norm() < 1e-9);
        }
    }

    #[test]
    fn test_uniform_scale() {
        let points = vec![Point2::new(0.0, 0.0), Point2::new(4.0, 2.0)];
        let normalizer = Normalizer2::from_points(&points).unwrap();
        assert_eq!(normalizer.scale(), 4.0);
        assert_eq!(normalizer.normalize(&Point2::new(4.0, 2.0)), Point2::new(1.0, 0.5));
    }

    #[test]
    fn test_degenerate() {
        assert!(Normalizer2::from_points(&[]).is_err());
        assert!(Normalizer2::from_points(&[Point2::new(1.0, 1.0), Point2::new(1.0, 1.0)]).is_err());
        assert!(Normalizer3::from_points(&[Point3::new(1.0, 1.0, 1.0)]).is_err());
    }

    #[test]
    fn test_roundtrip_3d() {
        let points = vec![
            Point3::new(10.0, 0.0, -5.0),
            Point3::new(-3.0, 7.0, 2.0),
            Point3::new(0.0, 0.0, 100.0),
        ];
        let normalizer = Normalizer3::from_points(&points).unwrap();
        let restored = normalizer.unnormalize_points(&normalizer.normalize_points(&points));
        for (a, b) in points.iter().zip(restored.iter()) {
            assert!((a - b).norm() < 1e-9);
        }
    }
}
