//! Two-dimensional convex hulls.
//!
//! This module provides two interchangeable hull algorithms with the same
//! contract:
//!
//! - [`jarvis_march`]: gift wrapping, O(n·h)
//! - [`quickhull`]: recursive farthest-point partitioning, O(n log n) expected
//!
//! Both deduplicate their input, reject degenerate point sets, and return the
//! hull counter-clockwise starting at the point with minimum x (ties broken by
//! minimum y).
//!
//! Each algorithm first finds the extreme points with the untoleranced sign
//! test, which has a unique answer. A shared pass then drops every vertex that
//! lies within [`EPSILON`] of the chord past it, and collects colinear
//! companions when asked to. That pass only sees the extreme points, so both
//! algorithms agree point for point, and no input point ends up more than
//! `EPSILON` outside the returned polygon.
//!
//! # Example
//!
//! ```
//! use tessel::algo::hull2d::{convex_hull_2d, Hull2dAlgorithm, HullOptions};
//! use nalgebra::Point2;
//!
//! let points = vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 1.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(0.5, 0.5),
//!     Point2::new(0.0, 1.0),
//! ];
//!
//! let options = HullOptions::default();
//! let hull = convex_hull_2d(&points, Hull2dAlgorithm::Quickhull, &options).unwrap();
//! assert_eq!(hull.len(), 4);
//! assert_eq!(hull[0], Point2::new(0.0, 0.0));
//! ```

mod jarvis;
mod quickhull;

pub use jarvis::jarvis_march;
pub use quickhull::quickhull;

use nalgebra::Point2;

use crate::error::{GeometryError, Result};
use crate::geometry::predicates::{on_open_segment, orientation, Orientation};
use crate::geometry::{bounds2, dedup_points2, EPSILON};

/// Options for the 2D hull algorithms.
#[derive(Debug, Clone)]
pub struct HullOptions {
    /// Keep points lying on a hull edge as hull vertices.
    pub include_colinear_points: bool,

    /// Safety cap on gift-wrapping steps. Exceeding it is an error, never a
    /// truncated hull.
    pub max_iterations: usize,
}

impl Default for HullOptions {
    fn default() -> Self {
        Self {
            include_colinear_points: false,
            max_iterations: 100_000,
        }
    }
}

impl HullOptions {
    /// Set whether colinear boundary points are kept.
    pub fn with_colinear_points(mut self, include: bool) -> Self {
        self.include_colinear_points = include;
        self
    }

    /// Set the gift-wrapping iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Which 2D hull algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hull2dAlgorithm {
    /// Gift wrapping.
    JarvisMarch,
    /// Recursive partitioning.
    #[default]
    Quickhull,
}

/// Compute the convex hull of `points` with the chosen algorithm.
pub fn convex_hull_2d(
    points: &[Point2<f64>],
    algorithm: Hull2dAlgorithm,
    options: &HullOptions,
) -> Result<Vec<Point2<f64>>> {
    match algorithm {
        Hull2dAlgorithm::JarvisMarch => jarvis_march(points, options),
        Hull2dAlgorithm::Quickhull => quickhull(points, options),
    }
}

/// Deduplicate and reject inputs that cannot have a 2D hull.
fn prepare_points(points: &[Point2<f64>]) -> Result<Vec<Point2<f64>>> {
    let unique = dedup_points2(points);
    if unique.len() < 3 {
        return Err(GeometryError::degenerate(format!(
            "need at least 3 distinct points, got {}",
            unique.len()
        )));
    }

    if let Some((min, max)) = bounds2(&unique) {
        if max.x - min.x < EPSILON || max.y - min.y < EPSILON {
            return Err(GeometryError::degenerate("bounding box has zero width or height"));
        }
    }

    // Tilted collinear sets pass the bounding-box test.
    let first = unique[0];
    let far = unique
        .iter()
        .copied()
        .max_by(|a, b| (a - first).norm_squared().total_cmp(&(b - first).norm_squared()))
        .unwrap_or(first);
    if unique.iter().all(|p| orientation(&first, &far, p) == Orientation::On) {
        return Err(GeometryError::degenerate("all points are collinear"));
    }

    Ok(unique)
}

/// Turn the extreme points of `points`, counter-clockwise from the start
/// point, into the returned hull.
fn finish_hull(
    extreme: &[Point2<f64>],
    points: &[Point2<f64>],
    options: &HullOptions,
) -> Result<Vec<Point2<f64>>> {
    let hull = drop_flat_vertices(extreme);
    if hull.len() < 3 {
        return Err(GeometryError::degenerate("hull has no area within tolerance"));
    }
    if options.include_colinear_points {
        Ok(with_colinear_companions(&hull, points))
    } else {
        Ok(hull)
    }
}

/// Greedy pass from the start point: each kept vertex is joined to the
/// farthest later vertex such that every vertex skipped in between lies `On`
/// the joining chord. The start point is always kept.
///
/// Skipped vertices bound the region cut off by a chord, so every input point
/// stays within `EPSILON` of the simplified polygon.
fn drop_flat_vertices(extreme: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let n = extreme.len();
    let mut kept = vec![extreme[0]];
    let mut anchor = 0;
    while anchor < n {
        let from = extreme[anchor];
        let mut next = anchor + 1;
        for j in anchor + 2..=n {
            let to = extreme[j % n];
            let flat = (anchor + 1..j)
                .all(|k| orientation(&from, &to, &extreme[k]) == Orientation::On);
            if !flat {
                break;
            }
            next = j;
        }
        if next < n {
            kept.push(extreme[next]);
        }
        anchor = next;
    }
    kept
}

/// Insert, after each hull vertex, the input points lying on the open edge to
/// the next vertex, nearest first. A point near a corner joins the first edge
/// that claims it.
fn with_colinear_companions(hull: &[Point2<f64>], points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut claimed: Vec<bool> = points.iter().map(|p| hull.contains(p)).collect();
    let mut out = Vec::with_capacity(points.len());
    for (i, &a) in hull.iter().enumerate() {
        let b = hull[(i + 1) % hull.len()];
        out.push(a);

        let mut on_edge: Vec<usize> = (0..points.len())
            .filter(|&k| !claimed[k] && on_open_segment(&a, &b, &points[k]))
            .collect();
        on_edge.sort_by(|&u, &w| {
            (points[u] - a)
                .norm_squared()
                .total_cmp(&(points[w] - a).norm_squared())
        });
        for &k in &on_edge {
            claimed[k] = true;
        }
        out.extend(on_edge.iter().map(|&k| points[k]));
    }
    out
}

/// Index of the minimum-x point, ties broken by minimum y.
fn start_index(points: &[Point2<f64>]) -> usize {
    let mut best = 0;
    for (i, p) in points.iter().enumerate().skip(1) {
        let b = &points[best];
        if p.x < b.x || (p.x == b.x && p.y < b.y) {
            best = i;
        }
    }
    best
}

/// Index of the maximum-x point, ties broken by maximum y.
fn end_index(points: &[Point2<f64>]) -> usize {
    let mut best = 0;
    for (i, p) in points.iter().enumerate().skip(1) {
        let b = &points[best];
        if p.x > b.x || (p.x == b.x && p.y > b.y) {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    #[test]
    fn test_prepare_rejects_degenerate() {
        assert!(matches!(
            prepare_points(&[p(0.0, 0.0), p(1.0, 0.0)]),
            Err(GeometryError::DegenerateInput { .. })
        ));
        assert!(matches!(
            prepare_points(&[p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)]),
            Err(GeometryError::DegenerateInput { .. })
        ));
        // Diagonal line: non-degenerate box, still collinear
        assert!(matches!(
            prepare_points(&[p(0.0, 0.0), p(0.5, 0.5), p(1.0, 1.0)]),
            Err(GeometryError::DegenerateInput { .. })
        ));
        // Duplicates collapse below the minimum
        assert!(prepare_points(&[p(0.0, 0.0), p(0.0, 0.0), p(1.0, 1.0), p(1.0, 1.0)]).is_err());
    }

    #[test]
    fn test_extreme_indices() {
        let points = [p(0.0, 1.0), p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)];
        assert_eq!(start_index(&points), 1);
        assert_eq!(end_index(&points), 3);
    }

    #[test]
    fn test_drop_flat_vertices() {
        // A vertex 2e-6 outside the bottom edge is flat; the start stays.
        let extreme = [
            p(0.0, 0.0),
            p(0.5, -2e-6),
            p(1.0, 0.0),
            p(1.0, 1.0),
            p(0.0, 1.0),
        ];
        assert_eq!(
            drop_flat_vertices(&extreme),
            vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)]
        );
        // A run of flat vertices merges only while every skipped vertex stays
        // within tolerance of the new chord.
        let arc: Vec<Point2<f64>> = (0..=20)
            .map(|i| {
                let x = i as f64 / 20.0;
                p(x, -0.0004 * x * (1.0 - x))
            })
            .chain([p(0.5, 1.0)])
            .collect();
        let kept = drop_flat_vertices(&arc);
        assert!(kept.len() > 3);
        assert!(kept.len() < arc.len());
        for w in 0..kept.len() {
            let (a, b) = (kept[w], kept[(w + 1) % kept.len()]);
            for q in &arc {
                assert_ne!(orientation(&a, &b, q), Orientation::Right);
            }
        }
    }

    #[test]
    fn test_colinear_companions() {
        let hull = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)];
        let points = [
            p(0.0, 0.0),
            p(1.0, 0.0),
            p(1.0, 1.0),
            p(0.6, 0.0),
            p(0.3, 0.0),
            p(1.0, 0.5),
            p(0.5, 0.5),
            p(0.5, 0.2),
        ];
        assert_eq!(
            with_colinear_companions(&hull, &points),
            vec![
                p(0.0, 0.0),
                p(0.3, 0.0),
                p(0.6, 0.0),
                p(1.0, 0.0),
                p(1.0, 0.5),
                p(1.0, 1.0),
                p(0.5, 0.5),
            ]
        );
    }

    #[test]
    fn test_algorithms_agree() {
        let points = [
            p(0.1, 0.2),
            p(0.9, 0.1),
            p(0.5, 0.5),
            p(0.8, 0.95),
            p(0.05, 0.7),
            p(0.4, 0.3),
            p(0.6, 0.8),
        ];
        let options = HullOptions::default();
        let a = convex_hull_2d(&points, Hull2dAlgorithm::JarvisMarch, &options).unwrap();
        let b = convex_hull_2d(&points, Hull2dAlgorithm::Quickhull, &options).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, vec![p(0.05, 0.7), p(0.1, 0.2), p(0.9, 0.1), p(0.8, 0.95)]);
    }
}
