//! Quickhull in the plane.

use nalgebra::Point2;

use super::{end_index, finish_hull, prepare_points, start_index, HullOptions};
use crate::error::Result;
use crate::geometry::predicates::{distance_to_line, exact_orientation, Orientation};

/// Compute the convex hull of `points` by recursive partitioning.
///
/// The extreme points `a` (minimum x) and `b` (maximum x) split the set into a
/// lower chain, right of `a -> b`, and an upper chain, right of `b -> a`. Each
/// chain is refined by taking the point farthest from its splitting line and
/// recursing on the two sub-chains outside the new triangle. Sidedness uses
/// the untoleranced sign test; tolerance is applied once the extreme points
/// are known, exactly as in [`jarvis_march`](super::jarvis_march).
///
/// The result has the same order and start point as `jarvis_march`.
/// `options.max_iterations` is not used.
pub fn quickhull(points: &[Point2<f64>], options: &HullOptions) -> Result<Vec<Point2<f64>>> {
    let points = prepare_points(points)?;
    let a = points[start_index(&points)];
    let b = points[end_index(&points)];

    let mut extreme = vec![a];
    find_hull(&points, &a, &b, &mut extreme);
    extreme.push(b);
    find_hull(&points, &b, &a, &mut extreme);

    let hull = finish_hull(&extreme, &points, options)?;
    log::debug!("quickhull: {} hull points from {} inputs", hull.len(), points.len());
    Ok(hull)
}

/// Append the extreme points strictly right of `p -> q`, in order from `p`
/// to `q`.
fn find_hull(
    candidates: &[Point2<f64>],
    p: &Point2<f64>,
    q: &Point2<f64>,
    extreme: &mut Vec<Point2<f64>>,
) {
    let outside: Vec<Point2<f64>> = candidates
        .iter()
        .filter(|c| exact_orientation(p, q, c) == Orientation::Right)
        .copied()
        .collect();
    let Some(&first) = outside.first() else {
        return;
    };

    let mut farthest = first;
    let mut max_distance = distance_to_line(p, q, &farthest);
    for c in &outside[1..] {
        let d = distance_to_line(p, q, c);
        if d > max_distance {
            max_distance = d;
            farthest = *c;
        }
    }

    find_hull(&outside, p, &farthest, extreme);
    extreme.push(farthest);
    find_hull(&outside, &farthest, q, extreme);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::hull2d::jarvis_march;
    use crate::error::GeometryError;
    use crate::geometry::predicates::orientation;

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    #[test]
    fn test_square() {
        let points = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)];
        let hull = quickhull(&points, &HullOptions::default()).unwrap();
        assert_eq!(hull, vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)]);
    }

    #[test]
    fn test_pentagon_with_interior_point() {
        let pentagon: Vec<Point2<f64>> = (0..5)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / 5.0;
                p(0.5 + 0.4 * angle.cos(), 0.5 + 0.4 * angle.sin())
            })
            .collect();
        let mut points = pentagon.clone();
        points.push(p(0.5, 0.5));

        let hull = quickhull(&points, &HullOptions::default()).unwrap();
        assert_eq!(hull.len(), 5);
        assert!(!hull.contains(&p(0.5, 0.5)));
        for v in &pentagon {
            assert!(hull.contains(v));
        }
    }

    #[test]
    fn test_colinear_points_match_jarvis() {
        let points = [
            p(0.0, 0.0),
            p(0.5, 0.0),
            p(1.0, 0.0),
            p(1.0, 0.5),
            p(1.0, 1.0),
            p(0.5, 1.0),
            p(0.0, 1.0),
            p(0.0, 0.5),
            p(0.5, 0.5),
        ];
        let options = HullOptions::default().with_colinear_points(true);
        let quick = quickhull(&points, &options).unwrap();
        let jarvis = jarvis_march(&points, &options).unwrap();
        assert_eq!(quick.len(), 8);
        assert_eq!(quick, jarvis);
    }

    #[test]
    fn test_no_point_outside() {
        let points: Vec<Point2<f64>> = (0..50)
            .map(|i| {
                let t = i as f64 * 0.37;
                p(0.5 + 0.5 * (t * 1.3).sin() * t.cos(), 0.5 + 0.5 * (t * 0.7).cos())
            })
            .collect();
        let hull = quickhull(&points, &HullOptions::default()).unwrap();
        for i in 0..hull.len() {
            let a = hull[i];
            let b = hull[(i + 1) % hull.len()];
            for c in &points {
                assert_ne!(orientation(&a, &b, c), Orientation::Right);
            }
        }
    }

    #[test]
    fn test_points_just_outside_a_chord() {
        // The middle points bulge 5e-6 past the bottom edge: they are inside
        // the tolerance and not hull vertices, yet nothing lies outside.
        let points = [
            p(0.0, 0.0),
            p(0.3, -5e-6),
            p(0.7, -5e-6),
            p(1.0, 0.0),
            p(1.0, 1.0),
            p(0.0, 1.0),
        ];
        let hull = quickhull(&points, &HullOptions::default()).unwrap();
        assert_eq!(hull, vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)]);
        assert_eq!(hull, jarvis_march(&points, &HullOptions::default()).unwrap());
        for i in 0..hull.len() {
            let (a, b) = (hull[i], hull[(i + 1) % hull.len()]);
            for c in &points {
                assert_ne!(orientation(&a, &b, c), Orientation::Right);
            }
        }

        let options = HullOptions::default().with_colinear_points(true);
        let with = quickhull(&points, &options).unwrap();
        assert_eq!(with.len(), 6);
        assert_eq!(with, jarvis_march(&points, &options).unwrap());
    }

    #[test]
    fn test_collinear_input() {
        let result = quickhull(&[p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)], &HullOptions::default());
        assert!(matches!(result, Err(GeometryError::DegenerateInput { .. })));
    }
}
