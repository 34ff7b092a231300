//! Jarvis march (gift wrapping).

use nalgebra::Point2;

use super::{finish_hull, prepare_points, start_index, HullOptions};
use crate::error::{GeometryError, Result};
use crate::geometry::predicates::{exact_orientation, Orientation};

/// Compute the convex hull of `points` by gift wrapping.
///
/// From the current hull point, the first other point is taken as the
/// candidate and every point is swept against it: a point strictly to the
/// right of `current -> candidate` replaces the candidate, and so does a point
/// on that line farther ahead. The sweep uses the untoleranced sign test, so
/// the candidate can never drift past a true hull vertex. The march stops when
/// the candidate is the start point again.
///
/// Vertices within tolerance of the edge past them are then dropped and, when
/// requested, the points on each hull edge are inserted as colinear
/// companions, nearest first.
///
/// Fails with [`GeometryError::DegenerateInput`] for fewer than 3 distinct or
/// all-collinear points, and with [`GeometryError::IterationLimitExceeded`]
/// when `options.max_iterations` wrapping steps do not close the hull.
pub fn jarvis_march(points: &[Point2<f64>], options: &HullOptions) -> Result<Vec<Point2<f64>>> {
    let points = prepare_points(points)?;
    let start = start_index(&points);
    let mut extreme = vec![points[start]];
    let mut current = start;
    let mut iterations = 0;

    loop {
        iterations += 1;
        if iterations > options.max_iterations {
            return Err(GeometryError::IterationLimitExceeded {
                operation: "jarvis march",
                limit: options.max_iterations,
            });
        }

        let here = points[current];
        let mut candidate = usize::from(current == 0);
        for (i, p) in points.iter().enumerate() {
            if i == current || i == candidate {
                continue;
            }
            let c = points[candidate];
            let replace = match exact_orientation(&here, &c, p) {
                Orientation::Right => true,
                Orientation::On => {
                    let ahead = (p - here).dot(&(c - here)) > 0.0;
                    ahead && (p - here).norm_squared() > (c - here).norm_squared()
                }
                Orientation::Left => false,
            };
            if replace {
                candidate = i;
            }
        }

        if candidate == start {
            break;
        }
        extreme.push(points[candidate]);
        current = candidate;
    }

    let hull = finish_hull(&extreme, &points, options)?;
    log::debug!(
        "jarvis march: {} hull points from {} inputs in {} steps",
        hull.len(),
        points.len(),
        iterations
    );
    Ok(hull)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::hull2d::quickhull;
    use crate::geometry::predicates::orientation;

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    fn assert_encloses(hull: &[Point2<f64>], points: &[Point2<f64>]) {
        for i in 0..hull.len() {
            let a = hull[i];
            let b = hull[(i + 1) % hull.len()];
            for c in points {
                assert_ne!(orientation(&a, &b, c), Orientation::Right, "{c} outside {a} -> {b}");
            }
        }
    }

    #[test]
    fn test_square() {
        let points = [p(1.0, 1.0), p(0.0, 1.0), p(0.0, 0.0), p(1.0, 0.0)];
        let hull = jarvis_march(&points, &HullOptions::default()).unwrap();
        assert_eq!(hull, vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)]);
    }

    #[test]
    fn test_interior_points_excluded() {
        let points = [
            p(0.0, 0.0),
            p(0.5, 0.5),
            p(1.0, 0.0),
            p(0.3, 0.2),
            p(0.5, 1.0),
        ];
        let hull = jarvis_march(&points, &HullOptions::default()).unwrap();
        assert_eq!(hull, vec![p(0.0, 0.0), p(1.0, 0.0), p(0.5, 1.0)]);
    }

    #[test]
    fn test_colinear_points() {
        let points = [
            p(0.0, 0.0),
            p(0.75, 0.0),
            p(0.25, 0.0),
            p(1.0, 0.0),
            p(1.0, 1.0),
            p(0.0, 1.0),
            p(0.0, 0.5),
        ];

        let without = jarvis_march(&points, &HullOptions::default()).unwrap();
        assert_eq!(without.len(), 4);

        let options = HullOptions::default().with_colinear_points(true);
        let with = jarvis_march(&points, &options).unwrap();
        assert_eq!(
            with,
            vec![
                p(0.0, 0.0),
                p(0.25, 0.0),
                p(0.75, 0.0),
                p(1.0, 0.0),
                p(1.0, 1.0),
                p(0.0, 1.0),
                p(0.0, 0.5),
            ]
        );
    }

    #[test]
    fn test_duplicates_collapsed() {
        let points = [p(0.0, 0.0), p(1.0, 0.0), p(0.0, 0.0), p(0.0, 1.0), p(1.0, 0.0)];
        let hull = jarvis_march(&points, &HullOptions::default()).unwrap();
        assert_eq!(hull.len(), 3);
    }

    #[test]
    fn test_iteration_cap() {
        let points = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)];
        let options = HullOptions::default().with_max_iterations(2);
        let result = jarvis_march(&points, &options);
        assert!(matches!(
            result,
            Err(GeometryError::IterationLimitExceeded { limit: 2, .. })
        ));
    }

    #[test]
    fn test_nearly_collinear_terminates() {
        // Many points within tolerance of a line, plus one apex to make the set 2D.
        let mut points: Vec<Point2<f64>> = (0..500)
            .map(|i| {
                let x = i as f64 / 499.0;
                let wobble = if i % 2 == 0 { 1e-7 } else { -1e-7 };
                p(x, 0.5 * x + wobble)
            })
            .collect();
        points.push(p(0.2, 0.9));

        let plain = jarvis_march(&points, &HullOptions::default()).unwrap();
        assert_eq!(plain.len(), 3);
        assert_eq!(plain[0], p(0.0, 0.0 + 1e-7));
        assert_encloses(&plain, &points);

        let options = HullOptions::default().with_colinear_points(true);
        let with = jarvis_march(&points, &options).unwrap();
        assert!(with.len() > plain.len());
        assert!(with.len() <= points.len());
        assert!(plain.iter().all(|v| with.contains(v)));
    }

    #[test]
    fn test_dense_circle() {
        // Neighbours on the circle are within tolerance of the chord that
        // skips them; none may end up outside the hull.
        let points: Vec<Point2<f64>> = (0..2000)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / 2000.0;
                p(0.5 + 0.5 * angle.cos(), 0.5 + 0.5 * angle.sin())
            })
            .collect();
        let options = HullOptions::default();
        let hull = jarvis_march(&points, &options).unwrap();
        assert_encloses(&hull, &points);
        assert_eq!(hull, quickhull(&points, &options).unwrap());
        assert!(hull.len() > 100);
        assert!(hull.len() < 2000);
    }

    #[test]
    fn test_degenerate_input() {
        let line = [p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)];
        let result = jarvis_march(&line, &HullOptions::default());
        assert!(matches!(result, Err(GeometryError::DegenerateInput { .. })));
    }
}
