//! Point-by-point triangulation.

use crate::algo::hull2d::{quickhull, HullOptions};
use crate::error::Result;
use crate::geometry::{dedup_points2, lift, NormalizedPoints};
use crate::mesh::{ConnectPolicy, HalfEdgeId, HalfEdgeMesh, VertexId};

use super::{insert_point, legalize, ConstraintSet, DelaunayOptions, FlipBudget};

/// Compute the Delaunay triangulation of a normalized point set.
///
/// Starts from a fan over the convex hull, legalizes it, then inserts the
/// remaining points one at a time, each followed by Lawson flips outward from
/// the new vertex. Duplicate points are dropped with a warning.
///
/// Fails with [`GeometryError::DegenerateInput`](crate::error::GeometryError::DegenerateInput)
/// when the points have no 2D hull, and with
/// [`GeometryError::IterationLimitExceeded`](crate::error::GeometryError::IterationLimitExceeded)
/// when the flip budget runs out.
pub fn triangulate(points: &NormalizedPoints, options: &DelaunayOptions) -> Result<HalfEdgeMesh> {
    build(points, options, true)
}

/// Triangulate a normalized point set without enforcing the Delaunay property.
///
/// The result is a valid planar triangulation of the same vertices; pass it to
/// [`delaunay_by_flipping`](super::delaunay_by_flipping) to make it Delaunay.
pub fn triangulate_points(points: &NormalizedPoints) -> Result<HalfEdgeMesh> {
    build(points, &DelaunayOptions::default(), false)
}

fn build(
    points: &NormalizedPoints,
    options: &DelaunayOptions,
    legalize_edges: bool,
) -> Result<HalfEdgeMesh> {
    let unique = dedup_points2(points);
    if unique.len() < points.len() {
        log::warn!("dropped {} duplicate points before triangulating", points.len() - unique.len());
    }

    let hull = quickhull(&unique, &HullOptions::default())?;

    let mut mesh = HalfEdgeMesh::with_capacity(unique.len(), 2 * unique.len());
    let corners: Vec<VertexId> = hull.iter().map(|p| mesh.add_vertex(lift(p))).collect();
    for pair in corners[1..].windows(2) {
        mesh.add_triangle_by_ids(corners[0], pair[0], pair[1]);
    }
    mesh.connect_opposite_edges(ConnectPolicy::Fast)?;

    let mut constraints = ConstraintSet::default();
    let mut flips = FlipBudget::new(options.max_flips);
    if legalize_edges {
        let interior: Vec<HalfEdgeId> = mesh
            .edge_ids()
            .filter(|&he| !mesh.is_boundary_halfedge(he))
            .collect();
        legalize(&mut mesh, interior, &constraints, &mut flips)?;
    }

    let mut hint = None;
    for p in &unique {
        if mesh.find_vertex(&lift(p)).is_some() {
            continue;
        }
        let v = insert_point(
            &mut mesh,
            *p,
            hint,
            &mut constraints,
            options,
            &mut flips,
            legalize_edges,
        )?;
        let he = mesh.vertex(v).halfedge;
        hint = he.is_valid().then(|| mesh.face_of(he));
    }

    mesh.validate()?;
    log::debug!(
        "triangulated {} points ({} on the hull) into {} faces with {} flips",
        mesh.num_vertices(),
        hull.len(),
        mesh.num_faces(),
        flips.used
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::delaunay::{delaunay_by_flipping, is_delaunay};
    use crate::error::GeometryError;
    use crate::geometry::predicates::{circumcenter, in_circle, CircleTest};
    use crate::geometry::EPSILON;
    use nalgebra::Point2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn normalized(points: Vec<Point2<f64>>) -> NormalizedPoints {
        NormalizedPoints::assume_normalized(points)
    }

    fn random_points(n: usize, seed: u64) -> NormalizedPoints {
        let mut rng = StdRng::seed_from_u64(seed);
        normalized((0..n).map(|_| Point2::new(rng.gen::<f64>(), rng.gen::<f64>())).collect())
    }

    #[test]
    fn test_square() {
        let points = normalized(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]);
        let mesh = triangulate(&points, &DelaunayOptions::default()).unwrap();
        assert_eq!(mesh.num_faces(), 2);
        assert!(mesh.is_valid());

        // Either diagonal; each triangle must pass against the opposite corner.
        for he in mesh.edge_ids().filter(|&he| !mesh.is_boundary_halfedge(he)) {
            let t = mesh.twin(he);
            let [a, b, c] = mesh.face_positions2(mesh.face_of(he));
            let d = mesh.position2(mesh.apex(t));
            assert_ne!(in_circle(&a, &b, &c, &d), CircleTest::Inside);
        }
    }

    #[test]
    fn test_face_count_formula() {
        let points = random_points(60, 11);
        let mesh = triangulate(&points, &DelaunayOptions::default()).unwrap();
        let hull = mesh.boundary_halfedges().len();
        assert_eq!(mesh.num_faces(), 2 * mesh.num_vertices() - 2 - hull);
        assert!(is_delaunay(&mesh));
    }

    #[test]
    fn test_duplicates_dropped() {
        let points = normalized(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 1.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 0.4),
            Point2::new(0.5, 0.4 + 1e-7),
        ]);
        let mesh = triangulate(&points, &DelaunayOptions::default()).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 3);
    }

    #[test]
    fn test_points_on_hull_edges() {
        let points = normalized(vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.5, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.4, 0.6),
        ]);
        let mesh = triangulate(&points, &DelaunayOptions::default()).unwrap();
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.boundary_halfedges().len(), 5);
        assert!(mesh.is_valid());
        assert!(is_delaunay(&mesh));
    }

    #[test]
    fn test_unlegalized_then_flipped() {
        let points = random_points(40, 3);
        let mut mesh = triangulate_points(&points).unwrap();
        assert!(mesh.is_valid());
        assert_eq!(mesh.num_vertices(), 40);

        delaunay_by_flipping(&mut mesh, &DelaunayOptions::default()).unwrap();
        assert!(is_delaunay(&mesh));
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_every_distinct_point_becomes_a_vertex() {
        for (n, seed) in [(1000, 42), (5000, 42), (2000, 9)] {
            let points = random_points(n, seed);
            let expected = dedup_points2(&points).len();
            let mesh = triangulate(&points, &DelaunayOptions::default()).unwrap();
            assert_eq!(mesh.num_vertices(), expected, "n = {n}, seed = {seed}");
            assert_eq!(mesh.num_faces(), 2 * expected - 2 - mesh.boundary_halfedges().len());
        }
    }

    #[test]
    fn test_points_crowding_short_edges() {
        // Clusters of points a few EPSILON apart around each site: close to
        // every short edge, never equal within tolerance.
        let mut rng = StdRng::seed_from_u64(23);
        let mut points = Vec::new();
        for _ in 0..150 {
            let site = Point2::new(rng.gen_range(0.1..0.9), rng.gen_range(0.1..0.9));
            points.push(site);
            for k in 0..3 {
                let angle = rng.gen::<f64>() * std::f64::consts::TAU;
                let r = 1.5e-5 * (k + 1) as f64;
                points.push(site + nalgebra::Vector2::new(angle.cos(), angle.sin()) * r);
            }
        }
        points.extend([
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]);
        let expected = dedup_points2(&points).len();
        let mesh = triangulate(&normalized(points), &DelaunayOptions::default()).unwrap();
        assert_eq!(mesh.num_vertices(), expected);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_empty_circumcircles_by_distance() {
        let points = random_points(1000, 42);
        let mesh = triangulate(&points, &DelaunayOptions::default()).unwrap();
        let sites: Vec<(VertexId, Point2<f64>)> =
            mesh.vertex_ids().map(|v| (v, mesh.position2(v))).collect();

        for f in mesh.face_ids() {
            let corners = mesh.face_triangle(f);
            let [a, b, c] = mesh.face_positions2(f);
            let center = circumcenter(&a, &b, &c).unwrap();
            let radius = (a - center).norm();
            for (v, q) in &sites {
                if !corners.contains(v) {
                    let distance = (q - center).norm();
                    assert!(
                        distance >= radius - EPSILON - 1e-12,
                        "{v:?} is {} inside the circumcircle of {f:?}",
                        radius - distance
                    );
                }
            }
        }
    }

    #[test]
    fn test_collinear_input() {
        let points = normalized(vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.5, 0.0),
            Point2::new(1.0, 0.0),
        ]);
        let result = triangulate(&points, &DelaunayOptions::default());
        assert!(matches!(result, Err(GeometryError::DegenerateInput { .. })));
    }
}
