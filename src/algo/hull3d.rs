//! Three-dimensional convex hull by incremental (beneath-beyond) insertion.
//!
//! The hull is grown on a [`HalfEdgeMesh`]:
//!
//! 1. Seed with the farthest pair of points, the point farthest from their
//!    line, and a two-sided triangle through the three.
//! 2. For each remaining point, find the faces it can see. Faces are visible
//!    when the point lies more than [`EPSILON`] above their plane; points that
//!    see nothing are inside and dropped.
//! 3. Remove the visible faces and cone the horizon (edges between a visible
//!    and a hidden face) to the new point.
//!
//! The result is a closed triangle mesh with outward-facing, counter-clockwise
//! faces.
//!
//! # Example
//!
//! ```
//! use tessel::algo::hull3d::{convex_hull_3d, Hull3dOptions};
//! use nalgebra::Point3;
//!
//! let points = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//!     Point3::new(0.1, 0.1, 0.1),
//! ];
//! let hull = convex_hull_3d(&points, &Hull3dOptions::default()).unwrap();
//! assert_eq!(hull.num_faces(), 4);
//! ```

use std::collections::{HashMap, HashSet};

use nalgebra::Point3;
use rayon::prelude::*;

use crate::error::{GeometryError, Result};
use crate::geometry::predicates::{distance_to_line3, distance_to_plane};
use crate::geometry::{dedup_points3, Edge3, EPSILON};
use crate::mesh::{ConnectPolicy, FaceId, HalfEdgeId, HalfEdgeMesh, VertexId};

/// Options for [`convex_hull_3d`].
#[derive(Debug, Clone)]
pub struct Hull3dOptions {
    /// Whether to use parallel execution for the seed search and visibility
    /// tests (default: true). Results are identical either way.
    pub parallel: bool,
}

impl Default for Hull3dOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl Hull3dOptions {
    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Compute the convex hull of a 3D point set.
///
/// Fails with [`GeometryError::DegenerateInput`] for fewer than 4 distinct
/// points or when the points are collinear or coplanar.
pub fn convex_hull_3d(points: &[Point3<f64>], options: &Hull3dOptions) -> Result<HalfEdgeMesh> {
    let points = dedup_points3(points);
    if points.len() < 4 {
        return Err(GeometryError::degenerate(format!(
            "need at least 4 distinct points, got {}",
            points.len()
        )));
    }

    let (ia, ib) = farthest_pair(&points, options.parallel);
    let (pa, pb) = (points[ia], points[ib]);

    let (ic, line_distance) = argmax(&points, options.parallel, |p| distance_to_line3(&pa, &pb, p));
    if line_distance < EPSILON {
        return Err(GeometryError::degenerate("all points are collinear"));
    }
    let pc = points[ic];

    let normal = (pb - pa)
        .cross(&(pc - pa))
        .try_normalize(f64::MIN_POSITIVE)
        .ok_or_else(|| GeometryError::degenerate("seed triangle has no area"))?;
    let (id, plane_distance) =
        argmax(&points, options.parallel, |p| distance_to_plane(&normal, &pa, p).abs());
    if plane_distance < EPSILON {
        return Err(GeometryError::degenerate("all points are coplanar"));
    }

    // Both sides of the seed triangle; the apex sees exactly one of them.
    let mut mesh = HalfEdgeMesh::with_capacity(points.len(), 2 * points.len());
    let va = mesh.add_vertex(pa);
    let vb = mesh.add_vertex(pb);
    let vc = mesh.add_vertex(pc);
    mesh.add_triangle_by_ids(va, vb, vc);
    mesh.add_triangle_by_ids(va, vc, vb);
    mesh.connect_opposite_edges(ConnectPolicy::Fast)?;

    let rest = (0..points.len()).filter(|&i| i != ia && i != ib && i != ic && i != id);
    let order = std::iter::once(id).chain(rest);

    let mut discarded = 0;
    for i in order {
        if !add_point(&mut mesh, points[i], options.parallel)? {
            discarded += 1;
        }
    }

    mesh.compact();
    if let Some(open) = mesh.halfedge_ids().find(|&he| mesh.is_boundary_halfedge(he)) {
        return Err(GeometryError::invariant(format!("hull is not closed at {open:?}")));
    }
    mesh.validate()?;

    log::debug!(
        "3d hull: {} vertices, {} faces from {} points ({} interior)",
        mesh.num_vertices(),
        mesh.num_faces(),
        points.len(),
        discarded
    );
    Ok(mesh)
}

/// Indices of the two points farthest apart.
fn farthest_pair(points: &[Point3<f64>], parallel: bool) -> (usize, usize) {
    let best_for = |i: usize| {
        let mut best = (0.0, i, i);
        for j in (i + 1)..points.len() {
            let d = Edge3::new(points[i], points[j]).length_squared();
            if d > best.0 {
                best = (d, i, j);
            }
        }
        best
    };
    // Keep the earliest pair on ties so the parallel path agrees.
    let pick = |a: (f64, usize, usize), b: (f64, usize, usize)| {
        if b.0 > a.0 || (b.0 == a.0 && (b.1, b.2) < (a.1, a.2)) {
            b
        } else {
            a
        }
    };

    let (_, i, j) = if parallel {
        (0..points.len()).into_par_iter().map(best_for).reduce(|| (0.0, 0, 0), pick)
    } else {
        (0..points.len()).map(best_for).fold((0.0, 0, 0), pick)
    };
    (i, j)
}

/// Index and value of the first point maximizing `score`.
fn argmax<F>(points: &[Point3<f64>], parallel: bool, score: F) -> (usize, f64)
where
    F: Fn(&Point3<f64>) -> f64 + Sync,
{
    let pick = |a: (usize, f64), b: (usize, f64)| {
        if b.1 > a.1 || (b.1 == a.1 && b.0 < a.0) {
            b
        } else {
            a
        }
    };
    if parallel {
        points
            .par_iter()
            .enumerate()
            .map(|(i, p)| (i, score(p)))
            .reduce(|| (0, f64::NEG_INFINITY), pick)
    } else {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, score(p)))
            .fold((0, f64::NEG_INFINITY), pick)
    }
}

fn is_visible(mesh: &HalfEdgeMesh, f: FaceId, p: &Point3<f64>) -> bool {
    let on_plane = mesh.position(mesh.origin(mesh.face(f).halfedge));
    distance_to_plane(&mesh.face_normal(f), on_plane, p) > EPSILON
}

/// Insert one point. Returns `false` if the point is inside the hull.
fn add_point(mesh: &mut HalfEdgeMesh, p: Point3<f64>, parallel: bool) -> Result<bool> {
    let view: &HalfEdgeMesh = mesh;
    let faces: Vec<FaceId> = view.face_ids().collect();
    let visible: Vec<FaceId> = if parallel {
        faces.par_iter().copied().filter(|&f| is_visible(view, f, &p)).collect()
    } else {
        faces.iter().copied().filter(|&f| is_visible(view, f, &p)).collect()
    };
    if visible.is_empty() {
        return Ok(false);
    }

    let visible_set: HashSet<FaceId> = visible.iter().copied().collect();
    let mut horizon: Vec<(VertexId, VertexId, HalfEdgeId)> = Vec::new();
    for &f in &visible {
        for he in mesh.face_halfedges(f) {
            let twin = mesh.twin(he);
            if !twin.is_valid() {
                return Err(GeometryError::invariant(format!(
                    "hull face {f:?} has an open edge {he:?}"
                )));
            }
            if !visible_set.contains(&mesh.face_of(twin)) {
                horizon.push((mesh.origin(he), mesh.dest(he), twin));
            }
        }
    }

    for &f in &visible {
        mesh.remove_face(f)?;
    }

    let apex = mesh.add_vertex(p);
    let mut into_apex: HashMap<VertexId, HalfEdgeId> = HashMap::with_capacity(horizon.len());
    let mut from_apex: HashMap<VertexId, HalfEdgeId> = HashMap::with_capacity(horizon.len());
    for (a, b, outside) in horizon {
        let f = mesh.add_triangle_by_ids(a, b, apex);
        let [ab, b_apex, apex_a] = mesh.face_halfedges(f);
        mesh.link_twins(ab, outside);
        into_apex.insert(b, b_apex);
        from_apex.insert(a, apex_a);
    }

    for (v, he) in into_apex {
        match from_apex.get(&v) {
            Some(&opposite) => mesh.link_twins(he, opposite),
            None => {
                return Err(GeometryError::invariant(format!(
                    "horizon is not a closed loop at {v:?}"
                )));
            }
        }
    }
    Ok(true)
}
