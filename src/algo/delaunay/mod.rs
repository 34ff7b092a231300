//! Delaunay triangulation.
//!
//! This module provides incremental Delaunay triangulation over a
//! [`HalfEdgeMesh`], and constrained triangulation with forced edges.
//!
//! # Algorithms
//!
//! - [`triangulate`]: incremental insertion with local Lawson legalization
//! - [`triangulate_points`]: the same insertion without legalization
//! - [`delaunay_by_flipping`]: legalize an existing planar triangulation
//! - [`ConstrainedTriangulation`]: a live constrained triangulation (Sloan's
//!   algorithm) with dynamic constraints and obstacles
//! - [`constrained_triangulation`]: one-shot constrained triangulation with
//!   optional holes and outer boundary
//!
//! # Normalized input
//!
//! Every predicate measures its tolerance
//! [`EPSILON`](crate::geometry::EPSILON) as an absolute distance, sized for
//! coordinates in the unit square. Entry points therefore take
//! [`NormalizedPoints`](crate::geometry::NormalizedPoints), which only a
//! [`Normalizer2`](crate::geometry::Normalizer2) produces.
//!
//! Points closer than `EPSILON` to an existing vertex are the same point.
//! Any other point becomes a vertex of its own, even when it is too close to
//! an edge to split it with the toleranced tests.
//!
//! # Example
//!
//! ```
//! use tessel::algo::delaunay::{triangulate, DelaunayOptions};
//! use tessel::geometry::Normalizer2;
//! use nalgebra::Point2;
//!
//! let points = vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(10.0, 0.0),
//!     Point2::new(10.0, 10.0),
//!     Point2::new(0.0, 10.0),
//!     Point2::new(4.0, 6.0),
//! ];
//! let normalizer = Normalizer2::from_points(&points).unwrap();
//! let normalized = normalizer.normalize_points(&points);
//! let mut mesh = triangulate(&normalized, &DelaunayOptions::default()).unwrap();
//! normalizer.unnormalize_mesh(&mut mesh);
//!
//! assert_eq!(mesh.num_faces(), 4);
//! ```

mod constrained;
mod incremental;

pub use constrained::{
    constrained_triangulation, ConstrainedOptions, ConstrainedTriangulation, ObstacleId,
};
pub use incremental::{triangulate, triangulate_points};

use std::collections::BTreeMap;

use nalgebra::Point2;

use crate::error::{GeometryError, Result};
use crate::geometry::approx_eq2;
use crate::geometry::predicates::{in_circle, orientation, CircleTest, Orientation};
use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, VertexId};

/// Options for Delaunay triangulation.
#[derive(Debug, Clone)]
pub struct DelaunayOptions {
    /// Budget of edge flips for one operation. Exceeding it is reported as
    /// [`GeometryError::IterationLimitExceeded`].
    pub max_flips: usize,

    /// Steps of the visibility walk before point location falls back to a
    /// scan of every face.
    pub max_walk_steps: usize,
}

impl Default for DelaunayOptions {
    fn default() -> Self {
        Self {
            max_flips: 10_000_000,
            max_walk_steps: 100_000,
        }
    }
}

impl DelaunayOptions {
    /// Set the flip budget.
    pub fn with_max_flips(mut self, max_flips: usize) -> Self {
        self.max_flips = max_flips;
        self
    }

    /// Set the walk length before falling back to a linear scan.
    pub fn with_max_walk_steps(mut self, max_walk_steps: usize) -> Self {
        self.max_walk_steps = max_walk_steps;
        self
    }
}

/// Legalize every edge of a planar triangulation by Lawson flips.
///
/// An interior edge is flipped when the apex across it lies strictly inside
/// the circumcircle of its face. Returns the number of flips; on a mesh that is
/// already Delaunay this is zero.
pub fn delaunay_by_flipping(mesh: &mut HalfEdgeMesh, options: &DelaunayOptions) -> Result<usize> {
    let stack: Vec<HalfEdgeId> = mesh
        .edge_ids()
        .filter(|&he| !mesh.is_boundary_halfedge(he))
        .collect();
    let mut flips = FlipBudget::new(options.max_flips);
    legalize(mesh, stack, &ConstraintSet::default(), &mut flips)?;
    log::debug!("delaunay by flipping: {} flips", flips.used);
    Ok(flips.used)
}

/// Whether no interior edge of `mesh` is illegal.
pub fn is_delaunay(mesh: &HalfEdgeMesh) -> bool {
    mesh.edge_ids()
        .filter(|&he| !mesh.is_boundary_halfedge(he))
        .all(|he| !is_illegal(mesh, he))
}

fn is_illegal(mesh: &HalfEdgeMesh, he: HalfEdgeId) -> bool {
    let t = mesh.twin(he);
    let a = mesh.position2(mesh.origin(he));
    let b = mesh.position2(mesh.dest(he));
    let c = mesh.position2(mesh.apex(he));
    let d = mesh.position2(mesh.apex(t));
    in_circle(&a, &b, &c, &d) == CircleTest::Inside
}

/// Forced edges, stored as unordered vertex pairs with a reference count.
///
/// Obstacles may share edges, so an edge stays constrained until every owner
/// has released it.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConstraintSet {
    edges: BTreeMap<(VertexId, VertexId), usize>,
}

impl ConstraintSet {
    pub(crate) fn key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub(crate) fn insert(&mut self, a: VertexId, b: VertexId) {
        *self.edges.entry(Self::key(a, b)).or_insert(0) += 1;
    }

    pub(crate) fn insert_count(&mut self, a: VertexId, b: VertexId, count: usize) {
        if count > 0 {
            *self.edges.entry(Self::key(a, b)).or_insert(0) += count;
        }
    }

    /// Release one reference. Returns `true` when the edge became free.
    pub(crate) fn release(&mut self, a: VertexId, b: VertexId) -> bool {
        let key = Self::key(a, b);
        match self.edges.get_mut(&key) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.edges.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Remove an edge entirely, returning its reference count.
    pub(crate) fn take(&mut self, a: VertexId, b: VertexId) -> usize {
        self.edges.remove(&Self::key(a, b)).unwrap_or(0)
    }

    pub(crate) fn contains(&self, a: VertexId, b: VertexId) -> bool {
        self.edges.contains_key(&Self::key(a, b))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        self.edges.keys().copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.edges.len()
    }
}

/// Counts flips against a budget.
pub(crate) struct FlipBudget {
    pub(crate) used: usize,
    limit: usize,
}

impl FlipBudget {
    pub(crate) fn new(limit: usize) -> Self {
        Self { used: 0, limit }
    }

    fn spend(&mut self, operation: &'static str) -> Result<()> {
        self.used += 1;
        if self.used > self.limit {
            return Err(GeometryError::IterationLimitExceeded {
                operation,
                limit: self.limit,
            });
        }
        Ok(())
    }
}

/// Lawson legalization from a stack of suspect edges.
///
/// Constrained edges and boundary edges are never flipped, and neither are
/// edges whose quad is not convex.
pub(crate) fn legalize(
    mesh: &mut HalfEdgeMesh,
    mut stack: Vec<HalfEdgeId>,
    constraints: &ConstraintSet,
    flips: &mut FlipBudget,
) -> Result<()> {
    while let Some(he) = stack.pop() {
        if !mesh.contains_halfedge(he) || mesh.is_boundary_halfedge(he) {
            continue;
        }
        if constraints.contains(mesh.origin(he), mesh.dest(he)) || !is_illegal(mesh, he) {
            continue;
        }

        let t = mesh.twin(he);
        let outer = [mesh.next(he), mesh.prev(he), mesh.next(t), mesh.prev(t)];
        match mesh.flip_edge(he) {
            Ok(_) => {}
            Err(GeometryError::NotFlippable { .. }) => continue,
            Err(e) => return Err(e),
        }
        flips.spend("delaunay legalization")?;
        stack.extend(outer);
    }
    Ok(())
}

/// Where a query point falls in a triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Location {
    /// Strictly inside a face.
    Face(FaceId),
    /// On the interior of an edge.
    Edge(HalfEdgeId),
    /// On an existing vertex.
    Vertex(VertexId),
    /// Not covered by any face.
    Outside,
}

fn classify_in_face(mesh: &HalfEdgeMesh, f: FaceId, p: &Point2<f64>) -> Option<Location> {
    let hes = mesh.face_halfedges(f);
    let mut on_edge = None;
    for he in hes {
        let a = mesh.position2(mesh.origin(he));
        if approx_eq2(&a, p) {
            return Some(Location::Vertex(mesh.origin(he)));
        }
    }
    for he in hes {
        let a = mesh.position2(mesh.origin(he));
        let b = mesh.position2(mesh.dest(he));
        match orientation(&a, &b, p) {
            Orientation::Right => return None,
            Orientation::On => on_edge = Some(he),
            Orientation::Left => {}
        }
    }
    Some(on_edge.map_or(Location::Face(f), Location::Edge))
}

/// Locate `p` by walking from `hint` towards it, crossing the first edge that
/// has `p` on its right.
///
/// The walk cannot cycle in a Delaunay triangulation, but constrained meshes
/// offer no such guarantee; after `max_steps` the search falls back to testing
/// every face.
pub(crate) fn locate(
    mesh: &HalfEdgeMesh,
    p: &Point2<f64>,
    hint: Option<FaceId>,
    max_steps: usize,
) -> Location {
    let start = hint.filter(|&f| mesh.contains_face(f)).or_else(|| mesh.face_ids().next());
    let Some(mut f) = start else {
        return Location::Outside;
    };

    'walk: for _ in 0..max_steps {
        for he in mesh.face_halfedges(f) {
            let a = mesh.position2(mesh.origin(he));
            let b = mesh.position2(mesh.dest(he));
            if orientation(&a, &b, p) == Orientation::Right {
                let t = mesh.twin(he);
                if !t.is_valid() {
                    // Past a boundary edge of a convex domain means outside;
                    // holes and concave boundaries need the full scan.
                    break 'walk;
                }
                f = mesh.face_of(t);
                continue 'walk;
            }
        }
        if let Some(location) = classify_in_face(mesh, f, p) {
            return location;
        }
        break;
    }

    log::trace!("point location for ({}, {}) fell back to a face scan", p.x, p.y);
    let faces: Vec<FaceId> = mesh.face_ids().collect();
    let mut edge_hit = None;
    for f in faces {
        match classify_in_face(mesh, f, p) {
            Some(Location::Face(f)) => return Location::Face(f),
            Some(Location::Vertex(v)) => return Location::Vertex(v),
            Some(Location::Edge(he)) => {
                // Prefer the interior side of a shared edge.
                if edge_hit.is_none() || !mesh.is_boundary_halfedge(he) {
                    edge_hit = Some(he);
                }
            }
            Some(Location::Outside) | None => {}
        }
    }
    edge_hit.map_or(Location::Outside, Location::Edge)
}

/// Insert `p` into a planar triangulation and legalize around it.
///
/// Returns the vertex at `p`, which is an existing vertex when `p` coincides
/// with one. Points outside the triangulated domain are rejected with
/// [`GeometryError::OutsideDomain`].
pub(crate) fn insert_point(
    mesh: &mut HalfEdgeMesh,
    p: Point2<f64>,
    hint: Option<FaceId>,
    constraints: &mut ConstraintSet,
    options: &DelaunayOptions,
    flips: &mut FlipBudget,
    legalize_after: bool,
) -> Result<VertexId> {
    let location = locate(mesh, &p, hint, options.max_walk_steps);
    let (v, faces) = match location {
        Location::Outside => return Err(GeometryError::OutsideDomain { x: p.x, y: p.y }),
        Location::Vertex(v) => {
            log::warn!("point ({}, {}) coincides with an existing vertex {v:?}", p.x, p.y);
            return Ok(v);
        }
        Location::Face(f) => match mesh.insert_in_face(f, p) {
            Ok((v, faces)) => (v, faces.to_vec()),
            Err(GeometryError::DegenerateInput { .. }) => insert_exact(mesh, f, p, constraints)?,
            Err(e) => return Err(e),
        },
        Location::Edge(he) => {
            let near = mesh.face_of(he);
            match split_edge(mesh, he, p, constraints, false)? {
                Some(split) => split,
                None => insert_exact(mesh, near, p, constraints)?,
            }
        }
    };

    if legalize_after {
        let stack: Vec<HalfEdgeId> = faces
            .iter()
            .filter_map(|&f| {
                mesh.face_halfedges(f)
                    .into_iter()
                    .find(|&he| mesh.origin(he) != v && mesh.dest(he) != v)
            })
            .collect();
        legalize(mesh, stack, constraints, flips)?;
    }
    Ok(v)
}

/// Split the edge of `he` at `p`, carrying its constraint count over to both
/// pieces. Returns `None`, with nothing changed, when the split would leave a
/// face without area.
fn split_edge(
    mesh: &mut HalfEdgeMesh,
    he: HalfEdgeId,
    p: Point2<f64>,
    constraints: &mut ConstraintSet,
    exact: bool,
) -> Result<Option<(VertexId, Vec<FaceId>)>> {
    let (a, b) = (mesh.origin(he), mesh.dest(he));
    let pieces = constraints.take(a, b);
    let split = if exact {
        mesh.insert_on_edge_exact(he, p)
    } else {
        mesh.insert_on_edge(he, p)
    };
    match split {
        Ok((v, faces)) => {
            constraints.insert_count(a, v, pieces);
            constraints.insert_count(v, b, pieces);
            Ok(Some((v, faces)))
        }
        Err(GeometryError::DegenerateInput { .. }) => {
            constraints.insert_count(a, b, pieces);
            Ok(None)
        }
        Err(e) => {
            constraints.insert_count(a, b, pieces);
            Err(e)
        }
    }
}

/// Insert a point that lies within tolerance of an edge but cannot split it
/// cleanly, typically because it is also close to a corner.
///
/// The faces around `near` are tried first, then every face: a face that
/// contains `p` by the untoleranced sign test is split at it, otherwise an
/// edge whose split keeps every face's area positive. `p` always becomes a
/// vertex of its own.
fn insert_exact(
    mesh: &mut HalfEdgeMesh,
    near: FaceId,
    p: Point2<f64>,
    constraints: &mut ConstraintSet,
) -> Result<(VertexId, Vec<FaceId>)> {
    let mut ring: Vec<FaceId> = Vec::new();
    if mesh.contains_face(near) {
        for corner in mesh.face_triangle(near) {
            for he in mesh.vertex_outgoing(corner) {
                let f = mesh.face_of(he);
                if !ring.contains(&f) {
                    ring.push(f);
                }
            }
        }
    }

    for faces in [ring, mesh.face_ids().collect()] {
        for &f in &faces {
            match mesh.insert_in_face_exact(f, p) {
                Ok((v, split)) => {
                    log::debug!("point ({}, {}) inserted by the exact face test", p.x, p.y);
                    return Ok((v, split.to_vec()));
                }
                Err(GeometryError::DegenerateInput { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        for &f in &faces {
            for he in mesh.face_halfedges(f) {
                if let Some(split) = split_edge(mesh, he, p, constraints, true)? {
                    log::debug!("point ({}, {}) inserted by the exact edge test", p.x, p.y);
                    return Ok(split);
                }
            }
        }
    }

    Err(GeometryError::degenerate(format!(
        "point ({}, {}) cannot be inserted as a vertex of its own",
        p.x, p.y
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_triangles, ConnectPolicy};
    use nalgebra::Point3;

    /// Square split along the "wrong" diagonal of a non-cocircular quad.
    fn skewed_quad() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.3, 0.0),
            Point3::new(0.0, 0.3, 0.0),
        ];
        // Both diagonals of a rectangle are legal; push one corner in.
        let mut mesh = build_from_triangles(&vertices, &[[0, 1, 3], [1, 2, 3]]).unwrap();
        mesh.set_position(VertexId::new(2), Point3::new(0.6, 0.3, 0.0));
        mesh
    }

    #[test]
    fn test_constraint_set_refcount() {
        let mut set = ConstraintSet::default();
        let (a, b) = (VertexId::new(0), VertexId::new(1));
        set.insert(a, b);
        set.insert(b, a);
        assert!(set.contains(b, a));
        assert_eq!(set.len(), 1);
        assert!(!set.release(a, b));
        assert!(set.release(b, a));
        assert!(!set.contains(a, b));
    }

    #[test]
    fn test_flipping_fixes_illegal_edge() {
        let mut mesh = skewed_quad();
        assert!(!is_delaunay(&mesh));

        let flips = delaunay_by_flipping(&mut mesh, &DelaunayOptions::default()).unwrap();
        assert_eq!(flips, 1);
        assert!(is_delaunay(&mesh));
        assert!(mesh.is_valid());

        // Idempotent on a legal mesh
        let again = delaunay_by_flipping(&mut mesh, &DelaunayOptions::default()).unwrap();
        assert_eq!(again, 0);
    }

    #[test]
    fn test_flip_budget() {
        let mut mesh = skewed_quad();
        let result = delaunay_by_flipping(&mut mesh, &DelaunayOptions::default().with_max_flips(0));
        assert!(matches!(result, Err(GeometryError::IterationLimitExceeded { limit: 0, .. })));
    }

    #[test]
    fn test_locate() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point3::new(1.0, 1.0, 0.0));
        let d = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        let f0 = mesh.add_triangle_by_ids(a, b, c);
        let f1 = mesh.add_triangle_by_ids(a, c, d);
        mesh.connect_opposite_edges(ConnectPolicy::Fast).unwrap();

        assert_eq!(locate(&mesh, &Point2::new(0.8, 0.2), Some(f1), 100), Location::Face(f0));
        assert_eq!(locate(&mesh, &Point2::new(0.2, 0.8), Some(f0), 100), Location::Face(f1));
        assert_eq!(locate(&mesh, &Point2::new(1.0, 1.0), None, 100), Location::Vertex(c));
        assert_eq!(locate(&mesh, &Point2::new(2.0, 0.5), None, 100), Location::Outside);
        match locate(&mesh, &Point2::new(0.5, 0.5), None, 100) {
            Location::Edge(he) => {
                let mut ends = [mesh.origin(he), mesh.dest(he)];
                ends.sort();
                assert_eq!(ends, [a, c]);
            }
            other => panic!("expected an edge, got {other:?}"),
        }
        // Exhausted walk still finds the face
        assert_eq!(locate(&mesh, &Point2::new(0.8, 0.2), Some(f1), 0), Location::Face(f0));
    }

    fn unit_square() -> HalfEdgeMesh {
        build_from_triangles(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_insert_point_near_corner_keeps_its_own_vertex() {
        // Within EPSILON of both edges at (1, 0), but not of the corner.
        let mut mesh = unit_square();
        let corner = VertexId::new(1);
        let p = Point2::new(1.0 - 8e-6, 8e-6);
        assert!((mesh.position2(corner) - p).norm() > crate::geometry::EPSILON);

        let mut flips = FlipBudget::new(100);
        let v = insert_point(
            &mut mesh,
            p,
            None,
            &mut ConstraintSet::default(),
            &DelaunayOptions::default(),
            &mut flips,
            true,
        )
        .unwrap();

        assert_ne!(v, corner);
        assert_eq!(mesh.position2(v), p);
        assert_eq!(mesh.num_vertices(), 5);
        assert!(mesh.is_valid());
        for f in mesh.face_ids() {
            let [a, b, c] = mesh.face_positions2(f);
            assert!(crate::geometry::predicates::cross2(&a, &b, &c) > 0.0);
        }
    }

    #[test]
    fn test_insert_point_merges_only_true_duplicates() {
        let mut mesh = unit_square();
        let mut flips = FlipBudget::new(100);
        let v = insert_point(
            &mut mesh,
            Point2::new(1.0 - 3e-6, 4e-6),
            None,
            &mut ConstraintSet::default(),
            &DelaunayOptions::default(),
            &mut flips,
            true,
        )
        .unwrap();
        assert_eq!(v, VertexId::new(1));
        assert_eq!(mesh.num_vertices(), 4);
    }

    #[test]
    fn test_insert_point_splits_constrained_edge() {
        let mut mesh = unit_square();
        let mut constraints = ConstraintSet::default();
        constraints.insert(VertexId::new(0), VertexId::new(2));

        let mut flips = FlipBudget::new(100);
        let v = insert_point(
            &mut mesh,
            Point2::new(0.5, 0.5),
            None,
            &mut constraints,
            &DelaunayOptions::default(),
            &mut flips,
            true,
        )
        .unwrap();

        assert!(constraints.contains(VertexId::new(0), v));
        assert!(constraints.contains(v, VertexId::new(2)));
        assert!(!constraints.contains(VertexId::new(0), VertexId::new(2)));
        assert_eq!(mesh.num_faces(), 4);
        assert!(mesh.is_valid());
    }
}
