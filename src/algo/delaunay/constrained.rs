//! Constrained Delaunay triangulation.
//!
//! Forced edges are recovered by Sloan's method: every edge properly crossing
//! the segment is queued and flipped until the segment itself appears, after
//! which the freshly created edges are legalized with the constraint held
//! fixed. Obstacles are polygons whose edges are forced as a group and can be
//! removed again; shared edges are reference counted so removing one obstacle
//! never frees an edge another still owns.

use std::collections::VecDeque;

use nalgebra::Point2;

use crate::error::{GeometryError, Result};
use crate::geometry::predicates::{
    on_open_segment, point_in_polygon, segment_crosses_properly, segments_cross,
};
use crate::geometry::{approx_eq2, flatten, lift, Edge2, NormalizedPoints};
use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, VertexId};

use super::{
    insert_point, legalize, locate, triangulate, ConstraintSet, DelaunayOptions, FlipBudget,
    Location,
};

/// Handle to an obstacle inserted into a [`ConstrainedTriangulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObstacleId(usize);

impl ObstacleId {
    /// Insertion index of the obstacle.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Obstacle {
    polygon: Vec<Point2<f64>>,
    /// Constrained vertex pairs the obstacle holds a reference on.
    pieces: Vec<(VertexId, VertexId)>,
}

/// Options for [`constrained_triangulation`].
#[derive(Debug, Clone, Default)]
pub struct ConstrainedOptions {
    /// Options for the underlying Delaunay triangulation.
    pub delaunay: DelaunayOptions,

    /// Polygons whose interior is removed from the result.
    pub holes: Vec<Vec<Point2<f64>>>,

    /// Outer polygon; faces outside it are removed from the result.
    pub boundary: Option<Vec<Point2<f64>>>,
}

impl ConstrainedOptions {
    /// Set the Delaunay options.
    pub fn with_delaunay(mut self, delaunay: DelaunayOptions) -> Self {
        self.delaunay = delaunay;
        self
    }

    /// Add a hole polygon.
    pub fn with_hole(mut self, polygon: Vec<Point2<f64>>) -> Self {
        self.holes.push(polygon);
        self
    }

    /// Set the outer boundary polygon.
    pub fn with_boundary(mut self, polygon: Vec<Point2<f64>>) -> Self {
        self.boundary = Some(polygon);
        self
    }
}

/// A Delaunay triangulation that keeps a set of forced edges.
///
/// Every edge not in the constraint set is locally Delaunay. Points,
/// constraint segments and obstacles can be added and removed at any time.
#[derive(Debug, Clone)]
pub struct ConstrainedTriangulation {
    mesh: HalfEdgeMesh,
    constraints: ConstraintSet,
    obstacles: Vec<Option<Obstacle>>,
    options: DelaunayOptions,
    hint: Option<FaceId>,
}

impl ConstrainedTriangulation {
    /// Triangulate `points` with no constraints yet.
    pub fn new(points: &NormalizedPoints, options: DelaunayOptions) -> Result<Self> {
        let mesh = triangulate(points, &options)?;
        Ok(Self::from_mesh(mesh, options))
    }

    /// Wrap an existing planar triangulation.
    pub fn from_mesh(mesh: HalfEdgeMesh, options: DelaunayOptions) -> Self {
        Self {
            mesh,
            constraints: ConstraintSet::default(),
            obstacles: Vec::new(),
            options,
            hint: None,
        }
    }

    /// The current triangulation.
    pub fn mesh(&self) -> &HalfEdgeMesh {
        &self.mesh
    }

    /// Consume the triangulation, returning its mesh.
    pub fn into_mesh(self) -> HalfEdgeMesh {
        self.mesh
    }

    /// Whether the edge between `a` and `b` is forced.
    pub fn is_constrained(&self, a: VertexId, b: VertexId) -> bool {
        self.constraints.contains(a, b)
    }

    /// Every forced edge as a vertex pair, smaller id first.
    pub fn constraint_edges(&self) -> Vec<(VertexId, VertexId)> {
        self.constraints.iter().collect()
    }

    /// Insert a point, splitting a forced edge if it lands on one.
    pub fn insert_point(&mut self, p: Point2<f64>) -> Result<VertexId> {
        let mut flips = FlipBudget::new(self.options.max_flips);
        self.insert_vertex(p, &mut flips)
    }

    /// Force the segment `a -> b` into the triangulation.
    ///
    /// Endpoints missing from the mesh are inserted first, and the segment is
    /// split at every vertex lying on it. Returns the resulting vertex pairs
    /// in order from `a` to `b`.
    ///
    /// Fails with [`GeometryError::ConflictingConstraints`] when the segment
    /// properly crosses a forced edge, and with [`GeometryError::OutsideDomain`]
    /// when it leaves the triangulated region. The mesh is unchanged on either
    /// error.
    pub fn insert_constraint(
        &mut self,
        a: Point2<f64>,
        b: Point2<f64>,
    ) -> Result<Vec<(VertexId, VertexId)>> {
        self.check_segment(&a, &b)?;
        let mut flips = FlipBudget::new(self.options.max_flips);
        self.enforce(a, b, &mut flips)
    }

    /// Release one reference on each forced piece of the segment `a -> b`.
    ///
    /// Pieces that become free are legalized again. Returns `false` when the
    /// segment held no forced pieces.
    pub fn remove_constraint(&mut self, a: Point2<f64>, b: Point2<f64>) -> Result<bool> {
        let va = self.mesh.find_vertex(&lift(&a));
        let vb = self.mesh.find_vertex(&lift(&b));
        let (Some(va), Some(vb)) = (va, vb) else {
            return Ok(false);
        };

        let chain = self.chain(va, vb);
        let mut found = false;
        let mut freed = Vec::new();
        for pair in chain.windows(2) {
            if !self.constraints.contains(pair[0], pair[1]) {
                continue;
            }
            found = true;
            if self.constraints.release(pair[0], pair[1]) {
                freed.push((pair[0], pair[1]));
            }
        }

        self.relegalize(&freed)?;
        Ok(found)
    }

    /// Insert a polygonal obstacle and force its edges.
    ///
    /// A two-point polygon is a single segment; longer polygons are closed.
    pub fn insert_obstacle(&mut self, polygon: &[Point2<f64>]) -> Result<ObstacleId> {
        let edges = polygon_edges(polygon);
        if edges.is_empty() {
            return Err(GeometryError::invalid_param(
                "polygon",
                polygon.len(),
                "an obstacle needs at least two distinct points",
            ));
        }

        for (i, e) in edges.iter().enumerate() {
            for (j, f) in edges.iter().enumerate().skip(i + 2) {
                let wraps = i == 0 && j == edges.len() - 1;
                if !wraps && segments_cross(&e.a, &e.b, &f.a, &f.b) {
                    return Err(GeometryError::ConflictingConstraints { first: i, second: j });
                }
            }
        }
        for e in &edges {
            self.check_segment(&e.a, &e.b)?;
        }

        let id = ObstacleId(self.obstacles.len());
        self.obstacles.push(Some(Obstacle {
            polygon: polygon.to_vec(),
            pieces: Vec::new(),
        }));

        let mut flips = FlipBudget::new(self.options.max_flips);
        for e in &edges {
            let pieces = match self.enforce(e.a, e.b, &mut flips) {
                Ok(pieces) => pieces,
                Err(err) => {
                    if let Err(cleanup) = self.remove_obstacle(id) {
                        log::warn!(
                            "could not roll back partial obstacle {}: {cleanup}",
                            id.index()
                        );
                    }
                    return Err(err);
                }
            };
            if let Some(obstacle) = self.obstacles[id.0].as_mut() {
                obstacle.pieces.extend(pieces);
            }
        }

        log::debug!("inserted obstacle {} with {} edges", id.index(), edges.len());
        Ok(id)
    }

    /// Remove an obstacle, freeing the edges no other owner holds.
    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Result<()> {
        let obstacle = self
            .obstacles
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or_else(|| {
                GeometryError::invalid_param("obstacle", id.index(), "no such obstacle")
            })?;

        let freed: Vec<(VertexId, VertexId)> = obstacle
            .pieces
            .iter()
            .copied()
            .filter(|&(a, b)| self.constraints.release(a, b))
            .collect();
        self.relegalize(&freed)?;
        log::debug!("removed obstacle {}, freeing {} edges", id.index(), freed.len());
        Ok(())
    }

    /// The polygon of a live obstacle.
    pub fn obstacle_polygon(&self, id: ObstacleId) -> Option<&[Point2<f64>]> {
        self.obstacles.get(id.0)?.as_ref().map(|o| o.polygon.as_slice())
    }

    /// Handles of all live obstacles.
    pub fn obstacle_ids(&self) -> impl Iterator<Item = ObstacleId> + '_ {
        self.obstacles
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_some())
            .map(|(i, _)| ObstacleId(i))
    }

    /// Faces whose centroid lies inside some obstacle polygon.
    pub fn faces_inside_obstacles(&self) -> Vec<FaceId> {
        self.mesh
            .face_ids()
            .filter(|&f| {
                let c = flatten(&self.mesh.face_centroid(f));
                self.obstacles.iter().flatten().any(|o| point_in_polygon(&o.polygon, &c))
            })
            .collect()
    }

    /// Remove every face whose centroid lies inside `polygon`.
    pub fn remove_faces_inside(&mut self, polygon: &[Point2<f64>]) -> Result<usize> {
        self.remove_faces_where(|c| point_in_polygon(polygon, c))
    }

    /// Remove every face whose centroid lies outside `polygon`.
    pub fn remove_faces_outside(&mut self, polygon: &[Point2<f64>]) -> Result<usize> {
        self.remove_faces_where(|c| !point_in_polygon(polygon, c))
    }

    fn remove_faces_where(&mut self, doomed: impl Fn(&Point2<f64>) -> bool) -> Result<usize> {
        let faces: Vec<FaceId> = self
            .mesh
            .face_ids()
            .filter(|&f| doomed(&flatten(&self.mesh.face_centroid(f))))
            .collect();
        for &f in &faces {
            self.mesh.remove_face(f)?;
        }
        self.hint = None;
        Ok(faces.len())
    }

    fn insert_vertex(&mut self, p: Point2<f64>, flips: &mut FlipBudget) -> Result<VertexId> {
        let v = insert_point(
            &mut self.mesh,
            p,
            self.hint,
            &mut self.constraints,
            &self.options,
            flips,
            true,
        )?;
        self.refresh_pieces(v);
        let he = self.mesh.vertex(v).halfedge;
        self.hint = he.is_valid().then(|| self.mesh.face_of(he));
        Ok(v)
    }

    /// Follow forced edges that inserting `v` split in two.
    fn refresh_pieces(&mut self, v: VertexId) {
        let constraints = &self.constraints;
        for obstacle in self.obstacles.iter_mut().flatten() {
            let mut pieces = Vec::with_capacity(obstacle.pieces.len() + 1);
            for &(a, b) in &obstacle.pieces {
                if !constraints.contains(a, b)
                    && constraints.contains(a, v)
                    && constraints.contains(v, b)
                {
                    pieces.push((a, v));
                    pieces.push((v, b));
                } else {
                    pieces.push((a, b));
                }
            }
            obstacle.pieces = pieces;
        }
    }

    /// Reject a segment that would conflict with the current state.
    fn check_segment(&self, a: &Point2<f64>, b: &Point2<f64>) -> Result<()> {
        if approx_eq2(a, b) {
            return Err(GeometryError::degenerate("constraint endpoints coincide"));
        }
        for p in [a, b] {
            if locate(&self.mesh, p, self.hint, self.options.max_walk_steps) == Location::Outside {
                return Err(GeometryError::OutsideDomain { x: p.x, y: p.y });
            }
        }

        for he in self.mesh.boundary_halfedges() {
            let c = self.mesh.position2(self.mesh.origin(he));
            let d = self.mesh.position2(self.mesh.dest(he));
            if segment_crosses_properly(a, b, &c, &d) {
                let x = crossing_point(a, b, &c, &d);
                return Err(GeometryError::OutsideDomain { x: x.x, y: x.y });
            }
        }

        for (i, (u, w)) in self.constraints.iter().enumerate() {
            let c = self.mesh.position2(u);
            let d = self.mesh.position2(w);
            if segment_crosses_properly(a, b, &c, &d) {
                return Err(GeometryError::ConflictingConstraints {
                    first: i,
                    second: self.constraints.len(),
                });
            }
        }
        Ok(())
    }

    fn enforce(
        &mut self,
        a: Point2<f64>,
        b: Point2<f64>,
        flips: &mut FlipBudget,
    ) -> Result<Vec<(VertexId, VertexId)>> {
        let va = self.insert_vertex(a, flips)?;
        let vb = self.insert_vertex(b, flips)?;
        if va == vb {
            return Err(GeometryError::degenerate("constraint endpoints are duplicates"));
        }

        let chain = self.chain(va, vb);
        let mut pieces = Vec::with_capacity(chain.len() - 1);
        for pair in chain.windows(2) {
            self.force_edge(pair[0], pair[1], flips)?;
            pieces.push((pair[0], pair[1]));
        }
        log::trace!("forced constraint {va:?} -> {vb:?} in {} pieces", pieces.len());
        Ok(pieces)
    }

    /// `a`, every vertex strictly inside the segment ordered from `a`, then `b`.
    fn chain(&self, a: VertexId, b: VertexId) -> Vec<VertexId> {
        let pa = self.mesh.position2(a);
        let pb = self.mesh.position2(b);
        let mut inner: Vec<(f64, VertexId)> = self
            .mesh
            .vertex_ids()
            .filter(|&v| self.mesh.vertex(v).halfedge.is_valid())
            .map(|v| (v, self.mesh.position2(v)))
            .filter(|(_, p)| on_open_segment(&pa, &pb, p))
            .map(|(v, p)| ((p - pa).norm_squared(), v))
            .collect();
        inner.sort_by(|x, y| x.0.total_cmp(&y.0));

        let mut chain = Vec::with_capacity(inner.len() + 2);
        chain.push(a);
        chain.extend(inner.into_iter().map(|(_, v)| v));
        chain.push(b);
        chain
    }

    /// Recover the edge `u - w`, which no vertex lies on, and constrain it.
    fn force_edge(&mut self, u: VertexId, w: VertexId, flips: &mut FlipBudget) -> Result<()> {
        if self.mesh.find_edge(u, w).is_some() {
            self.constraints.insert(u, w);
            return Ok(());
        }

        let pu = self.mesh.position2(u);
        let pw = self.mesh.position2(w);
        let mut queue: VecDeque<HalfEdgeId> = VecDeque::new();
        for he in self.mesh.edge_ids() {
            let (o, d) = (self.mesh.origin(he), self.mesh.dest(he));
            if !self.crosses(&pu, &pw, u, w, he) {
                continue;
            }
            if self.mesh.is_boundary_halfedge(he) {
                let p = self.mesh.position2(o);
                return Err(GeometryError::OutsideDomain { x: p.x, y: p.y });
            }
            if self.constraints.contains(o, d) {
                let key = ConstraintSet::key(o, d);
                let first = self.constraints.iter().position(|e| e == key).unwrap_or(0);
                return Err(GeometryError::ConflictingConstraints {
                    first,
                    second: self.constraints.len(),
                });
            }
            queue.push_back(he);
        }

        let limit = self.options.max_flips;
        let mut iterations = 0;
        let mut created = Vec::new();
        while let Some(he) = queue.pop_front() {
            iterations += 1;
            if iterations > limit {
                return Err(GeometryError::IterationLimitExceeded {
                    operation: "constraint recovery",
                    limit,
                });
            }
            if !self.mesh.is_flippable(he) {
                queue.push_back(he);
                continue;
            }
            self.mesh.flip_edge(he)?;
            if self.crosses(&pu, &pw, u, w, he) {
                queue.push_back(he);
            } else {
                created.push(he);
            }
        }

        let Some(forced) = self.mesh.find_edge(u, w) else {
            return Err(GeometryError::invariant(format!(
                "edge {u:?} - {w:?} missing after constraint recovery"
            )));
        };
        self.constraints.insert(u, w);

        // Legalize the new diagonals and the rim of the re-triangulated region.
        let mut stack = Vec::with_capacity(created.len() * 5 + 4);
        for he in created.into_iter().chain([forced]) {
            stack.push(he);
            for side in [he, self.mesh.twin(he)] {
                if side.is_valid() {
                    stack.push(self.mesh.next(side));
                    stack.push(self.mesh.prev(side));
                }
            }
        }
        legalize(&mut self.mesh, stack, &self.constraints, flips)
    }

    fn crosses(
        &self,
        pu: &Point2<f64>,
        pw: &Point2<f64>,
        u: VertexId,
        w: VertexId,
        he: HalfEdgeId,
    ) -> bool {
        let (o, d) = (self.mesh.origin(he), self.mesh.dest(he));
        if o == u || o == w || d == u || d == w {
            return false;
        }
        segment_crosses_properly(pu, pw, &self.mesh.position2(o), &self.mesh.position2(d))
    }

    /// Legalize around edges that just lost their constraint.
    fn relegalize(&mut self, freed: &[(VertexId, VertexId)]) -> Result<()> {
        let stack: Vec<HalfEdgeId> = freed
            .iter()
            .filter_map(|&(a, b)| self.mesh.find_edge(a, b))
            .collect();
        let mut flips = FlipBudget::new(self.options.max_flips);
        legalize(&mut self.mesh, stack, &self.constraints, &mut flips)
    }
}

/// Edges of a polygon: one segment for two points, a closed loop otherwise.
fn polygon_edges(polygon: &[Point2<f64>]) -> Vec<Edge2> {
    let mut points = polygon.to_vec();
    if points.len() > 2 && approx_eq2(&points[0], &points[points.len() - 1]) {
        points.pop();
    }
    match points.len() {
        0 | 1 => Vec::new(),
        2 if approx_eq2(&points[0], &points[1]) => Vec::new(),
        2 => vec![Edge2::new(points[0], points[1])],
        n => (0..n).map(|i| Edge2::new(points[i], points[(i + 1) % n])).collect(),
    }
}

/// Intersection of two properly crossing segments.
fn crossing_point(
    a: &Point2<f64>,
    b: &Point2<f64>,
    c: &Point2<f64>,
    d: &Point2<f64>,
) -> Point2<f64> {
    let r = b - a;
    let s = d - c;
    let denom = r.x * s.y - r.y * s.x;
    let ac = c - a;
    let t = (ac.x * s.y - ac.y * s.x) / denom;
    a + r * t
}

/// Triangulate `points` with forced `edges`, then cut holes and trim to the
/// outer boundary.
///
/// Edge endpoints and polygon corners join the point set. Any two forced
/// segments, including hole and boundary edges, that meet anywhere other than
/// a shared endpoint are rejected with [`GeometryError::ConflictingConstraints`]
/// naming their positions in `edges` followed by the polygon edges in order.
pub fn constrained_triangulation(
    points: &NormalizedPoints,
    edges: &[Edge2],
    options: &ConstrainedOptions,
) -> Result<HalfEdgeMesh> {
    let mut segments: Vec<Edge2> = edges.to_vec();
    for hole in &options.holes {
        segments.extend(polygon_edges(hole));
    }
    if let Some(boundary) = &options.boundary {
        segments.extend(polygon_edges(boundary));
    }

    for (i, e) in segments.iter().enumerate() {
        if e.is_degenerate() {
            return Err(GeometryError::degenerate(format!(
                "constraint edge {i} has coincident endpoints"
            )));
        }
    }
    for (i, e) in segments.iter().enumerate() {
        for (j, f) in segments.iter().enumerate().skip(i + 1) {
            if segments_cross(&e.a, &e.b, &f.a, &f.b) {
                return Err(GeometryError::ConflictingConstraints { first: i, second: j });
            }
        }
    }

    let mut all = points.to_vec();
    all.extend(segments.iter().flat_map(|e| [e.a, e.b]));
    let sites = NormalizedPoints::assume_normalized(all);
    let mut cdt = ConstrainedTriangulation::new(&sites, options.delaunay.clone())?;
    for e in &segments {
        cdt.insert_constraint(e.a, e.b)?;
    }

    let mut removed = 0;
    for hole in &options.holes {
        removed += cdt.remove_faces_inside(hole)?;
    }
    if let Some(boundary) = &options.boundary {
        removed += cdt.remove_faces_outside(boundary)?;
    }

    let constraint_count = cdt.constraints.len();
    let mut mesh = cdt.into_mesh();
    mesh.compact();
    mesh.validate()?;
    log::debug!(
        "constrained triangulation: {} faces, {} forced edges, {} faces removed",
        mesh.num_faces(),
        constraint_count,
        removed
    );
    Ok(mesh)
}
