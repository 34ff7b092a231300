//! Half-edge mesh data structure.
//!
//! This module provides a half-edge (doubly-connected edge list) representation
//! for triangle meshes. The same structure is the output of the 3D hull and the
//! Delaunay triangulations, and the working storage those algorithms mutate.
//!
//! # Structure
//!
//! - Each edge shared by two faces is split into two **half-edges** pointing in
//!   opposite directions and linked as **twins**.
//! - Each half-edge knows its **origin vertex**, **next** and **prev**
//!   half-edges around its face, its **twin**, and its **face**.
//! - Each vertex stores one outgoing half-edge; each face stores one of its
//!   half-edges and a unit normal.
//!
//! # Conventions
//!
//! - Faces are triangles wound counter-clockwise: in the xy plane for planar
//!   meshes, seen from outside for closed hulls. `next` walks that winding.
//! - There are no boundary half-edges. A half-edge without a twin lies on the
//!   mesh boundary.
//! - Elements are stored in arenas and referenced by handle. Removing an element
//!   tombstones its slot; [`HalfEdgeMesh::compact`] renumbers the survivors.
//!
//! # Invariants
//!
//! After every public mutation, for every live half-edge `h`:
//!
//! 1. `next(next(next(h))) == h`
//! 2. `twin(twin(h)) == h` whenever `twin(h)` is valid
//! 3. `h`, `next(h)`, and `next(next(h))` share one face
//! 4. no other live half-edge has the same `(origin, dest)` pair
//!
//! [`HalfEdgeMesh::validate`] checks all of them.

use std::collections::HashSet;

use nalgebra::{Point2, Point3, Vector3};

use super::index::{FaceId, HalfEdgeId, VertexId};
use crate::error::{GeometryError, Result};
use crate::geometry::{approx_eq3, flatten, PointIndex};

/// A vertex in the half-edge mesh.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// The position of this vertex. Planar meshes keep `z = 0`.
    pub position: Point3<f64>,

    /// One outgoing half-edge, or invalid for an isolated vertex.
    pub halfedge: HalfEdgeId,

    pub(crate) removed: bool,
}

impl Vertex {
    /// Create a new isolated vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            halfedge: HalfEdgeId::invalid(),
            removed: false,
        }
    }
}

/// A directed edge on the boundary of exactly one face.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge {
    /// The vertex this half-edge originates from.
    pub origin: VertexId,

    /// The opposite half-edge on the neighbouring face.
    /// Invalid on the mesh boundary.
    pub twin: HalfEdgeId,

    /// The next half-edge around the face (counter-clockwise).
    pub next: HalfEdgeId,

    /// The previous half-edge around the face.
    pub prev: HalfEdgeId,

    /// The face this half-edge belongs to.
    pub face: FaceId,

    pub(crate) removed: bool,
}

impl HalfEdge {
    pub(crate) fn new(origin: VertexId) -> Self {
        Self {
            origin,
            twin: HalfEdgeId::invalid(),
            next: HalfEdgeId::invalid(),
            prev: HalfEdgeId::invalid(),
            face: FaceId::invalid(),
            removed: false,
        }
    }
}

/// A triangular face.
#[derive(Debug, Clone, Copy)]
pub struct Face {
    /// One half-edge on the boundary of this face.
    pub halfedge: HalfEdgeId,

    /// Unit normal of the supporting plane. Zero for degenerate triangles.
    pub normal: Vector3<f64>,

    pub(crate) removed: bool,
}

/// A half-edge mesh of triangles.
///
/// The mesh owns every vertex, half-edge, and face. Handles handed out by the
/// mesh are plain indices; they stay meaningful until [`compact`](Self::compact)
/// is called or the mesh is dropped.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) halfedges: Vec<HalfEdge>,
    pub(crate) faces: Vec<Face>,
    point_index: PointIndex,
    live_vertices: usize,
    live_halfedges: usize,
    live_faces: usize,
}

impl Default for HalfEdgeMesh {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn triangle_normal(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
) -> Vector3<f64> {
    (p1 - p0)
        .cross(&(p2 - p0))
        .try_normalize(f64::MIN_POSITIVE)
        .unwrap_or_else(Vector3::zeros)
}

impl HalfEdgeMesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(num_vertices),
            halfedges: Vec::with_capacity(num_faces * 3),
            faces: Vec::with_capacity(num_faces),
            point_index: PointIndex::default(),
            live_vertices: 0,
            live_halfedges: 0,
            live_faces: 0,
        }
    }

    // ==================== Accessors ====================

    /// Number of live vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.live_vertices
    }

    /// Number of live half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.live_halfedges
    }

    /// Number of live faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.live_faces
    }

    /// Whether the mesh has no faces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live_faces == 0
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    #[inline]
    pub(crate) fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex {
        &mut self.vertices[id.index()]
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId) -> &HalfEdge {
        &self.halfedges[id.index()]
    }

    #[inline]
    pub(crate) fn halfedge_mut(&mut self, id: HalfEdgeId) -> &mut HalfEdge {
        &mut self.halfedges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id.index()]
    }

    #[inline]
    pub(crate) fn face_mut(&mut self, id: FaceId) -> &mut Face {
        &mut self.faces[id.index()]
    }

    /// Whether a vertex handle refers to a live vertex of this mesh.
    pub fn contains_vertex(&self, id: VertexId) -> bool {
        id.is_valid() && id.index() < self.vertices.len() && !self.vertices[id.index()].removed
    }

    /// Whether a half-edge handle refers to a live half-edge of this mesh.
    pub fn contains_halfedge(&self, id: HalfEdgeId) -> bool {
        id.is_valid() && id.index() < self.halfedges.len() && !self.halfedges[id.index()].removed
    }

    /// Whether a face handle refers to a live face of this mesh.
    pub fn contains_face(&self, id: FaceId) -> bool {
        id.is_valid() && id.index() < self.faces.len() && !self.faces[id.index()].removed
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// Get the xy position of a vertex.
    #[inline]
    pub fn position2(&self, v: VertexId) -> Point2<f64> {
        flatten(self.position(v))
    }

    /// Move a vertex. Normals of the faces around it are refreshed.
    pub fn set_position(&mut self, v: VertexId, pos: Point3<f64>) {
        let old = self.vertex(v).position;
        self.point_index.remove(&old, v.index());
        self.point_index.insert(pos, v.index());
        self.vertex_mut(v).position = pos;
        for he in self.vertex_outgoing(v) {
            let f = self.face_of(he);
            self.refresh_normal(f);
        }
    }

    // ==================== Topology Queries ====================

    /// Get the twin (opposite) half-edge. Invalid on the boundary.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.halfedge(he).twin
    }

    /// Get the next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.halfedge(he).next
    }

    /// Get the previous half-edge around the face.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.halfedge(he).prev
    }

    /// Get the origin vertex of a half-edge.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId) -> VertexId {
        self.halfedge(he).origin
    }

    /// Get the destination vertex of a half-edge.
    #[inline]
    pub fn dest(&self, he: HalfEdgeId) -> VertexId {
        self.origin(self.next(he))
    }

    /// Get the vertex of the half-edge's face that is not on the half-edge.
    #[inline]
    pub fn apex(&self, he: HalfEdgeId) -> VertexId {
        self.origin(self.prev(he))
    }

    /// Get the face of a half-edge.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId) -> FaceId {
        self.halfedge(he).face
    }

    /// Check if a half-edge is on the boundary (has no twin).
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId) -> bool {
        !self.twin(he).is_valid()
    }

    /// Check if a vertex touches the boundary or is isolated.
    pub fn is_boundary_vertex(&self, v: VertexId) -> bool {
        let outgoing = self.vertex_outgoing(v);
        if outgoing.is_empty() {
            return true;
        }
        outgoing
            .iter()
            .any(|&he| self.is_boundary_halfedge(he) || self.is_boundary_halfedge(self.prev(he)))
    }

    // ==================== Iteration ====================

    /// Iterate over all live vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.removed)
            .map(|(i, _)| VertexId::new(i))
    }

    /// Iterate over all live vertices with their IDs.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.removed)
            .map(|(i, v)| (VertexId::new(i), v))
    }

    /// Iterate over all live half-edge IDs.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId> + '_ {
        self.halfedges
            .iter()
            .enumerate()
            .filter(|(_, he)| !he.removed)
            .map(|(i, _)| HalfEdgeId::new(i))
    }

    /// Iterate over all live faces IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.removed)
            .map(|(i, _)| FaceId::new(i))
    }

    /// One half-edge per undirected edge: interior edges once, boundary
    /// half-edges always.
    pub fn edge_ids(&self) -> impl Iterator<Item = HalfEdgeId> + '_ {
        self.halfedge_ids().filter(move |&he| {
            let t = self.twin(he);
            !t.is_valid() || he < t
        })
    }

    /// Half-edges without a twin.
    pub fn boundary_halfedges(&self) -> Vec<HalfEdgeId> {
        self.halfedge_ids().filter(|&he| self.is_boundary_halfedge(he)).collect()
    }

    /// The three half-edges of a face, starting at its stored half-edge.
    pub fn face_halfedges(&self, f: FaceId) -> [HalfEdgeId; 3] {
        let h0 = self.face(f).halfedge;
        let h1 = self.next(h0);
        let h2 = self.next(h1);
        [h0, h1, h2]
    }

    /// The three vertices of a face in winding order.
    pub fn face_triangle(&self, f: FaceId) -> [VertexId; 3] {
        self.face_halfedges(f).map(|he| self.origin(he))
    }

    /// The positions of the three vertices of a face.
    pub fn face_positions(&self, f: FaceId) -> [Point3<f64>; 3] {
        self.face_triangle(f).map(|v| *self.position(v))
    }

    /// The xy positions of the three vertices of a face.
    pub fn face_positions2(&self, f: FaceId) -> [Point2<f64>; 3] {
        self.face_triangle(f).map(|v| self.position2(v))
    }

    /// Outgoing half-edges of a vertex in counter-clockwise order.
    ///
    /// For a boundary vertex the fan starts at the clockwise-most boundary
    /// half-edge.
    pub fn vertex_outgoing(&self, v: VertexId) -> Vec<HalfEdgeId> {
        let start = self.vertex(v).halfedge;
        if !self.contains_halfedge(start) {
            return Vec::new();
        }

        let limit = self.halfedges.len();
        let mut ccw = vec![start];
        let mut he = start;
        loop {
            let t = self.twin(self.prev(he));
            if !t.is_valid() {
                break;
            }
            if t == start || ccw.len() > limit {
                return ccw;
            }
            ccw.push(t);
            he = t;
        }

        // Open fan: sweep clockwise from the start to reach the other boundary.
        let mut cw = Vec::new();
        he = start;
        loop {
            let t = self.twin(he);
            if !t.is_valid() || cw.len() > limit {
                break;
            }
            let n = self.next(t);
            if n == start {
                break;
            }
            cw.push(n);
            he = n;
        }

        cw.reverse();
        cw.extend(ccw);
        cw
    }

    /// Vertices adjacent to a vertex.
    pub fn vertex_neighbors(&self, v: VertexId) -> Vec<VertexId> {
        let outgoing = self.vertex_outgoing(v);
        let mut neighbors: Vec<VertexId> = outgoing.iter().map(|&he| self.dest(he)).collect();
        // The last incoming boundary edge of an open fan has no outgoing partner.
        if let Some(&last) = outgoing.last() {
            if self.is_boundary_halfedge(self.prev(last)) {
                neighbors.push(self.apex(last));
            }
        }
        neighbors
    }

    /// Faces adjacent to a vertex.
    pub fn vertex_faces(&self, v: VertexId) -> Vec<FaceId> {
        self.vertex_outgoing(v).into_iter().map(|he| self.face_of(he)).collect()
    }

    /// Find the half-edge running from `a` to `b`.
    pub fn find_halfedge(&self, a: VertexId, b: VertexId) -> Option<HalfEdgeId> {
        self.vertex_outgoing(a).into_iter().find(|&he| self.dest(he) == b)
    }

    /// Find a half-edge joining `a` and `b` in either direction.
    pub fn find_edge(&self, a: VertexId, b: VertexId) -> Option<HalfEdgeId> {
        self.find_halfedge(a, b).or_else(|| self.find_halfedge(b, a))
    }

    // ==================== Geometry ====================

    /// Get the stored unit normal of a face.
    #[inline]
    pub fn face_normal(&self, f: FaceId) -> Vector3<f64> {
        self.face(f).normal
    }

    /// Compute the area of a face.
    pub fn face_area(&self, f: FaceId) -> f64 {
        let [p0, p1, p2] = self.face_positions(f);
        0.5 * (p1 - p0).cross(&(p2 - p0)).norm()
    }

    /// Compute the centroid of a face.
    pub fn face_centroid(&self, f: FaceId) -> Point3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        Point3::from((p0.coords + p1.coords + p2.coords) / 3.0)
    }

    /// Compute the length of an edge.
    pub fn edge_length(&self, he: HalfEdgeId) -> f64 {
        (self.position(self.dest(he)) - self.position(self.origin(he))).norm()
    }

    /// Compute the bounding box of the live vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut iter = self.vertices().map(|(_, v)| v.position);
        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for p in iter {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Some((min, max))
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    pub(crate) fn refresh_normal(&mut self, f: FaceId) {
        let [p0, p1, p2] = self.face_positions(f);
        self.face_mut(f).normal = triangle_normal(&p0, &p1, &p2);
    }

    // ==================== Construction ====================

    /// Add a new vertex and return its ID. No duplicate check is made.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::new(position));
        self.point_index.insert(position, id.index());
        self.live_vertices += 1;
        id
    }

    /// Find a live vertex within tolerance of `position`.
    pub fn find_vertex(&self, position: &Point3<f64>) -> Option<VertexId> {
        self.point_index.find(position).map(VertexId::new)
    }

    /// Reuse the vertex at `position` or create one.
    pub fn find_or_add_vertex(&mut self, position: Point3<f64>) -> VertexId {
        match self.find_vertex(&position) {
            Some(v) => v,
            None => self.add_vertex(position),
        }
    }

    /// Add a triangle from three positions, reusing existing vertices.
    ///
    /// The new half-edges are not linked to any twins; see
    /// [`connect_opposite_edges`](Self::connect_opposite_edges).
    pub fn add_triangle(
        &mut self,
        p1: Point3<f64>,
        p2: Point3<f64>,
        p3: Point3<f64>,
    ) -> Result<FaceId> {
        if approx_eq3(&p1, &p2) || approx_eq3(&p2, &p3) || approx_eq3(&p1, &p3) {
            return Err(GeometryError::DegenerateFace { face: self.faces.len() });
        }
        let v0 = self.find_or_add_vertex(p1);
        let v1 = self.find_or_add_vertex(p2);
        let v2 = self.find_or_add_vertex(p3);
        Ok(self.add_triangle_by_ids(v0, v1, v2))
    }

    /// Add a triangle over existing vertices, in the given winding.
    pub fn add_triangle_by_ids(&mut self, v0: VertexId, v1: VertexId, v2: VertexId) -> FaceId {
        debug_assert!(v0 != v1 && v1 != v2 && v0 != v2, "triangle repeats a vertex");

        let f = FaceId::new(self.faces.len());
        let base = self.halfedges.len();
        let ids = [
            HalfEdgeId::new(base),
            HalfEdgeId::new(base + 1),
            HalfEdgeId::new(base + 2),
        ];

        for (i, &v) in [v0, v1, v2].iter().enumerate() {
            let mut he = HalfEdge::new(v);
            he.next = ids[(i + 1) % 3];
            he.prev = ids[(i + 2) % 3];
            he.face = f;
            self.halfedges.push(he);

            if !self.contains_halfedge(self.vertex(v).halfedge) {
                self.vertex_mut(v).halfedge = ids[i];
            }
        }

        let normal = triangle_normal(self.position(v0), self.position(v1), self.position(v2));
        self.faces.push(Face {
            halfedge: ids[0],
            normal,
            removed: false,
        });

        self.live_halfedges += 3;
        self.live_faces += 1;
        f
    }

    pub(crate) fn alloc_halfedge(&mut self, origin: VertexId) -> HalfEdgeId {
        let id = HalfEdgeId::new(self.halfedges.len());
        self.halfedges.push(HalfEdge::new(origin));
        self.live_halfedges += 1;
        id
    }

    pub(crate) fn alloc_face(&mut self) -> FaceId {
        let id = FaceId::new(self.faces.len());
        self.faces.push(Face {
            halfedge: HalfEdgeId::invalid(),
            normal: Vector3::zeros(),
            removed: false,
        });
        self.live_faces += 1;
        id
    }

    /// Wire three half-edges into a face loop and refresh its normal.
    pub(crate) fn link_face(&mut self, f: FaceId, hes: [HalfEdgeId; 3]) {
        for i in 0..3 {
            let he = self.halfedge_mut(hes[i]);
            he.next = hes[(i + 1) % 3];
            he.prev = hes[(i + 2) % 3];
            he.face = f;
        }
        self.face_mut(f).halfedge = hes[0];
        self.refresh_normal(f);
    }

    /// Make two half-edges twins of each other.
    pub(crate) fn link_twins(&mut self, a: HalfEdgeId, b: HalfEdgeId) {
        self.halfedge_mut(a).twin = b;
        if b.is_valid() {
            self.halfedge_mut(b).twin = a;
        }
    }

    // ==================== Removal ====================

    /// Remove a face and its three half-edges.
    ///
    /// Neighbouring half-edges lose their twin and become boundary edges.
    /// Vertices are kept even if the face was their last one; call
    /// [`compact`](Self::compact) to drop them.
    pub fn remove_face(&mut self, f: FaceId) -> Result<()> {
        if !self.contains_face(f) {
            return Err(GeometryError::invalid_param("face", format!("{f:?}"), "face is not live"));
        }

        let hes = self.face_halfedges(f);

        // Re-point vertices at a surviving outgoing half-edge before unlinking.
        for &he in &hes {
            let v = self.origin(he);
            if self.vertex(v).halfedge != he {
                continue;
            }
            let across = self.twin(he);
            let before = self.twin(self.prev(he));
            let replacement = if across.is_valid() {
                self.next(across)
            } else if before.is_valid() {
                before
            } else {
                HalfEdgeId::invalid()
            };
            self.vertex_mut(v).halfedge = replacement;
        }

        for &he in &hes {
            let t = self.twin(he);
            if t.is_valid() {
                self.halfedge_mut(t).twin = HalfEdgeId::invalid();
            }
            self.halfedge_mut(he).removed = true;
        }
        self.face_mut(f).removed = true;

        self.live_halfedges -= 3;
        self.live_faces -= 1;
        Ok(())
    }

    pub(crate) fn remove_vertex_slot(&mut self, v: VertexId) {
        if self.contains_vertex(v) {
            let pos = self.vertex(v).position;
            self.point_index.remove(&pos, v.index());
            let vertex = self.vertex_mut(v);
            vertex.removed = true;
            vertex.halfedge = HalfEdgeId::invalid();
            self.live_vertices -= 1;
        }
    }

    /// Apply a transform to every vertex position.
    pub fn transform_positions<F>(&mut self, mut transform: F)
    where
        F: FnMut(&Point3<f64>) -> Point3<f64>,
    {
        for v in self.vertices.iter_mut().filter(|v| !v.removed) {
            v.position = transform(&v.position);
        }
        self.rebuild_point_index();
        for f in self.face_ids().collect::<Vec<_>>() {
            self.refresh_normal(f);
        }
    }

    fn rebuild_point_index(&mut self) {
        self.point_index.clear();
        for (i, v) in self.vertices.iter().enumerate() {
            if !v.removed {
                self.point_index.insert(v.position, i);
            }
        }
    }

    /// Renumber live elements densely and drop vertices no face uses.
    ///
    /// Every handle obtained before the call is invalidated.
    pub fn compact(&mut self) {
        let mut used = vec![false; self.vertices.len()];
        for he in self.halfedges.iter().filter(|he| !he.removed) {
            used[he.origin.index()] = true;
        }

        let mut vertex_map = vec![VertexId::invalid(); self.vertices.len()];
        let mut vertices = Vec::with_capacity(self.live_vertices);
        for (i, v) in self.vertices.iter().enumerate() {
            if !v.removed && used[i] {
                vertex_map[i] = VertexId::new(vertices.len());
                vertices.push(Vertex::new(v.position));
            }
        }

        let mut he_map = vec![HalfEdgeId::invalid(); self.halfedges.len()];
        let mut next_he = 0;
        for (i, he) in self.halfedges.iter().enumerate() {
            if !he.removed {
                he_map[i] = HalfEdgeId::new(next_he);
                next_he += 1;
            }
        }

        let mut face_map = vec![FaceId::invalid(); self.faces.len()];
        let mut faces = Vec::with_capacity(self.live_faces);
        for (i, f) in self.faces.iter().enumerate() {
            if !f.removed {
                face_map[i] = FaceId::new(faces.len());
                faces.push(Face {
                    halfedge: he_map[f.halfedge.index()],
                    normal: f.normal,
                    removed: false,
                });
            }
        }

        let remap_he = |h: HalfEdgeId| if h.is_valid() { he_map[h.index()] } else { h };
        let mut halfedges = Vec::with_capacity(next_he);
        for he in self.halfedges.iter().filter(|he| !he.removed) {
            halfedges.push(HalfEdge {
                origin: vertex_map[he.origin.index()],
                twin: remap_he(he.twin),
                next: remap_he(he.next),
                prev: remap_he(he.prev),
                face: face_map[he.face.index()],
                removed: false,
            });
        }

        // Prefer the vertex's previous outgoing half-edge, else the first found.
        for (i, v) in self.vertices.iter().enumerate() {
            let new_v = vertex_map[i];
            if new_v.is_valid()
                && self.contains_halfedge(v.halfedge)
                && self.halfedges[v.halfedge.index()].origin.index() == i
            {
                vertices[new_v.index()].halfedge = he_map[v.halfedge.index()];
            }
        }
        for (i, he) in halfedges.iter().enumerate() {
            let v = &mut vertices[he.origin.index()];
            if !v.halfedge.is_valid() {
                v.halfedge = HalfEdgeId::new(i);
            }
        }

        self.live_vertices = vertices.len();
        self.live_halfedges = halfedges.len();
        self.live_faces = faces.len();
        self.vertices = vertices;
        self.halfedges = halfedges;
        self.faces = faces;
        self.rebuild_point_index();
    }

    // ==================== Validation ====================

    /// Check every structural invariant of the mesh.
    ///
    /// A failure is an [`GeometryError::InvariantViolation`]: it means an
    /// algorithm in this crate left the mesh inconsistent.
    pub fn validate(&self) -> Result<()> {
        for (vid, v) in self.vertices() {
            if v.halfedge.is_valid() {
                if !self.contains_halfedge(v.halfedge) {
                    return Err(GeometryError::invariant(format!(
                        "{vid:?} points at a removed half-edge"
                    )));
                }
                if self.origin(v.halfedge) != vid {
                    return Err(GeometryError::invariant(format!(
                        "{vid:?} points at {:?}, which starts elsewhere",
                        v.halfedge
                    )));
                }
            }
        }

        let mut directed: HashSet<(VertexId, VertexId)> =
            HashSet::with_capacity(self.live_halfedges);
        for he in self.halfedge_ids() {
            let h = self.halfedge(he);
            if !self.contains_vertex(h.origin) {
                return Err(GeometryError::invariant(format!("{he:?} starts at a removed vertex")));
            }
            if !self.contains_halfedge(h.next) || !self.contains_halfedge(h.prev) {
                return Err(GeometryError::invariant(format!(
                    "{he:?} links to a removed half-edge"
                )));
            }
            if self.prev(h.next) != he || self.next(h.prev) != he {
                return Err(GeometryError::invariant(format!("{he:?} next/prev disagree")));
            }
            if self.next(self.next(h.next)) != he {
                return Err(GeometryError::invariant(format!("{he:?} is not on a triangle loop")));
            }
            if !self.contains_face(h.face)
                || self.face_of(h.next) != h.face
                || self.face_of(h.prev) != h.face
            {
                return Err(GeometryError::invariant(format!("{he:?} face loop is inconsistent")));
            }

            if h.twin.is_valid() {
                if !self.contains_halfedge(h.twin) || self.twin(h.twin) != he {
                    return Err(GeometryError::invariant(format!("{he:?} twin is not reciprocal")));
                }
                if self.origin(h.twin) != self.dest(he) || self.dest(h.twin) != h.origin {
                    return Err(GeometryError::invariant(format!(
                        "{he:?} twin runs between other vertices"
                    )));
                }
            }

            let key = (h.origin, self.dest(he));
            if key.0 == key.1 {
                return Err(GeometryError::invariant(format!("{he:?} is a loop on {:?}", key.0)));
            }
            if !directed.insert(key) {
                return Err(GeometryError::invariant(format!(
                    "duplicate directed edge {:?} -> {:?}",
                    key.0, key.1
                )));
            }
        }

        for f in self.face_ids() {
            let he = self.face(f).halfedge;
            if !self.contains_halfedge(he) || self.face_of(he) != f {
                return Err(GeometryError::invariant(format!("{f:?} does not own its half-edge")));
            }
        }

        Ok(())
    }

    /// Check if the mesh is valid (all connectivity is consistent).
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
