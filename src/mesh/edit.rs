//! Local topology edits on a [`HalfEdgeMesh`].
//!
//! Every operation checks its preconditions before touching the mesh, so a
//! returned error always leaves the mesh exactly as it was.
//!
//! Flips and splits read vertex positions in the xy plane; they are meant for
//! planar triangulations.

use std::collections::{HashMap, HashSet};

use nalgebra::Point2;

use super::halfedge::HalfEdgeMesh;
use super::index::{FaceId, HalfEdgeId, VertexId};
use crate::error::{GeometryError, Result};
use crate::geometry::predicates::{exact_orientation, is_convex_quad, orientation, Orientation};
use crate::geometry::{approx_eq3, lift};

type SideTest = fn(&Point2<f64>, &Point2<f64>, &Point2<f64>) -> Orientation;

/// How [`HalfEdgeMesh::connect_opposite_edges`] finds twins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectPolicy {
    /// Hash lookup on `(origin, dest)` vertex ids. Assumes a manifold mesh
    /// whose shared vertices are already shared by id.
    #[default]
    Fast,
    /// Positional matching of every unpaired half-edge against every other.
    /// Merges coincident vertices of matched pairs and logs what it could not
    /// pair.
    Safe,
}

/// Outcome of connecting opposite half-edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectReport {
    /// Number of twin pairs linked.
    pub paired: usize,
    /// Half-edges left without a twin because no partner exists.
    pub unpaired: usize,
    /// Half-edges left without a twin because several partners matched.
    pub ambiguous: usize,
    /// Vertices merged into a coincident vertex (`Safe` only).
    pub merged_vertices: usize,
}

impl HalfEdgeMesh {
    /// Link every boundary half-edge with its opposite on a neighbouring face.
    pub fn connect_opposite_edges(&mut self, policy: ConnectPolicy) -> Result<ConnectReport> {
        let report = match policy {
            ConnectPolicy::Fast => self.connect_by_ids(),
            ConnectPolicy::Safe => self.connect_by_position()?,
        };
        log::debug!(
            "connected edges ({policy:?}): {} paired, {} unpaired, {} ambiguous, {} merged",
            report.paired,
            report.unpaired,
            report.ambiguous,
            report.merged_vertices
        );
        Ok(report)
    }

    fn connect_by_ids(&mut self) -> ConnectReport {
        let boundary = self.boundary_halfedges();
        let mut by_pair: HashMap<(VertexId, VertexId), Vec<HalfEdgeId>> =
            HashMap::with_capacity(boundary.len());
        for &he in &boundary {
            by_pair.entry((self.origin(he), self.dest(he))).or_default().push(he);
        }

        let mut report = ConnectReport::default();
        for &he in &boundary {
            if self.twin(he).is_valid() {
                continue;
            }
            let (a, b) = (self.origin(he), self.dest(he));
            let same = by_pair.get(&(a, b)).map_or(0, Vec::len);
            match by_pair.get(&(b, a)).map(Vec::as_slice) {
                Some(&[opposite]) if same == 1 => {
                    self.link_twins(he, opposite);
                    report.paired += 1;
                }
                Some(_) => report.ambiguous += 1,
                None => report.unpaired += 1,
            }
        }
        report
    }

    fn connect_by_position(&mut self) -> Result<ConnectReport> {
        let boundary = self.boundary_halfedges();
        let mut report = ConnectReport::default();

        for (i, &he) in boundary.iter().enumerate() {
            if self.twin(he).is_valid() {
                continue;
            }
            let a = *self.position(self.origin(he));
            let b = *self.position(self.dest(he));

            let candidates: Vec<HalfEdgeId> = boundary
                .iter()
                .enumerate()
                .filter(|&(j, &other)| {
                    j != i
                        && !self.twin(other).is_valid()
                        && self.face_of(other) != self.face_of(he)
                        && approx_eq3(self.position(self.origin(other)), &b)
                        && approx_eq3(self.position(self.dest(other)), &a)
                })
                .map(|(_, &other)| other)
                .collect();

            match candidates.as_slice() {
                [] => {
                    report.unpaired += 1;
                    log::warn!("{he:?} ({a} -> {b}) has no opposite half-edge");
                }
                &[opposite] => {
                    let merged = self.unify_endpoints(he, opposite)?;
                    match merged {
                        Some(count) => {
                            self.link_twins(he, opposite);
                            report.paired += 1;
                            report.merged_vertices += count;
                        }
                        None => {
                            report.ambiguous += 1;
                            log::warn!(
                                "{he:?} matches {opposite:?} but their vertices cannot be merged"
                            );
                        }
                    }
                }
                many => {
                    report.ambiguous += 1;
                    log::warn!(
                        "{he:?} ({a} -> {b}) matches {} half-edges; left unpaired",
                        many.len()
                    );
                }
            }
        }
        Ok(report)
    }

    /// Make `he` and `opposite` share their endpoint vertices.
    ///
    /// Returns the number of merges, or `None` if a needed merge is illegal.
    fn unify_endpoints(&mut self, he: HalfEdgeId, opposite: HalfEdgeId) -> Result<Option<usize>> {
        let mut merged = 0;
        for (keep, remove) in [
            (self.dest(he), self.origin(opposite)),
            (self.origin(he), self.dest(opposite)),
        ] {
            if keep == remove {
                continue;
            }
            match self.merge_vertices(keep, remove) {
                Ok(()) => merged += 1,
                Err(GeometryError::InvalidParameter { .. })
                | Err(GeometryError::DegenerateFace { .. }) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
        Ok(Some(merged))
    }

    /// Replace the diagonal of the quad formed by the two faces of `he`.
    ///
    /// With `he` running `a -> b` in `(a, b, c)` and its twin in `(b, a, d)`,
    /// the faces become `(d, c, a)` and `(c, d, b)`. No elements are
    /// allocated: the returned `(he, twin)` now run `d -> c` and `c -> d`.
    ///
    /// Fails with [`GeometryError::NotFlippable`] on a boundary edge, when the
    /// quad is not strictly convex, or when `c` and `d` are already joined.
    pub fn flip_edge(&mut self, he: HalfEdgeId) -> Result<(HalfEdgeId, HalfEdgeId)> {
        let not_flippable = |reason| GeometryError::NotFlippable { halfedge: he, reason };

        if !self.contains_halfedge(he) {
            return Err(not_flippable("half-edge is not live"));
        }
        let t = self.twin(he);
        if !t.is_valid() {
            return Err(not_flippable("edge is on the boundary"));
        }

        let he_n = self.next(he);
        let he_p = self.prev(he);
        let t_n = self.next(t);
        let t_p = self.prev(t);

        let a = self.origin(he);
        let b = self.origin(t);
        let c = self.origin(he_p);
        let d = self.origin(t_p);

        let [pa, pb, pc, pd] = [a, b, c, d].map(|v| self.position2(v));
        if !is_convex_quad(&pa, &pd, &pb, &pc) {
            return Err(not_flippable("quad is not strictly convex"));
        }
        if c == d || self.find_edge(c, d).is_some() {
            return Err(not_flippable("flipped diagonal already exists"));
        }

        let f1 = self.face_of(he);
        let f2 = self.face_of(t);

        self.halfedge_mut(he).origin = d;
        self.halfedge_mut(t).origin = c;
        self.link_face(f1, [he, he_p, t_n]);
        self.link_face(f2, [t, t_p, he_n]);

        if self.vertex(a).halfedge == he {
            self.vertex_mut(a).halfedge = t_n;
        }
        if self.vertex(b).halfedge == t {
            self.vertex_mut(b).halfedge = he_n;
        }

        Ok((he, t))
    }

    /// Whether [`flip_edge`](Self::flip_edge) would succeed on `he`.
    pub fn is_flippable(&self, he: HalfEdgeId) -> bool {
        let t = self.twin(he);
        if !t.is_valid() {
            return false;
        }
        let a = self.origin(he);
        let b = self.origin(t);
        let c = self.apex(he);
        let d = self.apex(t);
        let [pa, pb, pc, pd] = [a, b, c, d].map(|v| self.position2(v));
        is_convex_quad(&pa, &pd, &pb, &pc) && self.find_edge(c, d).is_none()
    }

    /// Split a face into three by connecting `p` to its corners.
    ///
    /// `p` must lie strictly inside the face. The original face id is reused
    /// for the first of the three faces.
    pub fn split_face_at_point(&mut self, f: FaceId, p: Point2<f64>) -> Result<[FaceId; 3]> {
        self.insert_in_face(f, p).map(|(_, faces)| faces)
    }

    /// Split a face at `p`, returning the new vertex and the three faces.
    pub(crate) fn insert_in_face(
        &mut self,
        f: FaceId,
        p: Point2<f64>,
    ) -> Result<(VertexId, [FaceId; 3])> {
        self.insert_in_face_with(f, p, orientation)
    }

    /// Like [`insert_in_face`](Self::insert_in_face), but `p` only has to be
    /// inside the face by the untoleranced sign test.
    pub(crate) fn insert_in_face_exact(
        &mut self,
        f: FaceId,
        p: Point2<f64>,
    ) -> Result<(VertexId, [FaceId; 3])> {
        self.insert_in_face_with(f, p, exact_orientation)
    }

    fn insert_in_face_with(
        &mut self,
        f: FaceId,
        p: Point2<f64>,
        side: SideTest,
    ) -> Result<(VertexId, [FaceId; 3])> {
        if !self.contains_face(f) {
            return Err(GeometryError::invalid_param(
                "face",
                format!("{f:?}"),
                "face is not live",
            ));
        }
        let [a, b, c] = self.face_positions2(f);
        let strictly_inside = [(a, b), (b, c), (c, a)]
            .iter()
            .all(|(u, w)| side(u, w, &p) == Orientation::Left);
        if !strictly_inside {
            return Err(GeometryError::degenerate(format!(
                "point ({}, {}) is not strictly inside {f:?}",
                p.x, p.y
            )));
        }

        let [h0, h1, h2] = self.face_halfedges(f);
        let (va, vb, vc) = (self.origin(h0), self.origin(h1), self.origin(h2));
        let v = self.add_vertex(lift(&p));

        let e0 = self.alloc_halfedge(vb);
        let e1 = self.alloc_halfedge(v);
        let e2 = self.alloc_halfedge(vc);
        let e3 = self.alloc_halfedge(v);
        let e4 = self.alloc_halfedge(va);
        let e5 = self.alloc_halfedge(v);

        let f1 = self.alloc_face();
        let f2 = self.alloc_face();

        self.link_face(f, [h0, e0, e1]);
        self.link_face(f1, [h1, e2, e3]);
        self.link_face(f2, [h2, e4, e5]);

        self.link_twins(e0, e3);
        self.link_twins(e2, e5);
        self.link_twins(e1, e4);

        self.vertex_mut(v).halfedge = e1;
        Ok((v, [f, f1, f2]))
    }

    /// Split the edge of `he` at `p`, splitting the face on each side in two.
    ///
    /// Returns the two faces on the side of `he`, followed by the two on the
    /// side of its twin when the edge is interior.
    pub fn split_edge_at_point(&mut self, he: HalfEdgeId, p: Point2<f64>) -> Result<Vec<FaceId>> {
        self.insert_on_edge(he, p).map(|(_, faces)| faces)
    }

    /// Split an edge at `p`, returning the new vertex and the resulting faces.
    pub(crate) fn insert_on_edge(
        &mut self,
        he: HalfEdgeId,
        p: Point2<f64>,
    ) -> Result<(VertexId, Vec<FaceId>)> {
        self.insert_on_edge_with(he, p, orientation)
    }

    /// Like [`insert_on_edge`](Self::insert_on_edge), but the split faces only
    /// have to keep a positive area by the untoleranced sign test. `p` may lie
    /// slightly off the edge on either side.
    pub(crate) fn insert_on_edge_exact(
        &mut self,
        he: HalfEdgeId,
        p: Point2<f64>,
    ) -> Result<(VertexId, Vec<FaceId>)> {
        self.insert_on_edge_with(he, p, exact_orientation)
    }

    fn insert_on_edge_with(
        &mut self,
        he: HalfEdgeId,
        p: Point2<f64>,
        side: SideTest,
    ) -> Result<(VertexId, Vec<FaceId>)> {
        if !self.contains_halfedge(he) {
            return Err(GeometryError::invalid_param(
                "halfedge",
                format!("{he:?}"),
                "half-edge is not live",
            ));
        }

        let t = self.twin(he);
        let (h1, h2) = (self.next(he), self.prev(he));
        let a = self.origin(he);
        let b = self.origin(h1);
        let c = self.origin(h2);

        let left = |u: VertexId, w: VertexId| {
            side(&self.position2(u), &self.position2(w), &p) == Orientation::Left
        };
        // Both halves of each split face must keep a positive area.
        let mut valid = left(c, a) && left(b, c);
        if t.is_valid() {
            let d = self.apex(t);
            valid &= left(a, d) && left(d, b);
        }
        if !valid {
            return Err(GeometryError::degenerate(format!(
                "point ({}, {}) does not split {he:?} cleanly",
                p.x, p.y
            )));
        }

        let v = self.add_vertex(lift(&p));
        let f1 = self.face_of(he);

        // (a, v, c) and (v, b, c)
        let e0 = self.alloc_halfedge(v);
        let e1 = self.alloc_halfedge(v);
        let e2 = self.alloc_halfedge(c);
        let g1 = self.alloc_face();
        self.link_face(f1, [he, e0, h2]);
        self.link_face(g1, [e1, h1, e2]);
        self.link_twins(e0, e2);
        self.vertex_mut(v).halfedge = e1;

        let mut faces = vec![f1, g1];

        if t.is_valid() {
            let (t_n, t_p) = (self.next(t), self.prev(t));
            let d = self.origin(t_p);
            let f2 = self.face_of(t);

            // (b, v, d) and (v, a, d)
            let e3 = self.alloc_halfedge(v);
            let e4 = self.alloc_halfedge(v);
            let e5 = self.alloc_halfedge(d);
            let g2 = self.alloc_face();
            self.link_face(f2, [t, e3, t_p]);
            self.link_face(g2, [e4, t_n, e5]);
            self.link_twins(e3, e5);

            self.link_twins(he, e4);
            self.link_twins(t, e1);
            faces.extend([f2, g2]);
        }

        Ok((v, faces))
    }

    /// Merge vertex `remove` into `keep`.
    ///
    /// Every half-edge leaving `remove` is re-homed to `keep`, and `remove` is
    /// deleted. `keep` stays where it is. Fails without changes if a face
    /// contains both vertices or the merge would duplicate a directed edge.
    pub fn merge_vertices(&mut self, keep: VertexId, remove: VertexId) -> Result<()> {
        if keep == remove {
            return Ok(());
        }
        if !self.contains_vertex(keep) || !self.contains_vertex(remove) {
            return Err(GeometryError::invalid_param(
                "vertex",
                format!("{keep:?}/{remove:?}"),
                "vertex is not live",
            ));
        }

        let substitute = |v: VertexId| if v == remove { keep } else { v };
        let mut directed = HashSet::with_capacity(self.num_halfedges());
        let mut moved = Vec::new();
        for he in self.halfedge_ids() {
            let tri = self.face_triangle(self.face_of(he));
            if tri.contains(&keep) && tri.contains(&remove) {
                return Err(GeometryError::DegenerateFace {
                    face: self.face_of(he).index(),
                });
            }
            if !directed.insert((substitute(self.origin(he)), substitute(self.dest(he)))) {
                return Err(GeometryError::invalid_param(
                    "remove",
                    format!("{remove:?}"),
                    "merging would duplicate an edge",
                ));
            }
            if self.origin(he) == remove {
                moved.push(he);
            }
        }

        for &he in &moved {
            self.halfedge_mut(he).origin = keep;
        }
        if !self.contains_halfedge(self.vertex(keep).halfedge) {
            if let Some(&he) = moved.first() {
                self.vertex_mut(keep).halfedge = he;
            }
        }
        self.remove_vertex_slot(remove);

        for he in moved {
            let f = self.face_of(he);
            self.refresh_normal(f);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    /// Unit square split along the (0,0)-(1,1) diagonal.
    fn square() -> HalfEdgeMesh {
        let mut mesh = HalfEdgeMesh::new();
        let v0 = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let v1 = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let v2 = mesh.add_vertex(Point3::new(1.0, 1.0, 0.0));
        let v3 = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        mesh.add_triangle_by_ids(v0, v1, v2);
        mesh.add_triangle_by_ids(v0, v2, v3);
        mesh.connect_opposite_edges(ConnectPolicy::Fast).unwrap();
        mesh
    }

    fn diagonal(mesh: &HalfEdgeMesh) -> HalfEdgeId {
        mesh.halfedge_ids().find(|&he| !mesh.is_boundary_halfedge(he)).unwrap()
    }

    #[test]
    fn test_connect_fast() {
        let mesh = square();
        assert_eq!(mesh.boundary_halfedges().len(), 4);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_connect_safe_merges_coincident_vertices() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        // A second copy of a and b for the lower triangle.
        let a2 = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b2 = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let d = mesh.add_vertex(Point3::new(0.0, -1.0, 0.0));
        mesh.add_triangle_by_ids(a, b, c);
        mesh.add_triangle_by_ids(b2, a2, d);

        let fast = mesh.clone().connect_opposite_edges(ConnectPolicy::Fast).unwrap();
        assert_eq!(fast.paired, 0);

        let report = mesh.connect_opposite_edges(ConnectPolicy::Safe).unwrap();
        assert_eq!(report.paired, 1);
        assert_eq!(report.merged_vertices, 2);
        assert_eq!(mesh.num_vertices(), 4);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_flip_edge() {
        let mut mesh = square();
        let he = diagonal(&mesh);
        let (h, t) = mesh.flip_edge(he).unwrap();

        let mut ends = [mesh.origin(h).index(), mesh.dest(h).index()];
        ends.sort();
        assert_eq!(ends, [1, 3]);
        assert_eq!(mesh.twin(h), t);
        assert!(mesh.is_valid());
        for f in mesh.face_ids() {
            let [a, b, c] = mesh.face_positions2(f);
            assert_eq!(orientation(&a, &b, &c), Orientation::Left);
        }
    }

    #[test]
    fn test_flip_boundary_edge_fails() {
        let mut mesh = square();
        let boundary = mesh.boundary_halfedges()[0];
        let result = mesh.flip_edge(boundary);
        assert!(matches!(result, Err(GeometryError::NotFlippable { .. })));
    }

    #[test]
    fn test_flip_nonconvex_fails() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point3::new(-0.5, 0.1, 0.0));
        let d = mesh.add_vertex(Point3::new(0.5, -1.0, 0.0));
        mesh.add_triangle_by_ids(a, b, c);
        mesh.add_triangle_by_ids(b, a, d);
        mesh.connect_opposite_edges(ConnectPolicy::Fast).unwrap();

        // Reflex at a
        let he = diagonal(&mesh);
        assert!(!mesh.is_flippable(he));
        assert!(matches!(mesh.flip_edge(he), Err(GeometryError::NotFlippable { .. })));
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_split_face() {
        let mut mesh = square();
        let f = mesh.face_ids().next().unwrap();
        let faces = mesh.split_face_at_point(f, Point2::new(0.7, 0.3)).unwrap();
        assert_eq!(faces.len(), 3);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_vertices(), 5);
        assert!(mesh.is_valid());

        let err = mesh.split_face_at_point(faces[0], Point2::new(5.0, 5.0));
        assert!(err.is_err());
        assert_eq!(mesh.num_faces(), 4);
    }

    #[test]
    fn test_split_interior_edge() {
        let mut mesh = square();
        let he = diagonal(&mesh);
        let faces = mesh.split_edge_at_point(he, Point2::new(0.5, 0.5)).unwrap();
        assert_eq!(faces.len(), 4);
        assert_eq!(mesh.num_faces(), 4);
        assert!(mesh.is_valid());
        for f in mesh.face_ids() {
            assert!(mesh.face_area(f) > 0.2);
        }
    }

    #[test]
    fn test_split_boundary_edge() {
        let mut mesh = square();
        let boundary = mesh.boundary_halfedges()[0];
        let mid = nalgebra::center(
            &mesh.position2(mesh.origin(boundary)),
            &mesh.position2(mesh.dest(boundary)),
        );
        let faces = mesh.split_edge_at_point(boundary, mid).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(mesh.boundary_halfedges().len(), 5);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_exact_splits_accept_points_near_an_edge() {
        // 3e-6 from the diagonal and from nowhere else: the tolerant split
        // refuses the face, the exact one does not.
        let mut mesh = square();
        let f = mesh.face_ids().next().unwrap();
        let near = Point2::new(0.6, 0.6 - 3e-6);
        assert!(matches!(
            mesh.insert_in_face(f, near),
            Err(GeometryError::DegenerateInput { .. })
        ));
        let (v, faces) = mesh.insert_in_face_exact(f, near).unwrap();
        assert_eq!(mesh.position2(v), near);
        assert_eq!(faces.len(), 3);
        assert!(mesh.is_valid());
        for f in mesh.face_ids() {
            let [a, b, c] = mesh.face_positions2(f);
            assert_eq!(exact_orientation(&a, &b, &c), Orientation::Left);
        }

        // Off the diagonal on the far side: the edge split still works.
        let mut mesh = square();
        let he = diagonal(&mesh);
        let (v, faces) = mesh.insert_on_edge_exact(he, Point2::new(0.3, 0.3 + 2e-7)).unwrap();
        assert_eq!(faces.len(), 4);
        assert_eq!(mesh.vertex_neighbors(v).len(), 4);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_merge_vertices_rejects_shared_face() {
        let mut mesh = square();
        let err = mesh.merge_vertices(VertexId::new(0), VertexId::new(1));
        assert!(matches!(err, Err(GeometryError::DegenerateFace { .. })));
        assert!(mesh.is_valid());
    }
}
