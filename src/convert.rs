//! Conversions between point sets, triangle soups and half-edge meshes.
//!
//! Triangle soups are the hand-off format for callers that render or export
//! results: every triangle carries its own corner positions, so nothing is
//! shared. Going the other way, corners are merged by position (within
//! [`EPSILON`](crate::geometry::EPSILON)) and shared edges are paired with the
//! requested [`ConnectPolicy`].
//!
//! # Example
//!
//! ```
//! use tessel::convert::{mesh_to_triangles, triangles_to_mesh, Triangle2};
//! use tessel::mesh::ConnectPolicy;
//! use nalgebra::Point2;
//!
//! let soup = vec![
//!     Triangle2::new(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(1.0, 1.0)),
//!     Triangle2::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), Point2::new(0.0, 1.0)),
//! ];
//! let mesh = triangles_to_mesh(&soup, ConnectPolicy::Fast).unwrap();
//! assert_eq!(mesh.num_vertices(), 4);
//! assert_eq!(mesh_to_triangles(&mesh).len(), 2);
//! ```

use nalgebra::{Point2, Point3, Vector3};

use crate::error::{GeometryError, Result};
use crate::geometry::predicates::{orientation, triangle_area, Orientation};
use crate::geometry::{dedup_points2, flatten, lift, Edge2, Edge3, EPSILON};
use crate::mesh::{ConnectPolicy, HalfEdgeMesh};

/// A standalone 2D triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle2 {
    /// First corner.
    pub a: Point2<f64>,
    /// Second corner.
    pub b: Point2<f64>,
    /// Third corner.
    pub c: Point2<f64>,
}

impl Triangle2 {
    /// Create a triangle from its corners.
    pub fn new(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> Self {
        Self { a, b, c }
    }

    /// Corners in order.
    pub fn vertices(&self) -> [Point2<f64>; 3] {
        [self.a, self.b, self.c]
    }

    /// Unsigned area.
    pub fn area(&self) -> f64 {
        triangle_area(&self.a, &self.b, &self.c).abs()
    }

    /// Whether the corners wind counter-clockwise.
    pub fn is_ccw(&self) -> bool {
        orientation(&self.a, &self.b, &self.c) == Orientation::Left
    }
}

/// A standalone 3D triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle3 {
    /// First corner.
    pub a: Point3<f64>,
    /// Second corner.
    pub b: Point3<f64>,
    /// Third corner.
    pub c: Point3<f64>,
}

impl Triangle3 {
    /// Create a triangle from its corners.
    pub fn new(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Self {
        Self { a, b, c }
    }

    /// Corners in order.
    pub fn vertices(&self) -> [Point3<f64>; 3] {
        [self.a, self.b, self.c]
    }

    fn cross(&self) -> Vector3<f64> {
        (self.b - self.a).cross(&(self.c - self.a))
    }

    /// Unit normal following the right-hand rule, or zero if degenerate.
    pub fn normal(&self) -> Vector3<f64> {
        self.cross().try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
    }

    /// Area.
    pub fn area(&self) -> f64 {
        self.cross().norm() * 0.5
    }
}

/// Build a planar mesh from a 2D triangle soup.
///
/// Clockwise triangles are rewound counter-clockwise. Collinear triangles are
/// rejected with [`GeometryError::DegenerateFace`].
pub fn triangles_to_mesh(triangles: &[Triangle2], policy: ConnectPolicy) -> Result<HalfEdgeMesh> {
    let mut mesh = HalfEdgeMesh::with_capacity(triangles.len() * 3 / 2 + 2, triangles.len());
    for (i, t) in triangles.iter().enumerate() {
        let (a, b, c) = match orientation(&t.a, &t.b, &t.c) {
            Orientation::Left => (t.a, t.b, t.c),
            Orientation::Right => (t.a, t.c, t.b),
            Orientation::On => return Err(GeometryError::DegenerateFace { face: i }),
        };
        mesh.add_triangle(lift(&a), lift(&b), lift(&c))?;
    }
    finish(mesh, policy)
}

/// Build a mesh from a 3D triangle soup, keeping each triangle's winding.
pub fn triangles3_to_mesh(triangles: &[Triangle3], policy: ConnectPolicy) -> Result<HalfEdgeMesh> {
    let mut mesh = HalfEdgeMesh::with_capacity(triangles.len() * 3 / 2 + 2, triangles.len());
    for (i, t) in triangles.iter().enumerate() {
        if t.area() < EPSILON * EPSILON {
            return Err(GeometryError::DegenerateFace { face: i });
        }
        mesh.add_triangle(t.a, t.b, t.c)?;
    }
    finish(mesh, policy)
}

fn finish(mut mesh: HalfEdgeMesh, policy: ConnectPolicy) -> Result<HalfEdgeMesh> {
    if mesh.is_empty() {
        return Err(GeometryError::degenerate("triangle soup is empty"));
    }
    let report = mesh.connect_opposite_edges(policy)?;
    log::debug!(
        "triangle soup: {} faces, {} vertices, {} edges paired, {} open",
        mesh.num_faces(),
        mesh.num_vertices(),
        report.paired,
        report.unpaired
    );
    mesh.validate()?;
    Ok(mesh)
}

/// Every live face as a 2D triangle, in face order.
pub fn mesh_to_triangles(mesh: &HalfEdgeMesh) -> Vec<Triangle2> {
    mesh.face_ids()
        .map(|f| {
            let [a, b, c] = mesh.face_positions2(f);
            Triangle2::new(a, b, c)
        })
        .collect()
}

/// Every live face as a 3D triangle, in face order.
pub fn mesh_to_triangles3(mesh: &HalfEdgeMesh) -> Vec<Triangle3> {
    mesh.face_ids()
        .map(|f| {
            let [a, b, c] = mesh.face_positions(f);
            Triangle3::new(a, b, c)
        })
        .collect()
}

/// Live vertex positions projected to the xy plane, in vertex order.
pub fn mesh_points2(mesh: &HalfEdgeMesh) -> Vec<Point2<f64>> {
    mesh.vertex_ids().map(|v| mesh.position2(v)).collect()
}

/// Live vertex positions, in vertex order.
pub fn mesh_points3(mesh: &HalfEdgeMesh) -> Vec<Point3<f64>> {
    mesh.vertex_ids().map(|v| *mesh.position(v)).collect()
}

/// Distinct corners of a triangle soup, in first-seen order.
pub fn triangles_to_points(triangles: &[Triangle2]) -> Vec<Point2<f64>> {
    let corners: Vec<Point2<f64>> = triangles.iter().flat_map(Triangle2::vertices).collect();
    dedup_points2(&corners)
}

/// Place 2D points in the `z = 0` plane.
pub fn points_to_3d(points: &[Point2<f64>]) -> Vec<Point3<f64>> {
    points.iter().map(lift).collect()
}

/// Drop the z coordinate.
pub fn points_to_2d(points: &[Point3<f64>]) -> Vec<Point2<f64>> {
    points.iter().map(flatten).collect()
}

/// Edges of a closed hull boundary, from each point to the next.
pub fn hull_edges(hull: &[Point2<f64>]) -> Vec<Edge2> {
    let n = hull.len();
    if n < 2 {
        return Vec::new();
    }
    (0..n).map(|i| Edge2::new(hull[i], hull[(i + 1) % n])).collect()
}

/// One segment per undirected mesh edge.
pub fn mesh_edges(mesh: &HalfEdgeMesh) -> Vec<Edge3> {
    mesh.edge_ids()
        .map(|he| Edge3::new(*mesh.position(mesh.origin(he)), *mesh.position(mesh.dest(he))))
        .collect()
}
