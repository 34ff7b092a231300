//! Mesh construction utilities.
//!
//! Conversion between [`HalfEdgeMesh`] and indexed face-vertex lists, the
//! form most callers already hold triangles in.

use nalgebra::Point3;

use super::edit::ConnectPolicy;
use super::halfedge::HalfEdgeMesh;
use super::index::VertexId;
use crate::error::{GeometryError, Result};

/// Build a half-edge mesh from vertices and triangle faces.
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `faces` - List of triangle faces, each as [v0, v1, v2] indices
///
/// Vertices keep their input order, so vertex `i` has id `i`. Shared edges are
/// paired by index with [`ConnectPolicy::Fast`].
///
/// # Example
/// ```
/// use tessel::mesh::build_from_triangles;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<HalfEdgeMesh> {
    if faces.is_empty() {
        return Err(GeometryError::degenerate("mesh has no faces"));
    }

    // Validate vertex indices
    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(GeometryError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(GeometryError::DegenerateFace { face: fi });
        }
    }

    let mut mesh = HalfEdgeMesh::with_capacity(vertices.len(), faces.len());
    let vertex_ids: Vec<VertexId> = vertices.iter().map(|&pos| mesh.add_vertex(pos)).collect();

    for face in faces {
        mesh.add_triangle_by_ids(vertex_ids[face[0]], vertex_ids[face[1]], vertex_ids[face[2]]);
    }

    mesh.connect_opposite_edges(ConnectPolicy::Fast)?;
    mesh.validate()?;
    Ok(mesh)
}

/// Convert a half-edge mesh back to a face-vertex representation.
///
/// Returns (vertices, faces). Live vertices are numbered densely in id order.
pub fn to_face_vertex(mesh: &HalfEdgeMesh) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let mut remap = vec![usize::MAX; mesh.vertices.len()];
    let mut vertices = Vec::with_capacity(mesh.num_vertices());
    for (id, v) in mesh.vertices() {
        remap[id.index()] = vertices.len();
        vertices.push(v.position);
    }

    let faces: Vec<[usize; 3]> = mesh
        .face_ids()
        .map(|f| mesh.face_triangle(f).map(|v| remap[v.index()]))
        .collect();

    (vertices, faces)
}
