//! # Tessel
//!
//! Convex hulls, Delaunay triangulations and Voronoi diagrams over a half-edge
//! mesh.
//!
//! Tessel builds planar triangulations and 3D hulls into a single arena-backed
//! half-edge structure, so every algorithm shares the same adjacency queries
//! and invariant checks.
//!
//! ## Features
//!
//! - **Half-edge data structure**: typed handles, edge flips, face and edge splits
//! - **Tolerant predicates**: tri-state orientation and in-circle tests
//! - **2D hulls**: Jarvis march and Quickhull with identical output order
//! - **3D hull**: incremental, with optional parallel visibility tests
//! - **Delaunay**: incremental and constrained, with dynamic obstacles
//! - **Voronoi**: cells dual to a Delaunay triangulation
//!
//! ## Quick Start
//!
//! ```
//! use tessel::prelude::*;
//! use nalgebra::Point2;
//!
//! let points = vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(4.0, 0.0),
//!     Point2::new(4.0, 3.0),
//!     Point2::new(0.0, 3.0),
//!     Point2::new(1.0, 1.0),
//! ];
//!
//! // Predicates assume coordinates near the unit square.
//! let normalizer = Normalizer2::from_points(&points).unwrap();
//! let normalized = normalizer.normalize_points(&points);
//! let mut mesh = triangulate(&normalized, &DelaunayOptions::default()).unwrap();
//! normalizer.unnormalize_mesh(&mut mesh);
//!
//! assert_eq!(mesh.num_faces(), 4);
//! assert!((mesh.surface_area() - 12.0).abs() < 1e-9);
//! ```
//!
//! ## Convex Hulls
//!
//! ```
//! use tessel::prelude::*;
//! use nalgebra::Point2;
//!
//! let points = vec![
//!     Point2::new(1.0, 1.0),
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(0.4, 0.3),
//!     Point2::new(0.0, 1.0),
//! ];
//! let options = HullOptions::default();
//! let hull = convex_hull_2d(&points, Hull2dAlgorithm::Quickhull, &options).unwrap();
//! assert_eq!(hull[0], Point2::new(0.0, 0.0));
//! assert_eq!(hull.len(), 4);
//! ```
//!
//! ## Mesh Traversal
//!
//! ```
//! use tessel::prelude::*;
//! use nalgebra::Point3;
//!
//! # let vertices = vec![
//! #     Point3::new(0.0, 0.0, 0.0),
//! #     Point3::new(1.0, 0.0, 0.0),
//! #     Point3::new(0.5, 1.0, 0.0),
//! # ];
//! # let faces = vec![[0, 1, 2]];
//! # let mesh = build_from_triangles(&vertices, &faces).unwrap();
//! let v = VertexId::new(0);
//! for neighbor in mesh.vertex_neighbors(v) {
//!     println!("Neighbor: {:?}", neighbor);
//! }
//!
//! let f = FaceId::new(0);
//! let [v0, v1, v2] = mesh.face_triangle(f);
//! assert_eq!(mesh.dest(mesh.find_halfedge(v0, v1).unwrap()), v1);
//! # let _ = v2;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod convert;
pub mod error;
pub mod geometry;
pub mod mesh;

pub use error::{GeometryError, Result};

/// Prelude module for convenient imports.
///
/// ```
/// use tessel::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::delaunay::{
        constrained_triangulation, delaunay_by_flipping, triangulate, ConstrainedOptions,
        ConstrainedTriangulation, DelaunayOptions, ObstacleId,
    };
    pub use crate::algo::hull2d::{
        convex_hull_2d, jarvis_march, quickhull, Hull2dAlgorithm, HullOptions,
    };
    pub use crate::algo::hull3d::{convex_hull_3d, Hull3dOptions};
    pub use crate::algo::voronoi::{
        voronoi_diagram, voronoi_from_delaunay, VoronoiCell, VoronoiEdge,
    };
    pub use crate::error::{GeometryError, Result};
    pub use crate::geometry::predicates::{CircleTest, Orientation};
    pub use crate::geometry::{Edge2, Edge3, NormalizedPoints, Normalizer2, Normalizer3};
    pub use crate::mesh::{
        build_from_triangles, to_face_vertex, ConnectPolicy, Face, FaceId, HalfEdge, HalfEdgeId,
        HalfEdgeMesh, Vertex, VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
