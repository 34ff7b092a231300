//! Core mesh data structures.
//!
//! This module provides the half-edge mesh representation shared by every
//! algorithm in the crate.
//!
//! # Overview
//!
//! The primary type is [`HalfEdgeMesh`], which represents a triangle mesh using
//! a half-edge (doubly-connected edge list) data structure. Elements live in
//! arenas owned by the mesh and refer to each other by handle, so adjacency
//! queries are O(1) and nothing dangles when elements are removed.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//!
//! Handles are only meaningful for the mesh that issued them.
//!
//! # Construction
//!
//! ```
//! use tessel::mesh::{build_from_triangles, HalfEdgeMesh};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! assert!(mesh.is_valid());
//! ```

mod builder;
mod edit;
mod halfedge;
mod index;

pub use builder::{build_from_triangles, to_face_vertex};
pub use edit::{ConnectPolicy, ConnectReport};
pub use halfedge::{Face, HalfEdge, HalfEdgeMesh, Vertex};
pub use index::{FaceId, HalfEdgeId, VertexId};
