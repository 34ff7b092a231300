//! Computational geometry algorithms.
//!
//! This module contains the hull, triangulation and dual-graph algorithms:
//!
//! - **2D hulls**: Jarvis march, Quickhull
//! - **3D hull**: incremental construction into a closed
//!   [`HalfEdgeMesh`](crate::mesh::HalfEdgeMesh)
//! - **Delaunay**: incremental insertion, Lawson flipping, constrained triangulation with
//!   obstacles
//! - **Voronoi**: cells dual to a Delaunay triangulation
//!
//! 2D triangulation entry points take normalized coordinates; see
//! [`Normalizer2`](crate::geometry::Normalizer2).

pub mod delaunay;
pub mod hull2d;
pub mod hull3d;
pub mod voronoi;
