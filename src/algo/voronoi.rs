//! Voronoi diagram as the dual of a Delaunay triangulation.
//!
//! Every triangle contributes its circumcenter as a Voronoi vertex, and every
//! interior edge contributes the segment between the circumcenters of its two
//! triangles. Cells of sites on the outer hull are open: their edges stop at
//! the last circumcenter. Surround the input with far-away sentinel sites when
//! closed outer cells are needed.
//!
//! # Example
//!
//! ```
//! use tessel::algo::delaunay::DelaunayOptions;
//! use tessel::algo::voronoi::voronoi_diagram;
//! use tessel::geometry::NormalizedPoints;
//! use nalgebra::Point2;
//!
//! let points = NormalizedPoints::assume_normalized(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(1.0, 1.0),
//!     Point2::new(0.0, 1.0),
//!     Point2::new(0.5, 0.5),
//! ]);
//! let cells = voronoi_diagram(&points, &DelaunayOptions::default()).unwrap();
//! let center = cells.iter().find(|c| c.site == Point2::new(0.5, 0.5)).unwrap();
//! assert_eq!(center.edges.len(), 4);
//! ```

use std::collections::BTreeMap;

use nalgebra::{Point2, Vector2};

use crate::algo::delaunay::{triangulate, DelaunayOptions};
use crate::error::{GeometryError, Result};
use crate::geometry::predicates::{angle_ccw, circumcenter};
use crate::geometry::NormalizedPoints;
use crate::mesh::{FaceId, HalfEdgeMesh, VertexId};

/// One edge of a Voronoi cell, running counter-clockwise around `site`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoronoiEdge {
    /// Circumcenter of the triangle before this edge.
    pub start: Point2<f64>,
    /// Circumcenter of the triangle after this edge.
    pub end: Point2<f64>,
    /// The site whose cell this edge bounds.
    pub site: Point2<f64>,
}

impl VoronoiEdge {
    /// Midpoint of the edge.
    pub fn midpoint(&self) -> Point2<f64> {
        Point2::from((self.start.coords + self.end.coords) * 0.5)
    }

    /// Length of the edge.
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }
}

/// The Voronoi cell of one site.
#[derive(Debug, Clone, PartialEq)]
pub struct VoronoiCell {
    /// The Delaunay vertex the cell belongs to.
    pub site: Point2<f64>,
    /// Cell boundary, ordered counter-clockwise around the site.
    pub edges: Vec<VoronoiEdge>,
}

impl VoronoiCell {
    /// Whether consecutive edges join end to start all the way around.
    pub fn is_closed(&self) -> bool {
        let n = self.edges.len();
        n >= 3
            && (0..n).all(|i| {
                let next = &self.edges[(i + 1) % n];
                (self.edges[i].end - next.start).norm() < 1e-9
            })
    }

    /// Shoelace area of a closed cell, `None` for an open one.
    pub fn area(&self) -> Option<f64> {
        if !self.is_closed() {
            return None;
        }
        let twice: f64 = self
            .edges
            .iter()
            .map(|e| e.start.x * e.end.y - e.end.x * e.start.y)
            .sum();
        Some(twice.abs() * 0.5)
    }
}

/// Build Voronoi cells from a Delaunay triangulation.
///
/// Returns one cell per vertex with at least one interior edge, ordered by
/// vertex id. Fails with [`GeometryError::DegenerateInput`] if a face has no
/// circumcenter.
pub fn voronoi_from_delaunay(mesh: &HalfEdgeMesh) -> Result<Vec<VoronoiCell>> {
    let mut centers: BTreeMap<FaceId, Point2<f64>> = BTreeMap::new();
    for f in mesh.face_ids() {
        let [a, b, c] = mesh.face_positions2(f);
        let center = circumcenter(&a, &b, &c).ok_or_else(|| {
            GeometryError::degenerate(format!("face {f:?} is degenerate and has no circumcenter"))
        })?;
        centers.insert(f, center);
    }

    let mut cells: BTreeMap<VertexId, Vec<VoronoiEdge>> = BTreeMap::new();
    for he in mesh.halfedge_ids() {
        let t = mesh.twin(he);
        if !t.is_valid() {
            continue;
        }
        let (Some(&start), Some(&end)) =
            (centers.get(&mesh.face_of(t)), centers.get(&mesh.face_of(he)))
        else {
            return Err(GeometryError::invariant(format!(
                "half-edge {he:?} borders a face without a circumcenter"
            )));
        };
        let v = mesh.origin(he);
        cells.entry(v).or_default().push(VoronoiEdge {
            start,
            end,
            site: mesh.position2(v),
        });
    }

    let cells: Vec<VoronoiCell> = cells
        .into_iter()
        .map(|(v, mut edges)| {
            let site = mesh.position2(v);
            let x_axis = Vector2::x();
            edges.sort_by(|e, g| {
                let ea = angle_ccw(&x_axis, &(e.midpoint() - site));
                ea.total_cmp(&angle_ccw(&x_axis, &(g.midpoint() - site)))
            });
            VoronoiCell { site, edges }
        })
        .collect();

    log::debug!(
        "voronoi: {} cells from {} triangles, {} closed",
        cells.len(),
        centers.len(),
        cells.iter().filter(|c| c.is_closed()).count()
    );
    Ok(cells)
}

/// Triangulate `points` and return the dual Voronoi cells.
pub fn voronoi_diagram(
    points: &NormalizedPoints,
    options: &DelaunayOptions,
) -> Result<Vec<VoronoiCell>> {
    let mesh = triangulate(points, options)?;
    voronoi_from_delaunay(&mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;
    use nalgebra::Point3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    fn square_with_center() -> NormalizedPoints {
        NormalizedPoints::assume_normalized(vec![
            p(0.0, 0.0),
            p(1.0, 0.0),
            p(1.0, 1.0),
            p(0.0, 1.0),
            p(0.5, 0.5),
        ])
    }

    #[test]
    fn test_center_cell_is_diamond() {
        let cells = voronoi_diagram(&square_with_center(), &DelaunayOptions::default()).unwrap();
        assert_eq!(cells.len(), 5);

        let center = cells.iter().find(|c| c.site == p(0.5, 0.5)).unwrap();
        assert!(center.is_closed());
        assert!((center.area().unwrap() - 0.5).abs() < 1e-9);
        for e in &center.edges {
            assert_eq!(e.site, center.site);
            assert!((e.length() - 0.5f64.sqrt()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_hull_cells_are_open() {
        let cells = voronoi_diagram(&square_with_center(), &DelaunayOptions::default()).unwrap();
        let corner = cells.iter().find(|c| c.site == p(0.0, 0.0)).unwrap();
        assert_eq!(corner.edges.len(), 1);
        assert!(!corner.is_closed());
        assert_eq!(corner.area(), None);
    }

    #[test]
    fn test_edges_are_ccw() {
        let mut rng = StdRng::seed_from_u64(17);
        let points: Vec<Point2<f64>> = (0..80).map(|_| p(rng.gen(), rng.gen())).collect();
        let points = NormalizedPoints::assume_normalized(points);
        let cells = voronoi_diagram(&points, &DelaunayOptions::default()).unwrap();

        let mut closed = 0;
        for cell in cells.iter().filter(|c| c.is_closed()) {
            closed += 1;
            for e in &cell.edges {
                let cross = (e.start - cell.site).perp(&(e.end - cell.site));
                assert!(cross >= -1e-12, "edge runs clockwise around {:?}", cell.site);
            }
        }
        assert!(closed > 0);
    }

    #[test]
    fn test_edge_points_equidistant() {
        let mesh = build_from_triangles(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.5, 0.9, 0.0),
                Point3::new(0.5, -0.8, 0.0),
            ],
            &[[0, 1, 2], [1, 0, 3]],
        )
        .unwrap();
        let cells = voronoi_from_delaunay(&mesh).unwrap();
        assert_eq!(cells.len(), 2);
        for cell in &cells {
            let e = cell.edges[0];
            let other = if cell.site == p(0.0, 0.0) { p(1.0, 0.0) } else { p(0.0, 0.0) };
            for q in [e.start, e.end] {
                assert!(((q - cell.site).norm() - (q - other).norm()).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_degenerate_face() {
        let mut mesh = build_from_triangles(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.5, 1.0, 0.0),
            ],
            &[[0, 1, 2]],
        )
        .unwrap();
        mesh.set_position(VertexId::new(2), Point3::new(2.0, 0.0, 0.0));
        assert!(matches!(voronoi_from_delaunay(&mesh), Err(GeometryError::DegenerateInput { .. })));
    }
}
