//! Grid-based spatial hash for tolerance-consistent point lookup.
//!
//! Space is divided into cubic cells of size `2 * tolerance`. Any point within
//! `tolerance` of a query lies in the query's cell or one of its 26 neighbours,
//! so a lookup only compares distances against points in a 3x3x3 block.

use std::collections::HashMap;

use nalgebra::{Point2, Point3};

use super::{lift, EPSILON};

/// Maps positions to caller-chosen ids, matching points within a tolerance.
#[derive(Debug, Clone)]
pub struct PointIndex {
    cells: HashMap<(i64, i64, i64), Vec<(Point3<f64>, usize)>>,
    cell_size: f64,
    tolerance: f64,
}

impl Default for PointIndex {
    fn default() -> Self {
        Self::new(EPSILON)
    }
}

impl PointIndex {
    /// Create an empty index. Points closer than `tolerance` are the same point.
    pub fn new(tolerance: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size: tolerance * 2.0,
            tolerance,
        }
    }

    #[inline]
    fn cell_coords(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        let discretize = |v: f64| (v / self.cell_size).floor() as i64;
        (discretize(p.x), discretize(p.y), discretize(p.z))
    }

    /// Find the id of a stored point within tolerance of `point`.
    ///
    /// When several stored points qualify, the closest one wins.
    pub fn find(&self, point: &Point3<f64>) -> Option<usize> {
        let (cx, cy, cz) = self.cell_coords(point);
        let mut best: Option<(f64, usize)> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(entries) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for (p, id) in entries {
                        let d = (p - point).norm();
                        if d < self.tolerance && best.map_or(true, |(bd, _)| d < bd) {
                            best = Some((d, *id));
                        }
                    }
                }
            }
        }

        best.map(|(_, id)| id)
    }

    /// 2D convenience wrapper around [`PointIndex::find`].
    pub fn find2(&self, point: &Point2<f64>) -> Option<usize> {
        self.find(&lift(point))
    }

    /// Insert a point without checking for duplicates.
    pub fn insert(&mut self, point: Point3<f64>, id: usize) {
        let cell = self.cell_coords(&point);
        self.cells.entry(cell).or_default().push((point, id));
    }

    /// Insert unless a point within tolerance exists.
    ///
    /// Returns `Ok(())` on insertion, or `Err(existing_id)`.
    pub fn insert_if_unique(&mut self, point: Point3<f64>, id: usize) -> Result<(), usize> {
        match self.find(&point) {
            Some(existing) => Err(existing),
            None => {
                self.insert(point, id);
                Ok(())
            }
        }
    }

    /// Remove the entry with the given position and id, if present.
    pub fn remove(&mut self, point: &Point3<f64>, id: usize) {
        let cell = self.cell_coords(point);
        if let Some(entries) = self.cells.get_mut(&cell) {
            entries.retain(|(_, stored)| *stored != id);
            if entries.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    /// Remove every point.
    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

/// Remove duplicate 2D points, keeping first occurrences in input order.
pub fn dedup_points2(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut index = PointIndex::default();
    let mut unique = Vec::with_capacity(points.len());
    for p in points {
        if index.insert_if_unique(lift(p), unique.len()).is_ok() {
            unique.push(*p);
        }
    }
    unique
}

/// Remove duplicate 3D points, keeping first occurrences in input order.
pub fn dedup_points3(points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    let mut index = PointIndex::default();
    let mut unique = Vec::with_capacity(points.len());
    for p in points {
        if index.insert_if_unique(*p, unique.len()).is_ok() {
            unique.push(*p);
        }
    }
    unique
}
