// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial index for tolerance-based node lookup and merging.
//!
//! Uses a grid-based spatial hash for O(1) average-case nearest-node queries.
//! Network construction relies on it so that segment endpoints and intersection
//! points within a tolerance become the same node.

use nalgebra::Point2;
use rustc_hash::FxHashMap;

/// A spatial hash grid over node positions.
///
/// The grid divides the plane into square cells of side `cell_size`. Lookups
/// check the 3x3 neighborhood for candidates within tolerance.
#[derive(Debug)]
pub struct SpatialIndex {
    cell_size: f64,
    grid: FxHashMap<(i64, i64), Vec<usize>>,
}

impl SpatialIndex {
    /// `cell_size` should be >= the tolerance used for queries.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: cell_size.max(1e-10),
            grid: FxHashMap::default(),
        }
    }

    pub fn insert(&mut self, index: usize, p: &Point2<f64>) {
        let cell = self.cell_coords(p);
        self.grid.entry(cell).or_default().push(index);
    }

    /// Finds the earliest-inserted node within `tolerance` of `p`.
    pub fn find_near(
        &self,
        positions: &[Point2<f64>],
        p: &Point2<f64>,
        tolerance: f64,
    ) -> Option<usize> {
        let (cx, cy) = self.cell_coords(p);
        let tol_sq = tolerance * tolerance;
        let mut best: Option<usize> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(indices) = self.grid.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &index in indices {
                    let within = (positions[index] - p).norm_squared() <= tol_sq;
                    if within && best.map_or(true, |b| index < b) {
                        best = Some(index);
                    }
                }
            }
        }

        best
    }

    fn cell_coords(&self, p: &Point2<f64>) -> (i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }
}

/// Returns an existing node within `tolerance` of `p`, or appends a new one.
pub(crate) fn find_or_add_node(
    positions: &mut Vec<Point2<f64>>,
    index: &mut SpatialIndex,
    p: Point2<f64>,
    tolerance: f64,
) -> usize {
    if let Some(existing) = index.find_near(positions, &p, tolerance) {
        return existing;
    }
    let id = positions.len();
    positions.push(p);
    index.insert(id, &p);
    id
}
