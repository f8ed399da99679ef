// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Region cleaning
//!
//! Regions coming out of boolean operations carry zero-width bridges, slivers,
//! collinear vertices and near-coincident vertices that differ between neighbours.
//! [`clean`] removes all of that in four passes:
//!
//! 1. shrink-then-grow each region to drop bridges and slivers
//! 2. remove near-collinear vertices
//! 3. snap every vertex of the batch onto a shared point set, then insert the
//!    shared points that lie on an edge into that edge, so neighbouring regions end
//!    up with exactly coincident edges
//! 4. drop whatever no longer forms a valid region

use crate::bool2d::{
    distance_to_segment, is_valid_contour, segment_parameter, simplify_contour,
    MIN_AREA_THRESHOLD,
};
use crate::offset::shrink_grow;
use crate::region::{Region, DEFAULT_TOLERANCE};
use nalgebra::Point2;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

/// Cleaning tolerances
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanOptions {
    /// Vertices closer than this are merged
    pub tolerance: f64,
    /// Maximum deviation of a vertex from its neighbours' line to count as collinear
    pub collinear_tolerance: f64,
    /// Shrink/grow distance for bridge removal (0 disables the pass)
    pub bridge_offset: f64,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            collinear_tolerance: 1e-4,
            bridge_offset: 0.01,
        }
    }
}

/// Clean a batch of regions.
///
/// Properties of every input region travel with all regions derived from it.
/// Applying `clean` to its own output returns the same regions within tolerance.
pub fn clean(regions: &[Region], options: &CleanOptions) -> Vec<Region> {
    let simplified: Vec<Region> = regions
        .iter()
        .flat_map(|region| remove_bridges(region, options.bridge_offset))
        .filter_map(|region| simplify_region(&region, options.collinear_tolerance))
        .collect();

    let mut shared = SharedPoints::new(options.tolerance);
    let snapped: Vec<Region> = simplified
        .iter()
        .filter_map(|region| snap_region(region, &mut shared))
        .collect();

    let cleaned: Vec<Region> = snapped
        .into_iter()
        .filter_map(|region| cinch_region(region, &shared, options.tolerance))
        .collect();

    debug!(
        input = regions.len(),
        output = cleaned.len(),
        shared_points = shared.points.len(),
        "Cleaned regions"
    );
    cleaned
}

fn remove_bridges(region: &Region, distance: f64) -> Vec<Region> {
    if distance <= 0.0 {
        return vec![region.clone()];
    }
    match shrink_grow(region, distance) {
        Ok(parts) => parts,
        Err(err) => {
            debug!(error = %err, "Bridge removal failed, keeping region as-is");
            vec![region.clone()]
        }
    }
}

fn simplify_region(region: &Region, collinear_tolerance: f64) -> Option<Region> {
    let perimeter = simplify_contour(&region.perimeter, collinear_tolerance);
    if !is_valid_contour(&perimeter) {
        return None;
    }
    let voids = region
        .voids
        .iter()
        .map(|v| simplify_contour(v, collinear_tolerance))
        .filter(|v| is_valid_contour(v))
        .collect();

    Some(Region {
        perimeter,
        voids,
        properties: region.properties.clone(),
    })
}

/// Batch-wide vertex set; the first point registered within tolerance wins
struct SharedPoints {
    tolerance: f64,
    points: Vec<Point2<f64>>,
    grid: FxHashMap<(i64, i64), SmallVec<[usize; 4]>>,
}

impl SharedPoints {
    fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.max(f64::EPSILON),
            points: Vec::new(),
            grid: FxHashMap::default(),
        }
    }

    fn cell(&self, p: &Point2<f64>) -> (i64, i64) {
        (
            (p.x / self.tolerance).floor() as i64,
            (p.y / self.tolerance).floor() as i64,
        )
    }

    /// Representative for `p`, registering `p` itself if nothing is close enough
    fn snap(&mut self, p: Point2<f64>) -> Point2<f64> {
        let (cx, cy) = self.cell(&p);
        let mut best: Option<usize> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(bucket) = self.grid.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &index in bucket {
                    let close = (self.points[index] - p).norm() <= self.tolerance;
                    if close && best.map_or(true, |b| index < b) {
                        best = Some(index);
                    }
                }
            }
        }
        if let Some(index) = best {
            return self.points[index];
        }

        let index = self.points.len();
        self.points.push(p);
        self.grid.entry((cx, cy)).or_default().push(index);
        p
    }
}

fn snap_region(region: &Region, shared: &mut SharedPoints) -> Option<Region> {
    let perimeter = snap_contour(&region.perimeter, shared);
    if !is_valid_contour(&perimeter) {
        return None;
    }
    let voids = region
        .voids
        .iter()
        .map(|v| snap_contour(v, shared))
        .filter(|v| is_valid_contour(v))
        .collect();

    Some(Region {
        perimeter,
        voids,
        properties: region.properties.clone(),
    })
}

fn snap_contour(contour: &[Point2<f64>], shared: &mut SharedPoints) -> Vec<Point2<f64>> {
    let mut out: Vec<Point2<f64>> = Vec::with_capacity(contour.len());
    for p in contour {
        let snapped = shared.snap(*p);
        if out.last() != Some(&snapped) {
            out.push(snapped);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

fn cinch_region(region: Region, shared: &SharedPoints, tolerance: f64) -> Option<Region> {
    let perimeter = cinch_contour(&region.perimeter, &shared.points, tolerance);
    let voids: Vec<Vec<Point2<f64>>> = region
        .voids
        .iter()
        .map(|v| cinch_contour(v, &shared.points, tolerance))
        .filter(|v| is_valid_contour(v))
        .collect();

    let cleaned = Region {
        perimeter,
        voids,
        properties: region.properties,
    };
    let valid = cleaned.validate().is_ok()
        && is_valid_contour(&cleaned.perimeter)
        && cleaned.area() > MIN_AREA_THRESHOLD;
    valid.then_some(cleaned)
}

/// Insert every shared point lying on an edge into that edge, in order along it
fn cinch_contour(
    contour: &[Point2<f64>],
    points: &[Point2<f64>],
    tolerance: f64,
) -> Vec<Point2<f64>> {
    let n = contour.len();
    let mut out = Vec::with_capacity(n);

    for i in 0..n {
        let a = contour[i];
        let b = contour[(i + 1) % n];
        out.push(a);

        let (min_x, max_x) = (a.x.min(b.x) - tolerance, a.x.max(b.x) + tolerance);
        let (min_y, max_y) = (a.y.min(b.y) - tolerance, a.y.max(b.y) + tolerance);

        let mut inserts: SmallVec<[(f64, Point2<f64>); 4]> = SmallVec::new();
        for p in points {
            if p.x < min_x || p.x > max_x || p.y < min_y || p.y > max_y {
                continue;
            }
            if contour.contains(p) {
                continue;
            }
            let t = segment_parameter(p, &a, &b);
            if t <= 0.0 || t >= 1.0 {
                continue;
            }
            if distance_to_segment(p, &a, &b) <= tolerance {
                inserts.push((t, *p));
            }
        }
        inserts.sort_by(|x, y| x.0.total_cmp(&y.0));
        out.extend(inserts.into_iter().map(|(_, p)| p));
    }

    out
}
