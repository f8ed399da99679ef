// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interior points of regions
//!
//! The interior point of a space is its durable identity anchor across runs, so it
//! must be deterministic for a given boundary and lie inside the perimeter and
//! outside every void.

use crate::bool2d::{compute_signed_area, contour_bounds, point_in_contour};
use crate::region::Region;
use nalgebra::Point2;

/// Tolerance for rejecting candidates that sit on a boundary
const BOUNDARY_EPSILON: f64 = 1e-6;

/// Scan-line heights tried (as fractions of the bounding box height) when the
/// centroid is not usable
const SCAN_FRACTIONS: [f64; 7] = [0.5, 0.25, 0.75, 0.125, 0.375, 0.625, 0.875];

/// A point strictly inside the region's perimeter and outside all its voids.
///
/// Starts from the perimeter's own internal point. If that lands in a void, the
/// midpoints of diagonals between each perimeter vertex and each void vertex are
/// tried in order; if none qualifies the perimeter's internal point is returned.
pub fn interior_point(region: &Region) -> Point2<f64> {
    let naive = perimeter_internal_point(&region.perimeter);
    if region.voids.is_empty() || region.contains_strictly(&naive, BOUNDARY_EPSILON) {
        return naive;
    }

    let void_points: Vec<Point2<f64>> = region.voids.iter().flatten().copied().collect();
    for perimeter_point in &region.perimeter {
        for void_point in &void_points {
            let mid = nalgebra::center(perimeter_point, void_point);
            if region.contains_strictly(&mid, BOUNDARY_EPSILON) {
                return mid;
            }
        }
    }

    naive
}

/// A point inside a simple contour (voids ignored)
pub fn perimeter_internal_point(contour: &[Point2<f64>]) -> Point2<f64> {
    if contour.is_empty() {
        return Point2::origin();
    }
    if contour.len() < 3 {
        return contour[0];
    }

    let centroid = contour_centroid(contour);
    if strictly_inside(&centroid, contour) {
        return centroid;
    }

    let Some((min, max)) = contour_bounds(contour) else {
        return contour[0];
    };
    let height = max.y - min.y;
    let mut heights = vec![centroid.y];
    heights.extend(SCAN_FRACTIONS.iter().map(|f| min.y + height * f));

    for y in heights {
        if let Some(candidate) = widest_chord_midpoint(contour, y) {
            if strictly_inside(&candidate, contour) {
                return candidate;
            }
        }
    }

    contour[0]
}

/// Area-weighted centroid of a contour (vertex average for degenerate input)
pub fn contour_centroid(contour: &[Point2<f64>]) -> Point2<f64> {
    let area = compute_signed_area(contour);
    let n = contour.len();
    if area.abs() < 1e-12 || n < 3 {
        let sum = contour
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
        return Point2::from(sum / n.max(1) as f64);
    }

    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let p = contour[i];
        let q = contour[(i + 1) % n];
        let cross = p.x * q.y - q.x * p.y;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }
    Point2::new(cx / (6.0 * area), cy / (6.0 * area))
}

fn strictly_inside(point: &Point2<f64>, contour: &[Point2<f64>]) -> bool {
    point_in_contour(point, contour)
        && !crate::bool2d::point_on_contour(point, contour, BOUNDARY_EPSILON)
}

/// Midpoint of the widest inside span of the horizontal line at `y`
fn widest_chord_midpoint(contour: &[Point2<f64>], y: f64) -> Option<Point2<f64>> {
    let n = contour.len();
    let mut crossings: Vec<f64> = (0..n)
        .filter_map(|i| {
            let a = contour[i];
            let b = contour[(i + 1) % n];
            if (a.y > y) != (b.y > y) {
                Some(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y))
            } else {
                None
            }
        })
        .collect();
    crossings.sort_by(|a, b| a.total_cmp(b));

    crossings
        .chunks_exact(2)
        .max_by(|a, b| (a[1] - a[0]).total_cmp(&(b[1] - b[0])))
        .map(|span| Point2::new((span[0] + span[1]) / 2.0, y))
}
