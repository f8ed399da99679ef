// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Miter offsetting of regions
//!
//! Each contour edge is moved along its right-hand normal, which points out of the
//! region for a counter-clockwise perimeter and into the hole for a clockwise void,
//! so a positive distance grows the region and a negative one shrinks it. Raw offset
//! contours may self-overlap where features collapse; they are resolved by keeping
//! only the area with positive counter-clockwise winding.

use crate::bool2d::shapes_to_regions;
use crate::error::{Error, Result};
use crate::region::Region;
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::{Point2, Vector2};
use std::sync::OnceLock;

/// Miter length (in multiples of the offset distance) beyond which a corner is beveled
const MITER_LIMIT: f64 = 1000.0;

/// Edges shorter than this are dropped before offsetting
const MIN_EDGE_LENGTH: f64 = 1e-12;

type Path = Vec<[f64; 2]>;

/// Offset every contour of `region` by `delta` (positive grows) and resolve overlaps.
pub fn offset_region(region: &Region, delta: f64) -> Result<Vec<Region>> {
    offset_regions(std::slice::from_ref(region), delta)
}

/// Offset a batch of regions by `delta` and merge the results.
///
/// Fragments inherit the properties of the source region that contains them.
pub fn offset_regions(regions: &[Region], delta: f64) -> Result<Vec<Region>> {
    if !delta.is_finite() {
        return Err(Error::NonFinite("offset distance"));
    }
    let mut paths: Vec<Path> = Vec::new();
    for region in regions {
        region.validate()?;
        let normalized = region.normalized();
        for contour in normalized.contours() {
            let offset = offset_contour(contour, delta)?;
            paths.push(offset.iter().map(|p| [p.x, p.y]).collect());
        }
    }
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let empty: Vec<Path> = Vec::new();
    let result = paths.overlay(&empty, OverlayRule::Union, ccw_positive_rule());
    shapes_to_regions(&result, regions)
}

/// Shrink by `distance`, then grow back by the same distance.
///
/// Zero-width bridges and slivers narrower than twice the distance vanish; the
/// remaining outline is restored (corners are mitered, so right angles come back
/// exactly).
pub fn shrink_grow(region: &Region, distance: f64) -> Result<Vec<Region>> {
    let shrunk = offset_region(region, -distance.abs())?;
    if shrunk.is_empty() {
        return Ok(Vec::new());
    }
    let mut grown = offset_regions(&shrunk, distance.abs())?;
    for fragment in &mut grown {
        fragment.properties = region.properties.clone();
    }
    Ok(grown)
}

/// Raw miter offset of one contour along the right-hand edge normals
pub fn offset_contour(contour: &[Point2<f64>], delta: f64) -> Result<Vec<Point2<f64>>> {
    let points = dedup_ring(contour);
    let n = points.len();
    if n < 3 {
        return Err(Error::OffsetFailed(format!(
            "contour has {n} distinct vertices"
        )));
    }

    let normals: Vec<Vector2<f64>> = (0..n)
        .map(|i| {
            let dir = (points[(i + 1) % n] - points[i]).normalize();
            Vector2::new(dir.y, -dir.x)
        })
        .collect();

    let mut result = Vec::with_capacity(n + 4);
    for i in 0..n {
        let n_in = normals[(i + n - 1) % n];
        let n_out = normals[i];
        let p = points[i];
        let denom = 1.0 + n_in.dot(&n_out);

        if denom > 2.0 / (MITER_LIMIT * MITER_LIMIT) {
            let miter = (n_in + n_out) * (delta / denom);
            if miter.norm() <= MITER_LIMIT * delta.abs() {
                result.push(p + miter);
                continue;
            }
        }
        // Bevel near-reversals
        result.push(p + n_in * delta);
        result.push(p + n_out * delta);
    }

    if result.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(Error::NonFinite("offset contour"));
    }
    Ok(result)
}

/// Fill rule under which counter-clockwise contours count as filled.
///
/// Probed once against a unit square so the offset resolution does not depend on
/// the winding sign convention of the overlay engine.
fn ccw_positive_rule() -> FillRule {
    static RULE: OnceLock<bool> = OnceLock::new();
    let positive = *RULE.get_or_init(|| {
        let square: Vec<Path> = vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]];
        let empty: Vec<Path> = Vec::new();
        !square
            .overlay(&empty, OverlayRule::Union, FillRule::Positive)
            .is_empty()
    });
    if positive {
        FillRule::Positive
    } else {
        FillRule::Negative
    }
}

fn dedup_ring(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut points: Vec<Point2<f64>> = Vec::with_capacity(contour.len());
    for p in contour {
        if points
            .last()
            .map_or(true, |last| (p - last).norm() > MIN_EDGE_LENGTH)
        {
            points.push(*p);
        }
    }
    while points.len() > 1 {
        let first = points[0];
        let closing = points.last().is_some_and(|last| (first - last).norm() <= MIN_EDGE_LENGTH);
        if !closing {
            break;
        }
        points.pop();
    }
    points
}
