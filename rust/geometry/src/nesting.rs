// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Nested-region exclusion
//!
//! A room drawn fully inside another room becomes a hole in the outer room and is
//! dropped as a standalone region.

use crate::bool2d::{contour_covers, contours_almost_equal, ensure_cw};
use crate::region::{Region, DEFAULT_TOLERANCE};
use tracing::debug;

/// Turn "room inside a room" into one region with a void.
///
/// Regions are visited largest first. Whenever an outer region's perimeter covers an
/// inner region's perimeter, the inner perimeter is added to the outer region as a
/// clockwise void and the inner region is dropped. An inner region already lying in
/// one of the outer region's voids is dropped without a second void, and a duplicate
/// of the outer perimeter is simply dropped. Surviving regions keep their input order.
pub fn exclude_nested(regions: &[Region]) -> Vec<Region> {
    exclude_nested_with_tolerance(regions, DEFAULT_TOLERANCE)
}

pub fn exclude_nested_with_tolerance(regions: &[Region], tolerance: f64) -> Vec<Region> {
    let mut result: Vec<Region> = regions.iter().map(Region::normalized).collect();
    let mut order: Vec<usize> = (0..result.len()).collect();
    order.sort_by(|&a, &b| result[b].area().total_cmp(&result[a].area()));

    let mut dropped = vec![false; result.len()];

    for (rank, &outer) in order.iter().enumerate() {
        if dropped[outer] {
            continue;
        }
        for &inner in &order[rank + 1..] {
            if dropped[inner] {
                continue;
            }
            let inner_perimeter = &result[inner].perimeter;
            let outer_region = &result[outer];
            if !contour_covers(&outer_region.perimeter, inner_perimeter, tolerance) {
                continue;
            }

            let duplicate =
                contours_almost_equal(&outer_region.perimeter, inner_perimeter, tolerance)
                    || contours_almost_equal(
                        &outer_region.perimeter,
                        &inner_perimeter.iter().rev().copied().collect::<Vec<_>>(),
                        tolerance,
                    );
            let already_void = outer_region
                .voids
                .iter()
                .any(|v| contour_covers(v, inner_perimeter, tolerance));

            if !duplicate && !already_void {
                let void = ensure_cw(inner_perimeter);
                result[outer].add_void(void);
            }
            debug!(outer, inner, duplicate, already_void, "Excluded nested region");
            dropped[inner] = true;
        }
    }

    result
        .into_iter()
        .zip(dropped)
        .filter_map(|(region, dropped)| (!dropped).then_some(region))
        .collect()
}
