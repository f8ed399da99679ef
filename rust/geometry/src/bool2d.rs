// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Boolean Operations over Regions
//!
//! Difference and union of polygonal regions-with-holes using the i_overlay crate,
//! plus the contour predicates (winding, containment, coverage, near-equality)
//! that the rest of the space pipeline is built on.
//!
//! Subjects and clips are always fed to i_overlay normalized (perimeters
//! counter-clockwise, voids clockwise) and evaluated with the non-zero fill rule,
//! so several touching or overlapping minuends behave as their union.

use crate::error::{Error, Result};
use crate::interior::interior_point;
use crate::region::{PropertyBag, Region};
use crate::resilient::resilient_reduce;
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::Point2;

/// Epsilon for floating point comparisons in 2D operations
const EPSILON_2D: f64 = 1e-9;

/// Minimum area threshold - polygons smaller than this are considered degenerate
pub const MIN_AREA_THRESHOLD: f64 = 1e-10;

type Path = Vec<[f64; 2]>;

/// Perform 2D boolean difference: minuends - subtrahends
///
/// All minuends are overlaid together, so regions that share an edge may come back
/// merged; subtract one region at a time when partitions must stay separate.
/// Every fragment inherits the property bag of the minuend it came from.
///
/// # Returns
/// * `Ok(Vec<Region>)` - The remaining fragments (possibly empty)
/// * `Err` - If any input region is degenerate or non-finite
pub fn difference(minuends: &[Region], subtrahends: &[Region]) -> Result<Vec<Region>> {
    if minuends.is_empty() {
        return Ok(Vec::new());
    }
    for region in minuends.iter().chain(subtrahends) {
        region.validate()?;
    }
    if subtrahends.is_empty() {
        return Ok(minuends.iter().map(Region::normalized).collect());
    }

    let subject = regions_to_paths(minuends);
    let clip = regions_to_paths(subtrahends);

    let result = subject.overlay(&clip, OverlayRule::Difference, FillRule::NonZero);

    shapes_to_regions(&result, minuends)
}

/// Perform 2D boolean union of all regions
pub fn union(regions: &[Region]) -> Result<Vec<Region>> {
    if regions.is_empty() {
        return Ok(Vec::new());
    }
    for region in regions {
        region.validate()?;
    }
    if regions.len() == 1 {
        return Ok(vec![regions[0].normalized()]);
    }

    let subject = regions_to_paths(&regions[..1]);
    let clip = regions_to_paths(&regions[1..]);

    let result = subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero);

    shapes_to_regions(&result, regions)
}

/// Subtract `subtrahends` from a single minuend without ever losing it.
///
/// Tries the whole batch first; if that fails, subtracts one at a time and skips any
/// subtrahend whose individual subtraction fails.
pub fn difference_resilient(minuend: &Region, subtrahends: &[Region]) -> Vec<Region> {
    resilient_reduce(
        vec![minuend.clone()],
        subtrahends,
        |acc: &Vec<Region>, batch: &[Region]| difference(acc, batch),
        "region subtraction",
    )
}

/// The fragment with the largest area, if any
pub fn largest_region(regions: Vec<Region>) -> Option<Region> {
    regions
        .into_iter()
        .max_by(|a, b| a.area().total_cmp(&b.area()))
}

/// Total net area of a region list
pub fn total_area(regions: &[Region]) -> f64 {
    regions.iter().map(Region::area).sum()
}

/// Check if a contour is valid (has area, not degenerate)
pub fn is_valid_contour(contour: &[Point2<f64>]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let area = compute_signed_area(contour).abs();
    area > MIN_AREA_THRESHOLD
}

/// Compute the signed area of a 2D contour
/// Positive = counter-clockwise, Negative = clockwise
pub fn compute_signed_area(contour: &[Point2<f64>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = contour.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i].x * contour[j].y;
        area -= contour[j].x * contour[i].y;
    }

    area * 0.5
}

/// Ensure contour has counter-clockwise winding (positive area)
pub fn ensure_ccw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let area = compute_signed_area(contour);
    if area < 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Ensure contour has clockwise winding (for holes)
pub fn ensure_cw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let area = compute_signed_area(contour);
    if area > 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Simplify a contour by removing near-duplicate and near-collinear points
///
/// A vertex is dropped when its distance to the line through its current neighbours
/// is at most `epsilon`. Never returns fewer than 3 points; if simplification would,
/// the input is returned unchanged.
pub fn simplify_contour(contour: &[Point2<f64>], epsilon: f64) -> Vec<Point2<f64>> {
    if contour.len() <= 3 {
        return contour.to_vec();
    }

    let mut result: Vec<Point2<f64>> = contour.to_vec();
    let mut changed = true;

    while changed && result.len() > 3 {
        changed = false;
        let n = result.len();
        for i in 0..n {
            let prev = result[(i + n - 1) % n];
            let curr = result[i];
            let next = result[(i + 1) % n];

            let base = next - prev;
            let base_len = base.norm();
            let deviation = if base_len < EPSILON_2D {
                (curr - prev).norm()
            } else {
                ((curr.x - prev.x) * base.y - (curr.y - prev.y) * base.x).abs() / base_len
            };
            let duplicate = (curr - prev).norm() <= epsilon;

            if deviation <= epsilon || duplicate {
                result.remove(i);
                changed = true;
                break;
            }
        }
    }

    if result.len() < 3 {
        return contour.to_vec();
    }

    result
}

/// Check if a point is inside a contour using ray casting
pub fn point_in_contour(point: &Point2<f64>, contour: &[Point2<f64>]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = contour.len();

    let mut j = n - 1;
    for i in 0..n {
        let pi = &contour[i];
        let pj = &contour[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Distance from a point to the segment `a`-`b`
pub fn distance_to_segment(point: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < EPSILON_2D * EPSILON_2D {
        return (point - a).norm();
    }
    let t = ((point - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).norm()
}

/// Parameter of the projection of `point` onto the line through `a`-`b`
pub fn segment_parameter(point: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < EPSILON_2D * EPSILON_2D {
        return 0.0;
    }
    (point - a).dot(&ab) / len_sq
}

/// Check if a point lies on a contour's boundary within `tolerance`
pub fn point_on_contour(point: &Point2<f64>, contour: &[Point2<f64>], tolerance: f64) -> bool {
    let n = contour.len();
    (0..n).any(|i| distance_to_segment(point, &contour[i], &contour[(i + 1) % n]) <= tolerance)
}

/// Check if contour `outer` covers contour `inner` (boundaries may touch)
pub fn contour_covers(outer: &[Point2<f64>], inner: &[Point2<f64>], tolerance: f64) -> bool {
    if outer.len() < 3 || inner.len() < 3 {
        return false;
    }
    let inside_or_on =
        |p: &Point2<f64>| point_in_contour(p, outer) || point_on_contour(p, outer, tolerance);

    let n = inner.len();
    let vertices_covered = inner.iter().all(|p| inside_or_on(p));
    let midpoints_covered = (0..n).all(|i| {
        let mid = nalgebra::center(&inner[i], &inner[(i + 1) % n]);
        inside_or_on(&mid)
    });
    let outer_stays_outside = outer
        .iter()
        .all(|p| !point_in_contour(p, inner) || point_on_contour(p, inner, tolerance));

    vertices_covered && midpoints_covered && outer_stays_outside
}

/// Compute bounding box of a contour
pub fn contour_bounds(contour: &[Point2<f64>]) -> Option<(Point2<f64>, Point2<f64>)> {
    if contour.is_empty() {
        return None;
    }

    let mut min = contour[0];
    let mut max = contour[0];

    for p in contour.iter().skip(1) {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }

    Some((min, max))
}

/// Tolerance-based point equality
#[inline]
pub fn points_almost_equal(a: &Point2<f64>, b: &Point2<f64>, tolerance: f64) -> bool {
    (a - b).norm() <= tolerance
}

/// Tolerance-based contour equality, independent of the starting vertex
///
/// Both contours must have the same vertex count and the same winding; some cyclic
/// shift of `b` must place every vertex within `tolerance` of its partner in `a`.
pub fn contours_almost_equal(a: &[Point2<f64>], b: &[Point2<f64>], tolerance: f64) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if a.is_empty() {
        return true;
    }
    let n = a.len();
    (0..n).any(|shift| {
        (0..n).all(|i| points_almost_equal(&a[i], &b[(i + shift) % n], tolerance))
    })
}

// ============================================================================
// Internal Helper Functions
// ============================================================================

/// Convert regions to i_overlay path format
fn regions_to_paths(regions: &[Region]) -> Vec<Path> {
    let mut paths = Vec::with_capacity(regions.iter().map(|r| 1 + r.voids.len()).sum());

    for region in regions {
        paths.push(contour_to_path(&ensure_ccw(&region.perimeter)));
        for void in &region.voids {
            paths.push(contour_to_path(&ensure_cw(void)));
        }
    }

    paths
}

/// Convert a Point2 contour to i_overlay path format
fn contour_to_path(contour: &[Point2<f64>]) -> Path {
    contour.iter().map(|p| [p.x, p.y]).collect()
}

fn path_to_contour(path: &[[f64; 2]]) -> Vec<Point2<f64>> {
    path.iter().map(|p| Point2::new(p[0], p[1])).collect()
}

/// Convert i_overlay result shapes back to Regions
///
/// i_overlay returns Vec<Vec<Vec<[f64; 2]>>> where:
/// - Outer Vec: list of shapes
/// - Middle Vec: list of contours per shape (first is outer, rest are holes)
/// - Inner Vec: list of points per contour
pub(crate) fn shapes_to_regions(shapes: &[Vec<Path>], sources: &[Region]) -> Result<Vec<Region>> {
    let mut regions = Vec::with_capacity(shapes.len());

    for shape in shapes {
        let Some(outer) = shape.first() else {
            continue;
        };
        let perimeter = path_to_contour(outer);
        if !is_valid_contour(&perimeter) {
            continue;
        }

        let voids = shape
            .iter()
            .skip(1)
            .map(|c| path_to_contour(c))
            .filter(|c| is_valid_contour(c))
            .map(|c| ensure_cw(&c))
            .collect();

        let mut region = Region::with_voids(ensure_ccw(&perimeter), voids);
        if region.contours().flatten().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(Error::NonFinite("boolean result"));
        }
        region.properties = source_properties(&region, sources);
        regions.push(region);
    }

    Ok(regions)
}

/// Property bag of the source region that contains the fragment
fn source_properties(fragment: &Region, sources: &[Region]) -> PropertyBag {
    if sources.len() == 1 {
        return sources[0].properties.clone();
    }
    let probe = interior_point(fragment);
    sources
        .iter()
        .find(|s| s.contains(&probe))
        .or_else(|| sources.first())
        .map(|s| s.properties.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::PropertyValue;
    use approx::assert_relative_eq;

    fn square(min: f64, max: f64) -> Region {
        Region::rectangle(Point2::new(min, min), Point2::new(max, max))
    }

    #[test]
    fn test_compute_signed_area_ccw() {
        let contour = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let area = compute_signed_area(&contour);
        assert!((area - 1.0).abs() < EPSILON_2D);
    }

    #[test]
    fn test_compute_signed_area_cw() {
        let contour = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 0.0),
        ];
        let area = compute_signed_area(&contour);
        assert!((area + 1.0).abs() < EPSILON_2D);
    }

    #[test]
    fn test_difference_center_hole() {
        let result = difference(&[square(0.0, 10.0)], &[square(4.0, 6.0)]).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].voids.len(), 1);
        assert_eq!(result[0].perimeter.len(), 4);
        assert!(result[0].is_normalized());
        assert_relative_eq!(result[0].area(), 96.0, epsilon = 1e-6);
    }

    #[test]
    fn test_difference_splits_and_keeps_properties() {
        let minuend =
            square(0.0, 10.0).with_property("tag", PropertyValue::String("lobby".into()));
        let cut = Region::rectangle(Point2::new(4.0, -1.0), Point2::new(6.0, 11.0));
        let result = difference(&[minuend], &[cut]).unwrap();

        assert_eq!(result.len(), 2);
        for fragment in &result {
            assert_relative_eq!(fragment.area(), 40.0, epsilon = 1e-6);
            assert_eq!(fragment.property_str("tag"), Some("lobby"));
        }
    }

    #[test]
    fn test_difference_never_creates_area() {
        let minuends = [square(0.0, 10.0), square(20.0, 25.0)];
        let subtrahends = [square(8.0, 22.0), square(-5.0, 1.0)];
        let result = difference(&minuends, &subtrahends).unwrap();
        assert!(total_area(&result) <= total_area(&minuends) + 1e-9);
    }

    #[test]
    fn test_difference_fully_consumed() {
        let result = difference(&[square(2.0, 4.0)], &[square(0.0, 10.0)]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_difference_rejects_degenerate_subtrahend() {
        let bad = Region::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)]);
        assert!(difference(&[square(0.0, 10.0)], &[bad]).is_err());
    }

    #[test]
    fn test_difference_resilient_skips_bad_subtrahend() {
        let bad = Region::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(f64::INFINITY, 1.0),
            Point2::new(1.0, 1.0),
        ]);
        let result = difference_resilient(&square(0.0, 10.0), &[square(4.0, 6.0), bad]);

        assert_eq!(result.len(), 1);
        assert_relative_eq!(result[0].area(), 96.0, epsilon = 1e-6);
    }

    #[test]
    fn test_union_overlapping() {
        let result = union(&[square(0.0, 2.0), square(1.0, 3.0)]).unwrap();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result[0].area(), 7.0, epsilon = 1e-6);
    }

    #[test]
    fn test_point_in_contour() {
        let contour = square(0.0, 10.0).perimeter;

        assert!(point_in_contour(&Point2::new(5.0, 5.0), &contour));
        assert!(!point_in_contour(&Point2::new(15.0, 5.0), &contour));
        assert!(!point_in_contour(&Point2::new(-1.0, 5.0), &contour));
    }

    #[test]
    fn test_simplify_contour() {
        let contour = vec![
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0), // Collinear
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 10.00001), // Near-duplicate
            Point2::new(0.0, 10.0),
        ];

        let simplified = simplify_contour(&contour, 1e-4);
        assert_eq!(simplified.len(), 4);
    }

    #[test]
    fn test_is_valid_contour() {
        assert!(is_valid_contour(&square(0.0, 1.0).perimeter));

        let degenerate = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
        ];
        assert!(!is_valid_contour(&degenerate));

        let too_few = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        assert!(!is_valid_contour(&too_few));
    }

    #[test]
    fn test_contour_covers() {
        let outer = square(0.0, 10.0).perimeter;
        assert!(contour_covers(&outer, &square(2.0, 4.0).perimeter, 0.01));
        assert!(contour_covers(&outer, &square(0.0, 4.0).perimeter, 0.01));
        assert!(!contour_covers(&outer, &square(8.0, 12.0).perimeter, 0.01));
        assert!(!contour_covers(&square(2.0, 4.0).perimeter, &outer, 0.01));
    }

    #[test]
    fn test_contours_almost_equal_ignores_start_vertex() {
        let a = square(0.0, 10.0).perimeter;
        let mut b = a.clone();
        b.rotate_left(2);
        b[0].x += 0.5;
        assert!(contours_almost_equal(&a, &b, 1.0));
        assert!(!contours_almost_equal(&a, &b, 0.1));
        assert!(!contours_almost_equal(&a, &b[..3], 1.0));
    }
}
