// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygonal regions with holes and their property bags

use crate::bool2d::{
    compute_signed_area, contour_bounds, ensure_ccw, ensure_cw, point_in_contour,
    point_on_contour,
};
use crate::error::{Error, Result};
use nalgebra::{Matrix4, Point2, Point3};
use rustc_hash::FxHashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default distance below which two points are treated as the same point
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Property key under which a carried-over program name travels with a region
pub const LEGACY_PROGRAM_KEY: &str = "Legacy Program Assignment";

/// A typed value stored in a region's property bag.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PropertyValue {
    Int(i64),
    Double(f64),
    String(String),
    Bool(bool),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Open-ended key-value metadata that follows a region through boolean operations.
pub type PropertyBag = FxHashMap<String, PropertyValue>;

/// Polygonal region with optional holes
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    /// Outer boundary (counter-clockwise)
    pub perimeter: Vec<Point2<f64>>,
    /// Holes (clockwise)
    #[cfg_attr(feature = "serde", serde(default))]
    pub voids: Vec<Vec<Point2<f64>>>,
    /// Carried-over metadata
    #[cfg_attr(feature = "serde", serde(default))]
    pub properties: PropertyBag,
}

impl Region {
    /// Create a region without holes
    pub fn new(perimeter: Vec<Point2<f64>>) -> Self {
        Self {
            perimeter,
            voids: Vec::new(),
            properties: PropertyBag::default(),
        }
    }

    /// Create a region with holes
    pub fn with_voids(perimeter: Vec<Point2<f64>>, voids: Vec<Vec<Point2<f64>>>) -> Self {
        Self {
            perimeter,
            voids,
            properties: PropertyBag::default(),
        }
    }

    /// Axis-aligned rectangle spanning `min`..`max`, counter-clockwise
    pub fn rectangle(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self::new(vec![
            Point2::new(min.x, min.y),
            Point2::new(max.x, min.y),
            Point2::new(max.x, max.y),
            Point2::new(min.x, max.y),
        ])
    }

    /// Builder-style property assignment
    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// String property lookup
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(PropertyValue::as_str)
    }

    /// Add a hole to the region
    pub fn add_void(&mut self, void: Vec<Point2<f64>>) {
        self.voids.push(void);
    }

    /// Signed area: perimeter area plus the (signed) areas of the voids.
    ///
    /// For a normalized region this is the net enclosed area.
    pub fn signed_area(&self) -> f64 {
        compute_signed_area(&self.perimeter)
            + self
                .voids
                .iter()
                .map(|v| compute_signed_area(v))
                .sum::<f64>()
    }

    /// Net area regardless of winding
    pub fn area(&self) -> f64 {
        let voids: f64 = self.voids.iter().map(|v| compute_signed_area(v).abs()).sum();
        (compute_signed_area(&self.perimeter).abs() - voids).max(0.0)
    }

    /// Perimeter counter-clockwise, voids clockwise
    pub fn normalized(&self) -> Self {
        Self {
            perimeter: ensure_ccw(&self.perimeter),
            voids: self.voids.iter().map(|v| ensure_cw(v)).collect(),
            properties: self.properties.clone(),
        }
    }

    pub fn is_normalized(&self) -> bool {
        compute_signed_area(&self.perimeter) > 0.0
            && self.voids.iter().all(|v| compute_signed_area(v) < 0.0)
    }

    /// Every contour with its winding reversed
    pub fn reversed(&self) -> Self {
        let rev = |c: &Vec<Point2<f64>>| c.iter().rev().copied().collect::<Vec<_>>();
        Self {
            perimeter: rev(&self.perimeter),
            voids: self.voids.iter().map(rev).collect(),
            properties: self.properties.clone(),
        }
    }

    /// Point containment with the boundary counted as inside
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        self.contains_with_tolerance(point, DEFAULT_TOLERANCE)
    }

    pub fn contains_with_tolerance(&self, point: &Point2<f64>, tolerance: f64) -> bool {
        let in_perimeter = point_on_contour(point, &self.perimeter, tolerance)
            || point_in_contour(point, &self.perimeter);
        if !in_perimeter {
            return false;
        }
        !self
            .voids
            .iter()
            .any(|v| point_in_contour(point, v) && !point_on_contour(point, v, tolerance))
    }

    /// Strict containment: inside the perimeter and outside every void, boundaries excluded
    pub fn contains_strictly(&self, point: &Point2<f64>, tolerance: f64) -> bool {
        point_in_contour(point, &self.perimeter)
            && !point_on_contour(point, &self.perimeter, tolerance)
            && !self
                .voids
                .iter()
                .any(|v| point_in_contour(point, v) || point_on_contour(point, v, tolerance))
    }

    pub fn bounds(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        contour_bounds(&self.perimeter)
    }

    /// Perimeter followed by voids
    pub fn contours(&self) -> impl Iterator<Item = &Vec<Point2<f64>>> {
        std::iter::once(&self.perimeter).chain(self.voids.iter())
    }

    /// All boundary edges (perimeter and voids)
    pub fn segments(&self) -> Vec<(Point2<f64>, Point2<f64>)> {
        self.contours()
            .flat_map(|c| {
                let n = c.len();
                (0..n).map(move |i| (c[i], c[(i + 1) % n]))
            })
            .collect()
    }

    /// Apply a homogeneous transform, dropping the resulting Z
    pub fn transformed(&self, transform: &Matrix4<f64>) -> Self {
        let apply = |c: &Vec<Point2<f64>>| {
            c.iter()
                .map(|p| {
                    let t = transform.transform_point(&Point3::new(p.x, p.y, 0.0));
                    Point2::new(t.x, t.y)
                })
                .collect::<Vec<_>>()
        };
        Self {
            perimeter: apply(&self.perimeter),
            voids: self.voids.iter().map(apply).collect(),
            properties: self.properties.clone(),
        }
    }

    /// Check that every contour is usable for boolean operations
    pub fn validate(&self) -> Result<()> {
        if self.perimeter.len() < 3 {
            return Err(Error::invalid("perimeter must have at least 3 vertices"));
        }
        if self.voids.iter().any(|v| v.len() < 3) {
            return Err(Error::invalid("void must have at least 3 vertices"));
        }
        let finite = self
            .contours()
            .flatten()
            .all(|p| p.x.is_finite() && p.y.is_finite());
        if !finite {
            return Err(Error::NonFinite("region"));
        }
        Ok(())
    }
}
