// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SpacePlan Region Geometry
//!
//! Polygonal regions with holes and the algebra the space pipeline runs on:
//! boolean difference and union over i_overlay, miter offsetting, batch cleaning,
//! nested-region exclusion and interior points. nalgebra supplies the point and
//! transform types.

pub mod bool2d;
pub mod clean;
pub mod error;
pub mod interior;
pub mod nesting;
pub mod offset;
pub mod region;
pub mod resilient;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector2, Vector3};

pub use bool2d::{
    contour_covers, contours_almost_equal, difference, difference_resilient, largest_region,
    points_almost_equal, total_area, union,
};
pub use clean::{clean, CleanOptions};
pub use error::{Error, Result};
pub use interior::interior_point;
pub use nesting::exclude_nested;
pub use offset::{offset_region, shrink_grow};
pub use region::{PropertyBag, PropertyValue, Region, DEFAULT_TOLERANCE, LEGACY_PROGRAM_KEY};
pub use resilient::resilient_reduce;
