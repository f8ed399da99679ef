// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed spaces derived from layout regions.

use nalgebra::{Matrix4, Point2, Point3};
use serde::{Deserialize, Serialize};
use spaceplan_geometry::{contours_almost_equal, interior_point, Region, LEGACY_PROGRAM_KEY};

use crate::error::Result;
use crate::level::{plan_frame, LevelContext, DUMMY_LEVEL_KEY};
use crate::overrides::SpaceIdentity;
use crate::program::{Color, ProgramRegistry, UNSPECIFIED_PROGRAM};

/// Edge thickness applied to enclosed programs: 3 in on both sides
pub const ENCLOSED_EDGE_THICKNESS: (f64, f64) = (0.0762, 0.0762);

/// A unit of floor area with a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Run-local id; not stable across runs
    pub id: String,
    /// Boundary in plan coordinates, perimeter counter-clockwise
    pub boundary: Region,
    pub program_type: String,
    pub display_name: String,
    pub program_group: Option<String>,
    /// Qualified name of the requirement this space fulfils
    pub requirement: Option<String>,
    pub color: Color,
    pub edge_thickness: Option<(f64, f64)>,
    pub area: f64,
    pub height: f64,
    pub elevation_transform: Matrix4<f64>,
    pub local_coordinate_system: Matrix4<f64>,
    pub level_key: String,
    pub level_name: String,
    pub building_name: Option<String>,
    /// Interior point in level-local coordinates
    pub relative_position: Point3<f64>,
    pub original_boundary: Vec<Point2<f64>>,
    pub original_voids: Vec<Vec<Point2<f64>>>,
    /// Drawn by the user rather than derived
    pub user_authored: bool,
}

/// How strictly [`Space::matches`] compares identities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    /// Every identity belongs to the only level there is
    pub single_level: bool,
    /// Per-vertex tolerance for recorded boundaries
    pub boundary_tolerance: f64,
    /// Distance within which the recorded position counts as on the boundary
    pub tolerance: f64,
}

/// Turn a layout region into a space on `level`.
///
/// The program comes from the region's carried-over assignment, else the level's
/// primary use, else [`UNSPECIFIED_PROGRAM`].
pub fn derive_space(
    region: &Region,
    index: usize,
    level: &LevelContext,
    registry: &ProgramRegistry,
) -> Space {
    let program = region
        .property_str(LEGACY_PROGRAM_KEY)
        .or(level.primary_use_category.as_deref())
        .unwrap_or(UNSPECIFIED_PROGRAM)
        .to_string();

    let boundary = region.normalized();
    let anchor = interior_point(&boundary);
    let resolution = registry.resolve(&program);

    Space {
        id: format!("{}:{}", level.key, index),
        area: boundary.area(),
        original_boundary: boundary.perimeter.clone(),
        original_voids: boundary.voids.clone(),
        relative_position: level.to_local(&anchor),
        boundary,
        program_type: program,
        display_name: resolution.display_name,
        program_group: resolution.program_group,
        requirement: resolution.requirement,
        color: resolution.color,
        edge_thickness: resolution.enclosed.then_some(ENCLOSED_EDGE_THICKNESS),
        height: level.height,
        elevation_transform: level.elevation_transform,
        local_coordinate_system: level.local_coordinate_system,
        level_key: level.key.clone(),
        level_name: level.name.clone(),
        building_name: level.building_name.clone(),
        user_authored: false,
    }
}

impl Space {
    /// Identity this space would be recorded under by an override
    pub fn identity(&self) -> SpaceIdentity {
        SpaceIdentity {
            level_key: self.level_key.clone(),
            relative_position: self.relative_position,
            original_boundary: Some(self.original_boundary.clone()),
            original_voids: Some(self.original_voids.clone()),
        }
    }

    /// Does a recorded identity refer to this space?
    ///
    /// The level must match (always true on the stand-in level or when there is a
    /// single level), the recorded position must fall inside the current boundary,
    /// and recorded and current original boundaries must agree when both exist.
    pub fn matches(&self, identity: &SpaceIdentity, policy: &MatchPolicy) -> bool {
        let level_match = policy.single_level
            || self.level_key == DUMMY_LEVEL_KEY
            || identity.level_key == self.level_key;
        if !level_match {
            return false;
        }

        let boundary_match = match &identity.original_boundary {
            Some(recorded) if !self.original_boundary.is_empty() => contours_almost_equal(
                recorded,
                &self.original_boundary,
                policy.boundary_tolerance,
            ),
            _ => true,
        };
        if !boundary_match {
            return false;
        }

        let world = plan_frame(&self.local_coordinate_system)
            .transform_point(&identity.relative_position);
        self.boundary
            .contains_with_tolerance(&Point2::new(world.x, world.y), policy.tolerance)
    }

    /// Reassign the program, re-resolving display name, color and requirement.
    ///
    /// An enclosed program thickens the edge; moving back to an open program keeps
    /// whatever edge thickness the space already had.
    pub fn set_program(&mut self, name: &str, registry: &mut ProgramRegistry) {
        self.color = registry.ensure_color(name);
        let resolution = registry.resolve(name);

        self.display_name = match registry.find_requirement(name) {
            Some(requirement) if requirement.space_type != UNSPECIFIED_PROGRAM => {
                requirement.space_type.clone()
            }
            _ => name.to_string(),
        };
        self.program_group = resolution.program_group;
        self.requirement = resolution.requirement;
        if resolution.enclosed && self.edge_thickness.is_none() {
            self.edge_thickness = Some(ENCLOSED_EDGE_THICKNESS);
        }
        self.program_type = name.to_string();
    }

    /// Replace the boundary; identity snapshots stay as they were.
    ///
    /// An invalid boundary is rejected and the current one kept.
    pub fn set_boundary(&mut self, boundary: &Region) -> Result<()> {
        boundary.validate()?;
        self.boundary = boundary.normalized();
        self.area = self.boundary.area();
        Ok(())
    }
}
