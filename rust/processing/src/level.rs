// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Levels and their working planes.

use nalgebra::{Matrix4, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};
use spaceplan_geometry::Region;
use tracing::warn;

/// Key of the level synthesized when a run has no levels at all
pub const DUMMY_LEVEL_KEY: &str = "dummy-level-volume";

/// Default storey height: 14 ft
pub const DEFAULT_LEVEL_HEIGHT: f64 = 4.2672;

/// A floor of the building as seen by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelContext {
    /// Stable textual key; override identities refer to levels by it
    pub key: String,
    pub name: String,
    pub add_id: Option<String>,
    pub building_name: Option<String>,
    /// Outer envelope of the floor, absent when none was modeled
    pub boundary: Option<Region>,
    pub height: f64,
    /// Placement of the level; the elevation is in its translation
    pub elevation_transform: Matrix4<f64>,
    /// Frame relative positions are expressed in
    pub local_coordinate_system: Matrix4<f64>,
    pub primary_use_category: Option<String>,
}

/// A bare level as listed in a building model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub name: String,
    pub elevation: f64,
    #[serde(default)]
    pub add_id: Option<String>,
    #[serde(default)]
    pub building_name: Option<String>,
    #[serde(default)]
    pub boundary: Option<Region>,
    #[serde(default)]
    pub primary_use_category: Option<String>,
}

impl LevelContext {
    pub fn new(key: impl Into<String>, name: impl Into<String>, height: f64) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            add_id: None,
            building_name: None,
            boundary: None,
            height,
            elevation_transform: Matrix4::identity(),
            local_coordinate_system: Matrix4::identity(),
            primary_use_category: None,
        }
    }

    /// Stand-in level for runs without any level definitions.
    pub fn dummy(height: f64) -> Self {
        let mut level = Self::new(DUMMY_LEVEL_KEY, DUMMY_LEVEL_KEY, height);
        level.add_id = Some(DUMMY_LEVEL_KEY.to_string());
        level
    }

    /// Builds contexts from bare levels, each spanning up to the next elevation.
    ///
    /// The topmost level only closes the storey below it and yields no context.
    pub fn from_elevations(definitions: &[LevelDefinition]) -> Vec<Self> {
        let mut sorted: Vec<&LevelDefinition> = definitions.iter().collect();
        sorted.sort_by(|a, b| a.elevation.total_cmp(&b.elevation));

        sorted
            .windows(2)
            .map(|pair| {
                let (level, next) = (pair[0], pair[1]);
                let key = level.add_id.clone().unwrap_or_else(|| level.name.clone());
                Self {
                    key,
                    name: level.name.clone(),
                    add_id: level.add_id.clone(),
                    building_name: level.building_name.clone(),
                    boundary: level.boundary.clone(),
                    height: next.elevation - level.elevation,
                    elevation_transform: Matrix4::new_translation(&Vector3::new(
                        0.0,
                        0.0,
                        level.elevation,
                    )),
                    local_coordinate_system: Matrix4::identity(),
                    primary_use_category: level.primary_use_category.clone(),
                }
            })
            .collect()
    }

    pub fn with_boundary(mut self, boundary: Region) -> Self {
        self.boundary = Some(boundary);
        self
    }

    pub fn is_dummy(&self) -> bool {
        self.key == DUMMY_LEVEL_KEY
    }

    pub fn elevation(&self) -> f64 {
        self.elevation_transform[(2, 3)]
    }

    /// Add id of this level's layout
    pub fn layout_add_id(&self) -> String {
        format!("{}-layout", self.add_id.as_deref().unwrap_or(&self.name))
    }

    /// Display name of this level's layout
    pub fn layout_name(&self) -> String {
        format!("{} Layout", self.name)
    }

    /// Coordinate system used to map local points to plan; see [`plan_frame`].
    pub fn plan_frame(&self) -> Matrix4<f64> {
        plan_frame(&self.local_coordinate_system)
    }

    /// Plan point to level-local coordinates.
    ///
    /// A singular coordinate system is treated as the identity.
    pub fn to_local(&self, point: &Point2<f64>) -> Point3<f64> {
        let world = Point3::new(point.x, point.y, 0.0);
        match self.local_coordinate_system.try_inverse() {
            Some(inverse) => inverse.transform_point(&world),
            None => {
                warn!(level = %self.key, "Level coordinate system is singular, using identity");
                world
            }
        }
    }

    /// Level-local point back to plan coordinates
    pub fn to_plan(&self, local: &Point3<f64>) -> Point2<f64> {
        let world = self.plan_frame().transform_point(local);
        Point2::new(world.x, world.y)
    }
}

/// `lcs` itself when invertible, else the identity, so that local positions taken
/// with [`LevelContext::to_local`] map back onto the points they came from.
pub fn plan_frame(lcs: &Matrix4<f64>) -> Matrix4<f64> {
    if lcs.try_inverse().is_some() {
        *lcs
    } else {
        Matrix4::identity()
    }
}
