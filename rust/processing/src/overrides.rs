// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! User override records.
//!
//! Space geometry is regenerated on every run, so overrides cannot refer to spaces
//! by id. They carry a [`SpaceIdentity`] instead, which the reconciler re-homes
//! onto whatever spaces the current run derived.

use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};
use spaceplan_geometry::Region;

/// Structural identity of a space across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceIdentity {
    pub level_key: String,
    /// Interior point in level-local coordinates
    pub relative_position: Point3<f64>,
    #[serde(default)]
    pub original_boundary: Option<Vec<Point2<f64>>>,
    #[serde(default)]
    pub original_voids: Option<Vec<Vec<Point2<f64>>>>,
}

impl SpaceIdentity {
    pub fn new(level_key: impl Into<String>, relative_position: Point3<f64>) -> Self {
        Self {
            level_key: level_key.into(),
            relative_position,
            original_boundary: None,
            original_voids: None,
        }
    }

    /// Recorded original boundary as a region, if one was recorded
    pub fn original_region(&self) -> Option<Region> {
        let perimeter = self.original_boundary.clone()?;
        let voids = self.original_voids.clone().unwrap_or_default();
        Some(Region::with_voids(perimeter, voids))
    }
}

/// A reference to a level by add id or name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelReference {
    #[serde(default)]
    pub add_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl LevelReference {
    /// Human-readable label for warnings
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.add_id.as_deref())
            .unwrap_or("<unnamed>")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceEditValue {
    #[serde(default)]
    pub boundary: Option<Region>,
    #[serde(default)]
    pub program_type: Option<String>,
}

/// Change the boundary and/or program of an existing space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceEdit {
    pub id: String,
    pub identity: SpaceIdentity,
    pub value: SpaceEditValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceAdditionValue {
    pub boundary: Region,
    #[serde(default)]
    pub program_type: Option<String>,
    #[serde(default)]
    pub level: Option<LevelReference>,
    /// Older records name the level's layout instead of the level
    #[serde(default)]
    pub level_layout: Option<LevelReference>,
}

/// A user-drawn space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceAddition {
    pub id: String,
    pub value: SpaceAdditionValue,
}

impl SpaceAddition {
    /// Label of the level this addition targets, for warnings
    pub fn level_label(&self) -> &str {
        self.value
            .level
            .as_ref()
            .or(self.value.level_layout.as_ref())
            .map_or("<unnamed>", LevelReference::label)
    }
}

/// Remove (all or part of) a derived space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceRemoval {
    pub id: String,
    pub identity: SpaceIdentity,
    /// Area to take away; defaults to the identity's original boundary
    #[serde(default)]
    pub footprint: Option<Region>,
}

impl SpaceRemoval {
    /// Footprint to subtract; `None` removes a matched space outright
    pub fn effective_footprint(&self) -> Option<Region> {
        self.footprint
            .clone()
            .or_else(|| self.identity.original_region())
    }
}

/// All overrides supplied for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceOverrides {
    pub edits: Vec<SpaceEdit>,
    pub additions: Vec<SpaceAddition>,
    pub removals: Vec<SpaceRemoval>,
}

impl SpaceOverrides {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.additions.is_empty() && self.removals.is_empty()
    }
}
