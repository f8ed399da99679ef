// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building elements grouped by level.
//!
//! Deciding which level a wall or core belongs to is the caller's job. The
//! planner only consumes the result through [`LevelGrouping`].

use nalgebra::{Matrix4, Point2};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use spaceplan_geometry::Region;
use spaceplan_topology::Segment2;

/// Bucket for walls that could not be assigned to any level
pub const UNGROUPED_KEY: &str = "ungrouped";

/// A wall reduced to its plan centerline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallSegment {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
    pub height: f64,
}

impl WallSegment {
    pub fn new(start: Point2<f64>, end: Point2<f64>, height: f64) -> Self {
        Self { start, end, height }
    }

    pub fn centerline(&self) -> Segment2 {
        Segment2::new(self.start, self.end)
    }
}

/// A service core footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Core {
    pub region: Region,
}

/// A horizontal circulation zone (corridor) footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CirculationSegment {
    pub region: Region,
}

/// A stair or elevator shaft with a precomputed footprint per level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalCirculationElement {
    /// Level key -> footprint in the element's own frame
    pub profiles_at_level: FxHashMap<String, Region>,
    /// Element frame to plan coordinates
    pub transform: Matrix4<f64>,
}

impl VerticalCirculationElement {
    /// Footprint at `level_key` in plan coordinates
    pub fn footprint_at(&self, level_key: &str) -> Option<Region> {
        self.profiles_at_level
            .get(level_key)
            .map(|profile| profile.transformed(&self.transform))
    }
}

/// What the level-mapping collaborator provides.
pub trait LevelGrouping {
    fn walls_for(&self, level_key: &str) -> &[WallSegment];
    fn cores_for(&self, level_key: &str) -> &[Core];
    fn circulation_for(&self, level_key: &str) -> &[CirculationSegment];
    fn vertical_circulation_for(&self, level_key: &str) -> &[VerticalCirculationElement];
}

/// Plain map-backed grouping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelGroupedElements {
    pub walls: FxHashMap<String, Vec<WallSegment>>,
    pub cores: FxHashMap<String, Vec<Core>>,
    pub circulation: FxHashMap<String, Vec<CirculationSegment>>,
    pub vertical_circulation: FxHashMap<String, Vec<VerticalCirculationElement>>,
}

impl LevelGroupedElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_wall(&mut self, level_key: impl Into<String>, wall: WallSegment) {
        self.walls.entry(level_key.into()).or_default().push(wall);
    }

    pub fn add_core(&mut self, level_key: impl Into<String>, core: Core) {
        self.cores.entry(level_key.into()).or_default().push(core);
    }

    pub fn add_circulation(&mut self, level_key: impl Into<String>, segment: CirculationSegment) {
        self.circulation
            .entry(level_key.into())
            .or_default()
            .push(segment);
    }

    pub fn add_vertical_circulation(
        &mut self,
        level_key: impl Into<String>,
        element: VerticalCirculationElement,
    ) {
        self.vertical_circulation
            .entry(level_key.into())
            .or_default()
            .push(element);
    }

    /// Tallest ungrouped wall, if any
    pub fn max_ungrouped_wall_height(&self) -> Option<f64> {
        self.walls
            .get(UNGROUPED_KEY)?
            .iter()
            .map(|w| w.height)
            .max_by(f64::total_cmp)
    }
}

impl LevelGrouping for LevelGroupedElements {
    fn walls_for(&self, level_key: &str) -> &[WallSegment] {
        self.walls
            .get(level_key)
            .or_else(|| self.walls.get(UNGROUPED_KEY))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn cores_for(&self, level_key: &str) -> &[Core] {
        self.cores.get(level_key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn circulation_for(&self, level_key: &str) -> &[CirculationSegment] {
        self.circulation
            .get(level_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn vertical_circulation_for(&self, level_key: &str) -> &[VerticalCirculationElement] {
        self.vertical_circulation
            .get(level_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn wall(height: f64) -> WallSegment {
        WallSegment::new(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), height)
    }

    #[test]
    fn test_walls_fall_back_to_ungrouped() {
        let mut grouped = LevelGroupedElements::new();
        grouped.add_wall("L1", wall(3.0));
        grouped.add_wall(UNGROUPED_KEY, wall(5.0));
        grouped.add_wall(UNGROUPED_KEY, wall(4.0));

        assert_eq!(grouped.walls_for("L1").len(), 1);
        assert_eq!(grouped.walls_for("L2").len(), 2);
        assert_eq!(grouped.max_ungrouped_wall_height(), Some(5.0));
        assert!(grouped.cores_for("L1").is_empty());
    }

    #[test]
    fn test_vertical_circulation_footprint_is_transformed() {
        let mut profiles = FxHashMap::default();
        profiles.insert(
            "L1".to_string(),
            Region::rectangle(Point2::new(0.0, 0.0), Point2::new(2.0, 2.0)),
        );
        let shaft = VerticalCirculationElement {
            profiles_at_level: profiles,
            transform: Matrix4::new_translation(&Vector3::new(10.0, 0.0, 3.0)),
        };

        let footprint = shaft.footprint_at("L1").unwrap();
        assert_eq!(footprint.perimeter[0], Point2::new(10.0, 0.0));
        assert!(shaft.footprint_at("L2").is_none());
    }
}
