// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-level obstructions and enclosed rooms.

use serde::{Deserialize, Serialize};
use spaceplan_geometry::{nesting::exclude_nested_with_tolerance, Region};
use spaceplan_topology::PlanarNetwork;
use tracing::{debug, warn};

use crate::config::PlanningConfig;
use crate::error::Result;
use crate::grouping::{LevelGrouping, WallSegment};
use crate::level::LevelContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstructionKind {
    Core,
    Circulation,
    VerticalCirculation,
}

/// A footprint excluded from generated floor area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstruction {
    pub kind: ObstructionKind,
    pub region: Region,
}

/// Everything a level's layout is carved from.
#[derive(Debug, Clone, Default)]
pub struct LevelObstructions {
    pub obstructions: Vec<Obstruction>,
    pub enclosed_rooms: Vec<Region>,
    /// Why room detection was abandoned, if it was
    pub room_detection_error: Option<String>,
}

/// Collect the obstructions of `level` and detect its enclosed rooms.
///
/// Room detection failures are logged and leave the level without rooms.
pub fn resolve_obstructions<G>(
    level: &LevelContext,
    grouping: &G,
    config: &PlanningConfig,
) -> LevelObstructions
where
    G: LevelGrouping + ?Sized,
{
    let key = level.key.as_str();
    let mut obstructions: Vec<Obstruction> = Vec::new();

    obstructions.extend(grouping.circulation_for(key).iter().map(|c| Obstruction {
        kind: ObstructionKind::Circulation,
        region: c.region.clone(),
    }));
    obstructions.extend(
        grouping
            .vertical_circulation_for(key)
            .iter()
            .filter_map(|v| v.footprint_at(key))
            .map(|region| Obstruction {
                kind: ObstructionKind::VerticalCirculation,
                region,
            }),
    );
    obstructions.extend(grouping.cores_for(key).iter().map(|c| Obstruction {
        kind: ObstructionKind::Core,
        region: c.region.clone(),
    }));

    let (enclosed_rooms, room_detection_error) =
        match detect_rooms(grouping.walls_for(key), config.tolerance) {
            Ok(rooms) => (rooms, None),
            Err(err) => {
                warn!(level = %level.key, error = %err, "Room detection failed, continuing without rooms");
                (Vec::new(), Some(err.to_string()))
            }
        };

    debug!(
        level = %level.key,
        obstructions = obstructions.len(),
        rooms = enclosed_rooms.len(),
        "Resolved level obstructions"
    );

    LevelObstructions {
        obstructions,
        enclosed_rooms,
        room_detection_error,
    }
}

/// Counter-clockwise faces of the wall network, nested rooms turned into voids.
pub fn detect_rooms(walls: &[WallSegment], tolerance: f64) -> Result<Vec<Region>> {
    if walls.is_empty() {
        return Ok(Vec::new());
    }
    let network =
        PlanarNetwork::from_segments_with_tolerance(walls, |w| Some(w.centerline()), tolerance)?;

    let mut rooms = Vec::new();
    for cycle in network.find_all_closed_regions() {
        if !network.is_counter_clockwise(&cycle) {
            continue;
        }
        rooms.push(Region::new(network.region_polygon(&cycle)?));
    }

    Ok(exclude_nested_with_tolerance(&rooms, tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::{
        CirculationSegment, Core, LevelGroupedElements, VerticalCirculationElement, UNGROUPED_KEY,
    };
    use approx::assert_relative_eq;
    use nalgebra::{Matrix4, Point2, Vector3};
    use rustc_hash::FxHashMap;

    fn wall(x0: f64, y0: f64, x1: f64, y1: f64) -> WallSegment {
        WallSegment::new(Point2::new(x0, y0), Point2::new(x1, y1), 3.0)
    }

    fn box_walls(min: f64, max: f64) -> Vec<WallSegment> {
        vec![
            wall(min, min, max, min),
            wall(max, min, max, max),
            wall(max, max, min, max),
            wall(min, max, min, min),
        ]
    }

    fn square(min: f64, max: f64) -> Region {
        Region::rectangle(Point2::new(min, min), Point2::new(max, max))
    }

    #[test]
    fn test_collects_all_obstruction_kinds() {
        let mut grouped = LevelGroupedElements::new();
        grouped.add_core("L1", Core { region: square(0.0, 2.0) });
        grouped.add_circulation("L1", CirculationSegment { region: square(3.0, 4.0) });
        let mut profiles = FxHashMap::default();
        profiles.insert("L1".to_string(), square(0.0, 1.0));
        grouped.add_vertical_circulation(
            "L1",
            VerticalCirculationElement {
                profiles_at_level: profiles,
                transform: Matrix4::new_translation(&Vector3::new(8.0, 8.0, 0.0)),
            },
        );
        grouped.add_core("L2", Core { region: square(5.0, 6.0) });

        let level = LevelContext::new("L1", "Level 1", 3.0);
        let resolved = resolve_obstructions(&level, &grouped, &PlanningConfig::default());

        let kinds: Vec<ObstructionKind> = resolved.obstructions.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ObstructionKind::Circulation,
                ObstructionKind::VerticalCirculation,
                ObstructionKind::Core
            ]
        );
        assert_eq!(resolved.obstructions[1].region.perimeter[0], Point2::new(8.0, 8.0));
        assert!(resolved.enclosed_rooms.is_empty());
    }

    #[test]
    fn test_nested_wall_boxes_become_room_with_void() {
        let mut walls = box_walls(0.0, 10.0);
        walls.extend(box_walls(4.0, 6.0));
        let rooms = detect_rooms(&walls, 0.01).unwrap();

        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].voids.len(), 1);
        assert_relative_eq!(rooms[0].area(), 96.0, epsilon = 1e-9);
    }

    #[test]
    fn test_walls_fall_back_to_ungrouped_bucket() {
        let mut grouped = LevelGroupedElements::new();
        for w in box_walls(0.0, 5.0) {
            grouped.add_wall(UNGROUPED_KEY, w);
        }
        let level = LevelContext::new("L1", "Level 1", 3.0);
        let resolved = resolve_obstructions(&level, &grouped, &PlanningConfig::default());

        assert_eq!(resolved.enclosed_rooms.len(), 1);
        assert_relative_eq!(resolved.enclosed_rooms[0].area(), 25.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bad_walls_mean_no_rooms() {
        let mut grouped = LevelGroupedElements::new();
        let mut walls = box_walls(0.0, 5.0);
        walls.push(wall(0.0, f64::NAN, 1.0, 1.0));
        for w in walls {
            grouped.add_wall("L1", w);
        }
        let level = LevelContext::new("L1", "Level 1", 3.0);
        let resolved = resolve_obstructions(&level, &grouped, &PlanningConfig::default());

        assert!(resolved.enclosed_rooms.is_empty());
        assert!(resolved.room_detection_error.is_some());
    }
}
