// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Level layouts: the ordered region list a level's spaces are made from.
//!
//! The order of operations matters. Enclosed rooms are cut out of the boundary fill
//! before they are appended, so the fill never swallows them again, and obstructions
//! are cut out of every region one region at a time, because a batch subtraction
//! would merge neighbouring regions that share an edge.

use serde::{Deserialize, Serialize};
use spaceplan_geometry::{
    clean, difference, difference_resilient, resilient_reduce, PropertyValue, Region,
    LEGACY_PROGRAM_KEY,
};
use tracing::debug;

use crate::config::PlanningConfig;
use crate::level::LevelContext;
use crate::obstruction::Obstruction;
use crate::space::Space;

/// A space carried over from an earlier plan, used instead of derived regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedSpace {
    pub level_key: String,
    pub boundary: Region,
    pub program_type: String,
}

/// The regions of one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    pub level_key: String,
    pub name: String,
    pub add_id: String,
    pub regions: Vec<Region>,
}

impl LevelLayout {
    pub fn new(level: &LevelContext, regions: Vec<Region>) -> Self {
        Self {
            level_key: level.key.clone(),
            name: level.layout_name(),
            add_id: level.layout_add_id(),
            regions,
        }
    }

    /// Layout of the final spaces on `level`
    pub fn from_spaces(level: &LevelContext, spaces: &[Space]) -> Self {
        let regions = spaces
            .iter()
            .filter(|s| s.level_key == level.key)
            .map(|s| s.boundary.clone())
            .collect();
        Self::new(level, regions)
    }

    /// Every region edge, for drawing the plan
    pub fn boundary_segments(&self) -> Vec<(nalgebra::Point2<f64>, nalgebra::Point2<f64>)> {
        self.regions.iter().flat_map(Region::segments).collect()
    }

    pub fn total_area(&self) -> f64 {
        spaceplan_geometry::total_area(&self.regions)
    }
}

/// Builds the region list of a level.
pub struct LevelLayoutBuilder<'a> {
    config: &'a PlanningConfig,
}

impl<'a> LevelLayoutBuilder<'a> {
    pub fn new(config: &'a PlanningConfig) -> Self {
        Self { config }
    }

    /// Boundary fill, then rooms, then obstructions, then cleaning.
    pub fn build(
        &self,
        boundary: Option<&Region>,
        obstructions: &[Obstruction],
        rooms: &[Region],
    ) -> Vec<Region> {
        let mut regions: Vec<Region> = Vec::new();
        if self.config.auto_generate {
            regions.extend(boundary.cloned());
        }

        if !rooms.is_empty() {
            if !regions.is_empty() {
                regions = resilient_reduce(
                    regions,
                    rooms,
                    |acc, batch| difference(acc, batch),
                    "room subtraction",
                );
            }
            regions.extend(rooms.iter().cloned());
        }

        if !obstructions.is_empty() && !regions.is_empty() {
            let cutters: Vec<Region> = obstructions.iter().map(|o| o.region.clone()).collect();
            regions = regions
                .iter()
                .flat_map(|region| difference_resilient(region, &cutters))
                .collect();
        }

        let cleaned = clean(&regions, &self.config.clean_options());
        debug!(
            rooms = rooms.len(),
            obstructions = obstructions.len(),
            regions = cleaned.len(),
            "Built level layout"
        );
        cleaned
    }

    /// Regions taken from carried-over spaces, tagged with their program.
    ///
    /// Rooms and obstructions are not applied again; the seeds already reflect them.
    pub fn build_from_seed_spaces(&self, seeds: &[&SeedSpace]) -> Vec<Region> {
        let tagged: Vec<Region> = seeds
            .iter()
            .map(|seed| {
                seed.boundary.clone().with_property(
                    LEGACY_PROGRAM_KEY,
                    PropertyValue::String(seed.program_type.clone()),
                )
            })
            .collect();
        clean(&tagged, &self.config.clean_options())
    }
}
