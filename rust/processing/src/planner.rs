// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The planning run: levels in, reconciled spaces out.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PlanningConfig;
use crate::error::Result;
use crate::grouping::LevelGroupedElements;
use crate::layout::{LevelLayout, LevelLayoutBuilder, SeedSpace};
use crate::level::LevelContext;
use crate::obstruction::resolve_obstructions;
use crate::overrides::SpaceOverrides;
use crate::program::{ProgramRegistry, ProgramRequirement};
use crate::reconcile::{AppliedCounts, OverrideReconciler};
use crate::space::{derive_space, Space};

/// Everything one run works from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningInput {
    pub levels: Vec<LevelContext>,
    pub elements: LevelGroupedElements,
    pub requirements: Vec<ProgramRequirement>,
    /// Spaces from an earlier plan; levels with seeds skip derivation
    pub seed_spaces: Vec<SeedSpace>,
    pub overrides: SpaceOverrides,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningOutput {
    pub spaces: Vec<Space>,
    /// One layout per planned level, rebuilt from the final spaces
    pub layouts: Vec<LevelLayout>,
    pub warnings: Vec<String>,
    /// Recovered per-level failures (room detection abandoned)
    pub errors: Vec<String>,
    pub placement_counts: FxHashMap<String, usize>,
    pub applied: AppliedCounts,
}

/// Result of deriving one level
struct DerivedLevel {
    spaces: Vec<Space>,
    error: Option<String>,
}

/// Runs the derivation and reconciliation pipeline.
pub struct SpacePlanner {
    config: PlanningConfig,
    registry: ProgramRegistry,
}

impl SpacePlanner {
    pub fn new(config: PlanningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: ProgramRegistry::new(),
        })
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    /// Registry state left by the last run
    pub fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    pub fn run(&mut self, input: &PlanningInput) -> PlanningOutput {
        self.registry.reset();
        self.registry.set_requirements(&input.requirements);

        let levels = self.planned_levels(input);
        self.register_colors(&levels, &input.seed_spaces);
        info!(levels = levels.len(), "Planning levels");

        let derived: Vec<DerivedLevel> = if self.config.parallel {
            levels
                .par_iter()
                .map(|level| self.derive_level(level, input))
                .collect()
        } else {
            levels
                .iter()
                .map(|level| self.derive_level(level, input))
                .collect()
        };

        let mut errors = Vec::new();
        let mut spaces = Vec::new();
        for (level, result) in levels.iter().zip(derived) {
            if let Some(err) = result.error {
                errors.push(format!("Could not detect rooms on level \"{}\": {err}", level.name));
            }
            spaces.extend(result.spaces);
        }
        info!(spaces = spaces.len(), "Derived spaces");

        let outcome = OverrideReconciler::new(&levels, &self.config, &mut self.registry)
            .reconcile(spaces, &input.overrides);

        let layouts = levels
            .iter()
            .map(|level| LevelLayout::from_spaces(level, &outcome.spaces))
            .collect();

        PlanningOutput {
            placement_counts: self.registry.placement_counts(&outcome.spaces),
            layouts,
            warnings: outcome.warnings,
            errors,
            applied: outcome.applied,
            spaces: outcome.spaces,
        }
    }

    /// Levels that get a layout; a stand-in level when the input has none.
    fn planned_levels(&self, input: &PlanningInput) -> Vec<LevelContext> {
        if input.levels.is_empty() {
            let height = input
                .elements
                .max_ungrouped_wall_height()
                .unwrap_or(self.config.default_level_height);
            return vec![LevelContext::dummy(height)];
        }

        input
            .levels
            .iter()
            .filter(|level| {
                let skipped = self
                    .config
                    .skips_use_category(level.primary_use_category.as_deref());
                if skipped {
                    debug!(level = %level.key, "Skipping level by use category");
                }
                !skipped
            })
            .cloned()
            .collect()
    }

    /// Colors for every program the derivation can assign, before fan-out.
    fn register_colors(&mut self, levels: &[LevelContext], seeds: &[SeedSpace]) {
        let programs = levels
            .iter()
            .filter_map(|l| l.primary_use_category.as_deref())
            .chain(seeds.iter().map(|s| s.program_type.as_str()));
        for program in programs {
            self.registry.ensure_color(program);
        }
    }

    fn derive_level(&self, level: &LevelContext, input: &PlanningInput) -> DerivedLevel {
        let builder = LevelLayoutBuilder::new(&self.config);
        let seeds: Vec<&SeedSpace> = input
            .seed_spaces
            .iter()
            .filter(|s| s.level_key == level.key)
            .collect();

        let (regions, error) = if seeds.is_empty() {
            let resolved = resolve_obstructions(level, &input.elements, &self.config);
            let regions = builder.build(
                level.boundary.as_ref(),
                &resolved.obstructions,
                &resolved.enclosed_rooms,
            );
            (regions, resolved.room_detection_error)
        } else {
            (builder.build_from_seed_spaces(&seeds), None)
        };

        let spaces: Vec<Space> = regions
            .iter()
            .enumerate()
            .map(|(index, region)| derive_space(region, index, level, &self.registry))
            .collect();
        debug!(level = %level.key, spaces = spaces.len(), "Derived level");

        DerivedLevel { spaces, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::DUMMY_LEVEL_KEY;
    use nalgebra::Point2;
    use spaceplan_geometry::Region;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Region {
        Region::rectangle(Point2::new(x0, y0), Point2::new(x1, y1))
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = PlanningConfig {
            tolerance: -1.0,
            ..PlanningConfig::default()
        };
        assert!(SpacePlanner::new(config).is_err());
    }

    #[test]
    fn test_no_levels_uses_stand_in_level() {
        let mut planner = SpacePlanner::new(PlanningConfig::default()).unwrap();
        let output = planner.run(&PlanningInput::default());

        assert!(output.spaces.is_empty());
        assert_eq!(output.layouts.len(), 1);
        assert_eq!(output.layouts[0].level_key, DUMMY_LEVEL_KEY);
    }

    #[test]
    fn test_skipped_use_category_gets_no_layout() {
        let mut residential = LevelContext::new("L2", "Level 2", 3.0)
            .with_boundary(rect(0.0, 0.0, 10.0, 10.0));
        residential.primary_use_category = Some("Residential".to_string());
        let input = PlanningInput {
            levels: vec![
                LevelContext::new("L1", "Level 1", 3.0).with_boundary(rect(0.0, 0.0, 10.0, 10.0)),
                residential,
            ],
            ..PlanningInput::default()
        };

        let mut planner = SpacePlanner::new(PlanningConfig::default()).unwrap();
        let output = planner.run(&input);
        assert_eq!(output.layouts.len(), 1);
        assert_eq!(output.spaces.len(), 1);
        assert_eq!(output.spaces[0].level_key, "L1");
    }

    #[test]
    fn test_seed_spaces_replace_derivation() {
        let input = PlanningInput {
            levels: vec![
                LevelContext::new("L1", "Level 1", 3.0).with_boundary(rect(0.0, 0.0, 10.0, 10.0)),
            ],
            seed_spaces: vec![
                SeedSpace {
                    level_key: "L1".to_string(),
                    boundary: rect(0.0, 0.0, 5.0, 10.0),
                    program_type: "Open Office".to_string(),
                },
                SeedSpace {
                    level_key: "L1".to_string(),
                    boundary: rect(5.0, 0.0, 10.0, 10.0),
                    program_type: "Gym".to_string(),
                },
            ],
            ..PlanningInput::default()
        };

        let mut planner = SpacePlanner::new(PlanningConfig::default()).unwrap();
        let output = planner.run(&input);
        let programs: Vec<&str> = output.spaces.iter().map(|s| s.program_type.as_str()).collect();
        assert_eq!(programs, vec!["Open Office", "Gym"]);
        assert_eq!(output.spaces[1].color, planner.registry().color_of("Gym"));
        assert_ne!(output.spaces[1].color, planner.registry().color_of("unrecognized"));
    }
}
