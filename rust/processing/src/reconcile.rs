// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Override reconciliation.
//!
//! Re-applies saved edits, additions and removals to freshly derived spaces. Nothing
//! about a space survives between runs except the identity an override recorded, so
//! every run starts from the override records again:
//!
//! 1. prune overrides whose level is gone
//! 2. apply removals to derived spaces (clip, or delete when consumed)
//! 3. create the added spaces
//! 4. apply edits to any space, derived or added
//!
//! Within each kind the first matching space wins, in record order.

use serde::{Deserialize, Serialize};
use spaceplan_geometry::{difference_resilient, largest_region, Region};
use tracing::{debug, info, warn};

use crate::config::PlanningConfig;
use crate::level::LevelContext;
use crate::overrides::{SpaceAddition, SpaceEdit, SpaceOverrides, SpaceRemoval};
use crate::program::ProgramRegistry;
use crate::space::{derive_space, MatchPolicy, Space};

/// How many overrides of each kind took effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCounts {
    pub edits: usize,
    pub additions: usize,
    pub removals: usize,
    /// Overrides dropped because their level no longer exists
    pub pruned: usize,
    /// Edits and removals that matched no space
    pub unmatched: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub spaces: Vec<Space>,
    /// User-facing messages about overrides that could not be applied
    pub warnings: Vec<String>,
    pub applied: AppliedCounts,
}

/// Applies one run's overrides to the spaces derived for `levels`.
pub struct OverrideReconciler<'a> {
    levels: &'a [LevelContext],
    config: &'a PlanningConfig,
    registry: &'a mut ProgramRegistry,
}

/// What a removal does to the space it matched
#[derive(Debug, Clone, PartialEq)]
enum RemovalEffect {
    Delete,
    Clip(Region),
    Keep,
}

impl<'a> OverrideReconciler<'a> {
    pub fn new(
        levels: &'a [LevelContext],
        config: &'a PlanningConfig,
        registry: &'a mut ProgramRegistry,
    ) -> Self {
        Self {
            levels,
            config,
            registry,
        }
    }

    fn policy(&self) -> MatchPolicy {
        MatchPolicy {
            single_level: self.levels.len() == 1,
            boundary_tolerance: self.config.boundary_match_tolerance,
            tolerance: self.config.tolerance,
        }
    }

    fn has_level(&self, key: &str) -> bool {
        self.levels.len() == 1 || self.levels.iter().any(|l| l.key == key)
    }

    pub fn reconcile(
        &mut self,
        spaces: Vec<Space>,
        overrides: &SpaceOverrides,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome {
            spaces,
            ..ReconcileOutcome::default()
        };

        let removals: Vec<&SpaceRemoval> = overrides
            .removals
            .iter()
            .filter(|r| self.keep_override(&r.id, &r.identity.level_key, &mut outcome.applied))
            .collect();
        let edits: Vec<&SpaceEdit> = overrides
            .edits
            .iter()
            .filter(|e| self.keep_override(&e.id, &e.identity.level_key, &mut outcome.applied))
            .collect();

        for removal in removals {
            self.apply_removal(removal, &mut outcome);
        }
        for addition in &overrides.additions {
            self.apply_addition(addition, &mut outcome);
        }
        for edit in edits {
            self.apply_edit(edit, &mut outcome);
        }

        info!(
            spaces = outcome.spaces.len(),
            edits = outcome.applied.edits,
            additions = outcome.applied.additions,
            removals = outcome.applied.removals,
            pruned = outcome.applied.pruned,
            "Reconciled overrides"
        );
        outcome
    }

    fn keep_override(&self, id: &str, level_key: &str, applied: &mut AppliedCounts) -> bool {
        if self.has_level(level_key) {
            return true;
        }
        warn!(id, level = level_key, "Dropping override for a level that no longer exists");
        applied.pruned += 1;
        false
    }

    fn apply_removal(&self, removal: &SpaceRemoval, outcome: &mut ReconcileOutcome) {
        let policy = self.policy();
        let Some(index) = outcome
            .spaces
            .iter()
            .position(|s| !s.user_authored && s.matches(&removal.identity, &policy))
        else {
            debug!(id = %removal.id, "Removal matched no space");
            outcome.applied.unmatched += 1;
            return;
        };

        match self.removal_effect(&outcome.spaces[index], removal) {
            RemovalEffect::Delete => {
                let space = outcome.spaces.remove(index);
                debug!(id = %removal.id, space = %space.id, "Removed space");
            }
            RemovalEffect::Clip(remaining) => {
                if let Err(err) = outcome.spaces[index].set_boundary(&remaining) {
                    warn!(id = %removal.id, error = %err, "Clipped boundary rejected, keeping space");
                    outcome.applied.unmatched += 1;
                    return;
                }
                debug!(id = %removal.id, area = outcome.spaces[index].area, "Clipped space");
            }
            RemovalEffect::Keep => {
                outcome.applied.unmatched += 1;
                return;
            }
        }
        outcome.applied.removals += 1;
    }

    fn removal_effect(&self, space: &Space, removal: &SpaceRemoval) -> RemovalEffect {
        let Some(footprint) = removal.effective_footprint() else {
            return RemovalEffect::Delete;
        };
        let remaining = difference_resilient(&space.boundary, std::slice::from_ref(&footprint));
        let untouched = remaining.len() == 1
            && (remaining[0].area() - space.area).abs() <= 1e-9 * space.area.max(1.0);
        if untouched {
            return RemovalEffect::Keep;
        }
        match largest_region(remaining) {
            Some(largest) if largest.area() >= self.config.min_space_area => {
                RemovalEffect::Clip(largest)
            }
            _ => RemovalEffect::Delete,
        }
    }

    /// Level an addition targets: add id, level name, layout add id, layout name,
    /// and finally the only level there is.
    fn resolve_addition_level(&self, addition: &SpaceAddition) -> Option<&'a LevelContext> {
        let value = &addition.value;
        let level_ref = value.level.as_ref();
        let layout_ref = value.level_layout.as_ref();
        let levels = self.levels;

        let by_add_id = level_ref.and_then(|r| r.add_id.as_deref()).and_then(|id| {
            levels.iter().find(|l| l.add_id.as_deref() == Some(id))
        });
        let by_name = || {
            level_ref
                .and_then(|r| r.name.as_deref())
                .and_then(|name| levels.iter().find(|l| l.name == name))
        };
        let by_layout_id = || {
            layout_ref
                .and_then(|r| r.add_id.as_deref())
                .and_then(|id| levels.iter().find(|l| l.layout_add_id() == id))
        };
        let by_layout_name = || {
            layout_ref
                .and_then(|r| r.name.as_deref())
                .and_then(|name| levels.iter().find(|l| l.layout_name() == name))
        };
        let only = || (levels.len() == 1).then(|| &levels[0]);

        by_add_id
            .or_else(by_name)
            .or_else(by_layout_id)
            .or_else(by_layout_name)
            .or_else(only)
    }

    fn apply_addition(&mut self, addition: &SpaceAddition, outcome: &mut ReconcileOutcome) {
        let Some(level) = self.resolve_addition_level(addition) else {
            let message = format!(
                "Could not find level \"{}\" for added space {}; skipping.",
                addition.level_label(),
                addition.id
            );
            warn!("{message}");
            outcome.warnings.push(message);
            outcome.applied.pruned += 1;
            return;
        };

        let index = outcome.spaces.len();
        let mut space = derive_space(&addition.value.boundary, index, level, &*self.registry);
        space.id = format!("{}:added:{}", level.key, addition.id);
        space.user_authored = true;
        if let Some(program) = &addition.value.program_type {
            space.set_program(program, self.registry);
        }
        debug!(id = %addition.id, level = %level.key, area = space.area, "Added space");
        outcome.spaces.push(space);
        outcome.applied.additions += 1;
    }

    fn apply_edit(&mut self, edit: &SpaceEdit, outcome: &mut ReconcileOutcome) {
        let policy = self.policy();
        let Some(space) = outcome
            .spaces
            .iter_mut()
            .find(|s| s.matches(&edit.identity, &policy))
        else {
            debug!(id = %edit.id, "Edit matched no space");
            outcome.applied.unmatched += 1;
            return;
        };

        let mut changed = false;
        if let Some(boundary) = &edit.value.boundary {
            match space.set_boundary(boundary) {
                Ok(()) => changed = true,
                Err(err) => {
                    let message = format!(
                        "Invalid boundary for edited space {} ({err}); keeping the current boundary.",
                        edit.id
                    );
                    warn!("{message}");
                    outcome.warnings.push(message);
                }
            }
        }
        if let Some(program) = &edit.value.program_type {
            space.set_program(program, self.registry);
            changed = true;
        }
        if changed {
            outcome.applied.edits += 1;
        } else {
            outcome.applied.unmatched += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overrides::{LevelReference, SpaceAdditionValue, SpaceEditValue, SpaceIdentity};
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Point3};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Region {
        Region::rectangle(Point2::new(x0, y0), Point2::new(x1, y1))
    }

    fn levels(keys: &[&str]) -> Vec<LevelContext> {
        keys.iter()
            .map(|k| LevelContext::new(*k, format!("Level {k}"), 3.0))
            .collect()
    }

    fn space_on(level: &LevelContext, region: Region, registry: &ProgramRegistry) -> Space {
        derive_space(&region, 0, level, registry)
    }

    fn edit(level_key: &str, x: f64, y: f64, program: &str) -> SpaceEdit {
        SpaceEdit {
            id: format!("edit-{level_key}"),
            identity: SpaceIdentity::new(level_key, Point3::new(x, y, 0.0)),
            value: SpaceEditValue {
                boundary: None,
                program_type: Some(program.to_string()),
            },
        }
    }

    #[test]
    fn test_edit_changes_program_only() {
        let levels = levels(&["L1", "L2"]);
        let config = PlanningConfig::default();
        let mut registry = ProgramRegistry::new();
        let spaces = vec![space_on(&levels[0], rect(0.0, 0.0, 10.0, 10.0), &registry)];
        let before = spaces[0].boundary.clone();

        let overrides = SpaceOverrides {
            edits: vec![edit("L1", 5.0, 5.0, "Lounge")],
            ..SpaceOverrides::default()
        };
        let outcome = OverrideReconciler::new(&levels, &config, &mut registry)
            .reconcile(spaces, &overrides);

        assert_eq!(outcome.applied.edits, 1);
        assert_eq!(outcome.spaces[0].program_type, "Lounge");
        assert_eq!(outcome.spaces[0].boundary, before);
    }

    #[test]
    fn test_edit_replaces_boundary() {
        let levels = levels(&["L1"]);
        let config = PlanningConfig::default();
        let mut registry = ProgramRegistry::new();
        let spaces = vec![space_on(&levels[0], rect(0.0, 0.0, 10.0, 10.0), &registry)];

        let mut redraw = edit("L1", 5.0, 5.0, "Lounge");
        redraw.value.program_type = None;
        redraw.value.boundary = Some(rect(0.0, 0.0, 10.0, 6.0).reversed());
        let overrides = SpaceOverrides {
            edits: vec![redraw],
            ..SpaceOverrides::default()
        };
        let outcome = OverrideReconciler::new(&levels, &config, &mut registry)
            .reconcile(spaces, &overrides);

        let space = &outcome.spaces[0];
        assert!(space.boundary.is_normalized());
        assert_relative_eq!(space.area, 60.0, epsilon = 1e-9);
        assert_eq!(space.program_type, "unspecified");
        assert_eq!(space.original_boundary, rect(0.0, 0.0, 10.0, 10.0).perimeter);
    }

    #[test]
    fn test_edit_with_degenerate_boundary_keeps_geometry() {
        let levels = levels(&["L1"]);
        let config = PlanningConfig::default();
        let mut registry = ProgramRegistry::new();
        let spaces = vec![space_on(&levels[0], rect(0.0, 0.0, 10.0, 10.0), &registry)];

        let mut redraw = edit("L1", 5.0, 5.0, "Lounge");
        redraw.value.boundary = Some(Region::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 10.0),
        ]));
        let overrides = SpaceOverrides {
            edits: vec![redraw],
            ..SpaceOverrides::default()
        };
        let outcome = OverrideReconciler::new(&levels, &config, &mut registry)
            .reconcile(spaces, &overrides);

        let space = &outcome.spaces[0];
        assert_relative_eq!(space.area, 100.0, epsilon = 1e-9);
        assert_eq!(space.program_type, "Lounge");
        assert_eq!(outcome.applied.edits, 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("Invalid boundary for edited space"));
    }

    #[test]
    fn test_orphan_edit_dropped_with_two_levels_kept_with_one() {
        let config = PlanningConfig::default();

        let two = levels(&["L1", "L2"]);
        let mut registry = ProgramRegistry::new();
        let spaces = vec![space_on(&two[0], rect(0.0, 0.0, 10.0, 10.0), &registry)];
        let overrides = SpaceOverrides {
            edits: vec![edit("gone", 5.0, 5.0, "Lounge")],
            ..SpaceOverrides::default()
        };
        let outcome =
            OverrideReconciler::new(&two, &config, &mut registry).reconcile(spaces, &overrides);
        assert_eq!(outcome.applied.pruned, 1);
        assert_eq!(outcome.applied.edits, 0);
        assert_eq!(outcome.spaces[0].program_type, "unspecified");

        let one = levels(&["L1"]);
        let spaces = vec![space_on(&one[0], rect(0.0, 0.0, 10.0, 10.0), &registry)];
        let outcome =
            OverrideReconciler::new(&one, &config, &mut registry).reconcile(spaces, &overrides);
        assert_eq!(outcome.applied.pruned, 0);
        assert_eq!(outcome.applied.edits, 1);
        assert_eq!(outcome.spaces[0].program_type, "Lounge");
    }

    #[test]
    fn test_partial_removal_clips_to_remaining_area() {
        let levels = levels(&["L1", "L2"]);
        let config = PlanningConfig::default();
        let mut registry = ProgramRegistry::new();
        let spaces = vec![space_on(&levels[0], rect(0.0, 0.0, 10.0, 10.0), &registry)];

        let removal = SpaceRemoval {
            id: "r1".to_string(),
            identity: SpaceIdentity::new("L1", Point3::new(5.0, 5.0, 0.0)),
            footprint: Some(rect(2.0, 2.0, 7.0, 10.0)),
        };
        let overrides = SpaceOverrides {
            removals: vec![removal],
            ..SpaceOverrides::default()
        };
        let outcome = OverrideReconciler::new(&levels, &config, &mut registry)
            .reconcile(spaces, &overrides);

        assert_eq!(outcome.applied.removals, 1);
        assert_eq!(outcome.spaces.len(), 1);
        assert_relative_eq!(outcome.spaces[0].area, 60.0, epsilon = 1e-6);
    }

    #[test]
    fn test_full_removal_deletes_space() {
        let levels = levels(&["L1", "L2"]);
        let config = PlanningConfig::default();
        let mut registry = ProgramRegistry::new();
        let target = space_on(&levels[0], rect(0.0, 0.0, 10.0, 10.0), &registry);
        let other = space_on(&levels[1], rect(0.0, 0.0, 10.0, 10.0), &registry);

        let removal = SpaceRemoval {
            id: "r1".to_string(),
            identity: target.identity(),
            footprint: None,
        };
        let overrides = SpaceOverrides {
            removals: vec![removal],
            ..SpaceOverrides::default()
        };
        let outcome = OverrideReconciler::new(&levels, &config, &mut registry)
            .reconcile(vec![target, other], &overrides);

        assert_eq!(outcome.applied.removals, 1);
        assert_eq!(outcome.spaces.len(), 1);
        assert_eq!(outcome.spaces[0].level_key, "L2");
    }

    #[test]
    fn test_removal_leaving_sliver_deletes_space() {
        let levels = levels(&["L1", "L2"]);
        let config = PlanningConfig {
            min_space_area: 5.0,
            ..PlanningConfig::default()
        };
        let mut registry = ProgramRegistry::new();
        let spaces = vec![space_on(&levels[0], rect(0.0, 0.0, 10.0, 10.0), &registry)];

        let removal = SpaceRemoval {
            id: "r1".to_string(),
            identity: SpaceIdentity::new("L1", Point3::new(5.0, 5.0, 0.0)),
            footprint: Some(rect(0.0, 0.0, 10.0, 9.8)),
        };
        let overrides = SpaceOverrides {
            removals: vec![removal],
            ..SpaceOverrides::default()
        };
        let outcome = OverrideReconciler::new(&levels, &config, &mut registry)
            .reconcile(spaces, &overrides);

        assert!(outcome.spaces.is_empty());
    }

    #[test]
    fn test_addition_resolves_level_or_warns() {
        let mut levels = levels(&["L1", "L2"]);
        levels[1].add_id = Some("level-two".to_string());
        let config = PlanningConfig::default();
        let mut registry = ProgramRegistry::new();

        let addition = |id: &str, level: LevelReference| SpaceAddition {
            id: id.to_string(),
            value: SpaceAdditionValue {
                boundary: rect(0.0, 0.0, 3.0, 3.0),
                program_type: Some("Phone Booth".to_string()),
                level: Some(level),
                level_layout: None,
            },
        };
        let overrides = SpaceOverrides {
            additions: vec![
                addition(
                    "a1",
                    LevelReference {
                        add_id: Some("level-two".to_string()),
                        name: None,
                    },
                ),
                addition(
                    "a2",
                    LevelReference {
                        add_id: None,
                        name: Some("Level L1".to_string()),
                    },
                ),
                addition(
                    "a3",
                    LevelReference {
                        add_id: None,
                        name: Some("Mezzanine".to_string()),
                    },
                ),
            ],
            ..SpaceOverrides::default()
        };
        let outcome = OverrideReconciler::new(&levels, &config, &mut registry)
            .reconcile(Vec::new(), &overrides);

        assert_eq!(outcome.applied.additions, 2);
        assert_eq!(outcome.spaces[0].level_key, "L2");
        assert_eq!(outcome.spaces[1].level_key, "L1");
        assert!(outcome.spaces.iter().all(|s| s.user_authored));
        assert!(outcome.spaces.iter().all(|s| s.program_type == "Phone Booth"));
        assert_eq!(
            outcome.warnings,
            vec!["Could not find level \"Mezzanine\" for added space a3; skipping.".to_string()]
        );
    }

    #[test]
    fn test_removal_ignores_added_spaces_but_edit_reaches_them() {
        let levels = levels(&["L1", "L2"]);
        let config = PlanningConfig::default();
        let mut registry = ProgramRegistry::new();

        let overrides = SpaceOverrides {
            additions: vec![SpaceAddition {
                id: "a1".to_string(),
                value: SpaceAdditionValue {
                    boundary: rect(0.0, 0.0, 4.0, 4.0),
                    program_type: None,
                    level: Some(LevelReference {
                        add_id: None,
                        name: Some("Level L1".to_string()),
                    }),
                    level_layout: None,
                },
            }],
            removals: vec![SpaceRemoval {
                id: "r1".to_string(),
                identity: SpaceIdentity::new("L1", Point3::new(2.0, 2.0, 0.0)),
                footprint: None,
            }],
            edits: vec![edit("L1", 2.0, 2.0, "Pantry")],
        };
        let outcome = OverrideReconciler::new(&levels, &config, &mut registry)
            .reconcile(Vec::new(), &overrides);

        assert_eq!(outcome.spaces.len(), 1);
        assert_eq!(outcome.applied.removals, 0);
        assert_eq!(outcome.applied.unmatched, 1);
        assert_eq!(outcome.spaces[0].program_type, "Pantry");
    }
}
