// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # SpacePlan Processing
//!
//! Per-level space derivation and override reconciliation.
//!
//! For every level the planner gathers obstructions (cores, circulation, shafts),
//! detects enclosed rooms in the wall network, carves the level boundary into an
//! ordered region list and turns each region into a typed [`Space`]. The saved user
//! overrides are then re-applied by structural identity, since no space id survives
//! from one run to the next.
//!
//! ```no_run
//! use spaceplan_processing::{PlanningConfig, PlanningInput, SpacePlanner};
//!
//! let mut planner = SpacePlanner::new(PlanningConfig::default())?;
//! let output = planner.run(&PlanningInput::default());
//! println!("{} spaces", output.spaces.len());
//! # Ok::<(), spaceplan_processing::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod grouping;
pub mod layout;
pub mod level;
pub mod obstruction;
pub mod overrides;
pub mod planner;
pub mod program;
pub mod reconcile;
pub mod space;

pub use config::PlanningConfig;
pub use error::{Error, Result};
pub use grouping::{
    CirculationSegment, Core, LevelGroupedElements, LevelGrouping, VerticalCirculationElement,
    WallSegment, UNGROUPED_KEY,
};
pub use layout::{LevelLayout, LevelLayoutBuilder, SeedSpace};
pub use level::{LevelContext, LevelDefinition, DEFAULT_LEVEL_HEIGHT, DUMMY_LEVEL_KEY};
pub use obstruction::{
    detect_rooms, resolve_obstructions, LevelObstructions, Obstruction, ObstructionKind,
};
pub use overrides::{
    LevelReference, SpaceAddition, SpaceAdditionValue, SpaceEdit, SpaceEditValue, SpaceIdentity,
    SpaceOverrides, SpaceRemoval,
};
pub use planner::{PlanningInput, PlanningOutput, SpacePlanner};
pub use program::{
    Color, ProgramMaterial, ProgramRegistry, ProgramRequirement, ProgramResolution,
    UNASSIGNED_DISPLAY_NAME, UNSPECIFIED_PROGRAM,
};
pub use reconcile::{AppliedCounts, OverrideReconciler, ReconcileOutcome};
pub use space::{derive_space, MatchPolicy, Space, ENCLOSED_EDGE_THICKNESS};
