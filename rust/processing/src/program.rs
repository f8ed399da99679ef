// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Program requirements and the program color table.
//!
//! The registry is owned by the planner and reset at the start of every run. It is
//! filled in a single-threaded pre-pass, read concurrently while levels are
//! derived, and only written again during reconciliation.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};

use crate::space::Space;

/// Program name of spaces nobody assigned a program to
pub const UNSPECIFIED_PROGRAM: &str = "unspecified";

/// Display name shown for [`UNSPECIFIED_PROGRAM`]
pub const UNASSIGNED_DISPLAY_NAME: &str = "Unassigned Space Type";

/// Color table key used for program names without a registered color
const UNRECOGNIZED_PROGRAM: &str = "unrecognized";

/// Programs drawn fully opaque
const FULL_OPACITY_PROGRAMS: [&str; 2] = ["Core", "Circulation"];

/// RGBA color, components in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    pub const AQUA: Color = Color::new(0.3, 0.7, 0.7, 1.0);

    pub const fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Display material of a program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramMaterial {
    pub name: String,
    pub color: Color,
}

impl ProgramMaterial {
    fn new(name: &str, color: Color) -> Self {
        Self {
            name: name.to_string(),
            color,
        }
    }
}

/// A program the building has to accommodate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRequirement {
    /// "<group> - <program>", the key spaces refer to
    pub qualified_program_name: String,
    pub program_name: String,
    /// Space type shown for spaces of this program
    pub space_type: String,
    #[serde(default)]
    pub program_group: Option<String>,
    /// Enclosed programs get a thickened boundary edge
    #[serde(default)]
    pub enclosed: bool,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub total_area: f64,
    #[serde(default)]
    pub space_count: usize,
}

/// How a program name resolves against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramResolution {
    pub display_name: String,
    pub enclosed: bool,
    pub color: Color,
    pub program_group: Option<String>,
    /// Qualified name of the matched requirement
    pub requirement: Option<String>,
}

/// Program requirements plus the program name -> material table.
#[derive(Debug, Clone)]
pub struct ProgramRegistry {
    requirements: FxHashMap<String, ProgramRequirement>,
    materials: FxHashMap<String, ProgramMaterial>,
}

impl Default for ProgramRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self {
            requirements: FxHashMap::default(),
            materials: default_materials(),
        }
    }

    /// Back to the built-in color table with no requirements.
    pub fn reset(&mut self) {
        self.requirements.clear();
        self.materials = default_materials();
    }

    /// Registers requirements; repeated qualified names accumulate area and count.
    pub fn set_requirements(&mut self, requirements: &[ProgramRequirement]) {
        self.requirements.clear();
        for requirement in requirements {
            match self
                .requirements
                .get_mut(&requirement.qualified_program_name)
            {
                Some(existing) => {
                    existing.total_area += requirement.total_area;
                    existing.space_count += requirement.space_count;
                }
                None => {
                    self.requirements.insert(
                        requirement.qualified_program_name.clone(),
                        requirement.clone(),
                    );
                }
            }
        }

        for (key, requirement) in &self.requirements {
            let alpha = if FULL_OPACITY_PROGRAMS.contains(&key.as_str()) {
                1.0
            } else {
                0.5
            };
            let color = requirement.color.unwrap_or(Color::AQUA).with_alpha(alpha);
            self.materials.insert(
                key.clone(),
                ProgramMaterial::new(&requirement.program_name, color),
            );
        }
    }

    pub fn requirements(&self) -> impl Iterator<Item = &ProgramRequirement> {
        self.requirements.values()
    }

    pub fn material(&self, name: &str) -> Option<&ProgramMaterial> {
        self.materials.get(name)
    }

    /// Exact qualified-name match, else a key ending in `" - <name>"`.
    pub fn find_requirement(&self, name: &str) -> Option<&ProgramRequirement> {
        if let Some(requirement) = self.requirements.get(name) {
            return Some(requirement);
        }
        let suffix = format!(" - {name}");
        let mut keys: Vec<&String> = self
            .requirements
            .keys()
            .filter(|k| k.ends_with(&suffix))
            .collect();
        keys.sort();
        keys.first().and_then(|k| self.requirements.get(*k))
    }

    /// Color of a program, falling back to the "unrecognized" color.
    pub fn color_of(&self, name: &str) -> Color {
        self.materials
            .get(name)
            .or_else(|| self.materials.get(UNRECOGNIZED_PROGRAM))
            .map(|m| m.color)
            .unwrap_or(Color::new(0.8, 0.8, 0.2, 0.3))
    }

    /// Resolution used when a space is first derived.
    pub fn resolve(&self, name: &str) -> ProgramResolution {
        let requirement = self.find_requirement(name);
        let mut display_name = requirement
            .map(|r| r.space_type.clone())
            .unwrap_or_else(|| name.to_string());
        if display_name == UNSPECIFIED_PROGRAM {
            display_name = UNASSIGNED_DISPLAY_NAME.to_string();
        }

        ProgramResolution {
            display_name,
            enclosed: requirement.is_some_and(|r| r.enclosed),
            color: self.color_of(name),
            program_group: requirement.and_then(|r| r.program_group.clone()),
            requirement: requirement.map(|r| r.qualified_program_name.clone()),
        }
    }

    /// Registers a color for `name` unless it already has one.
    ///
    /// Unknown programs get a color derived from a hash of their name, so the same
    /// program gets the same color on every run.
    pub fn ensure_color(&mut self, name: &str) -> Color {
        self.materials
            .entry(name.to_string())
            .or_insert_with(|| ProgramMaterial::new(name, hashed_color(name)))
            .color
    }

    /// Number of final spaces fulfilling each requirement.
    pub fn placement_counts(&self, spaces: &[Space]) -> FxHashMap<String, usize> {
        let mut counts: FxHashMap<String, usize> = self
            .requirements
            .keys()
            .map(|k| (k.clone(), 0))
            .collect();
        for requirement in spaces.iter().filter_map(|s| s.requirement.as_ref()) {
            *counts.entry(requirement.clone()).or_default() += 1;
        }
        counts
    }
}

fn hashed_color(name: &str) -> Color {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    let bits = hasher.finish();
    let channel = |shift: u32| ((bits >> shift) & 0xff) as f64 / 255.0;
    Color::new(channel(0), channel(8), channel(16), 0.5)
}

fn default_materials() -> FxHashMap<String, ProgramMaterial> {
    let unspecified = Color::new(0.8, 0.8, 0.8, 0.3);
    let table = [
        ("unspecified", "Unspecified Space Type", unspecified),
        ("Unassigned Space Type", "Unspecified Space Type", unspecified),
        (
            UNRECOGNIZED_PROGRAM,
            "Unspecified Space Type",
            Color::new(0.8, 0.8, 0.2, 0.3),
        ),
        ("Circulation", "Circulation", Color::new(0.996, 0.965, 0.863, 0.5)),
        ("Open Office", "Open Office", Color::new(0.435, 0.627, 0.745, 0.5)),
        ("Private Office", "Private Office", Color::new(0.122, 0.271, 0.361, 0.5)),
        ("Lounge", "Lounge", Color::new(1.0, 0.584, 0.196, 0.5)),
        ("Classroom", "Classroom", Color::new(0.796, 0.914, 0.796, 0.5)),
        ("Pantry", "Pantry", Color::new(0.5, 0.714, 0.745, 0.5)),
        ("Meeting Room", "Meeting Room", Color::new(0.380, 0.816, 0.608, 0.5)),
        ("Phone Booth", "Phone Booth", Color::new(0.976, 0.788, 0.129, 0.5)),
        ("Support", "Support", Color::new(0.447, 0.498, 0.573, 0.5)),
        ("Reception", "Reception", Color::new(0.576, 0.463, 0.753, 0.5)),
        (
            "Open Collaboration",
            "Open Collaboration",
            Color::new(209.0 / 255.0, 224.0 / 255.0, 178.0 / 255.0, 0.5),
        ),
        ("Data Hall", "Data Hall", Color::new(0.46, 0.46, 0.48, 0.5)),
        ("Parking", "Parking", Color::new(0.447, 0.498, 0.573, 0.5)),
    ];

    table
        .into_iter()
        .map(|(key, name, color)| (key.to_string(), ProgramMaterial::new(name, color)))
        .collect()
}
