// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planning configuration.
//!
//! Defaults are the values the pipeline is tuned for. A configuration can be read
//! from JSON (missing fields keep their defaults) or from `SPACEPLAN_*`
//! environment variables layered over the defaults.

use serde::{Deserialize, Serialize};
use spaceplan_geometry::CleanOptions;

use crate::error::{Error, Result};
use crate::level::DEFAULT_LEVEL_HEIGHT;

/// Tunables for one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Distance below which points are the same point (node merging, snapping)
    pub tolerance: f64,
    /// Maximum vertex deviation for collinear-vertex removal
    pub collinear_tolerance: f64,
    /// Shrink/grow distance used to remove zero-width bridges
    pub bridge_offset: f64,
    /// Spaces left smaller than this by a removal are deleted
    pub min_space_area: f64,
    /// Per-vertex tolerance when comparing recorded and current boundaries
    pub boundary_match_tolerance: f64,
    /// Seed each level with its outer boundary
    pub auto_generate: bool,
    /// Height of the synthesized level when the run has no levels
    pub default_level_height: f64,
    /// Derive levels on the rayon thread pool
    pub parallel: bool,
    /// Levels whose primary use is listed here get no layout
    pub skipped_use_categories: Vec<String>,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            collinear_tolerance: 1e-4,
            bridge_offset: 0.01,
            min_space_area: 0.1,
            boundary_match_tolerance: 1.0,
            auto_generate: true,
            default_level_height: DEFAULT_LEVEL_HEIGHT,
            parallel: true,
            skipped_use_categories: vec!["Residential".to_string()],
        }
    }
}

impl PlanningConfig {
    /// Parse a JSON document; absent fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `SPACEPLAN_*` environment variables.
    ///
    /// Unset variables keep the default; unparsable values are rejected.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            tolerance: parse_var(&lookup, "SPACEPLAN_TOLERANCE", defaults.tolerance)?,
            collinear_tolerance: parse_var(
                &lookup,
                "SPACEPLAN_COLLINEAR_TOLERANCE",
                defaults.collinear_tolerance,
            )?,
            bridge_offset: parse_var(&lookup, "SPACEPLAN_BRIDGE_OFFSET", defaults.bridge_offset)?,
            min_space_area: parse_var(
                &lookup,
                "SPACEPLAN_MIN_SPACE_AREA",
                defaults.min_space_area,
            )?,
            boundary_match_tolerance: parse_var(
                &lookup,
                "SPACEPLAN_BOUNDARY_MATCH_TOLERANCE",
                defaults.boundary_match_tolerance,
            )?,
            auto_generate: parse_var(&lookup, "SPACEPLAN_AUTO_GENERATE", defaults.auto_generate)?,
            default_level_height: parse_var(
                &lookup,
                "SPACEPLAN_DEFAULT_LEVEL_HEIGHT",
                defaults.default_level_height,
            )?,
            parallel: parse_var(&lookup, "SPACEPLAN_PARALLEL", defaults.parallel)?,
            skipped_use_categories: lookup("SPACEPLAN_SKIPPED_USE_CATEGORIES")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.skipped_use_categories),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject tolerances and thresholds that would make the geometry meaningless.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("tolerance", self.tolerance),
            ("collinear_tolerance", self.collinear_tolerance),
            ("boundary_match_tolerance", self.boundary_match_tolerance),
            ("default_level_height", self.default_level_height),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!("{name} must be positive, got {value}")));
            }
        }
        let non_negative = [
            ("bridge_offset", self.bridge_offset),
            ("min_space_area", self.min_space_area),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::Config(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Options for the region cleaning pass
    pub fn clean_options(&self) -> CleanOptions {
        CleanOptions {
            tolerance: self.tolerance,
            collinear_tolerance: self.collinear_tolerance,
            bridge_offset: self.bridge_offset,
        }
    }

    pub fn skips_use_category(&self, category: Option<&str>) -> bool {
        category.is_some_and(|c| self.skipped_use_categories.iter().any(|s| s == c))
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key}: cannot parse {raw:?}"))),
        None => Ok(default),
    }
}
