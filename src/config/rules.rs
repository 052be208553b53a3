use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::shared::constants;

/// How occluded subjects are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OcclusionMode {
    /// Occlusion flags only affect file names
    None,
    /// Occluded subjects go to the `occluded` folder, sampled at the occlusion period
    SaveOnly,
    /// Occluded subjects stay in their behavior folder, sampled at the occlusion period
    SaveTogether,
}

impl OcclusionMode {
    pub fn handles_occlusion(self) -> bool {
        self != OcclusionMode::None
    }

    pub fn has_occluded_bucket(self) -> bool {
        self == OcclusionMode::SaveOnly
    }
}

/// Behavior label to sampling period, plus the occlusion period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplingRules {
    pub periods: BTreeMap<String, u32>,
    pub occluded_period: u32,
}

impl Default for SamplingRules {
    fn default() -> Self {
        Self {
            periods: constants::DEFAULT_BEHAVIOR_PERIODS
                .iter()
                .map(|(label, period)| (label.to_string(), *period))
                .collect(),
            occluded_period: constants::DEFAULT_OCCLUDED_PERIOD,
        }
    }
}

impl SamplingRules {
    /// Period for a behavior; absent or unknown behaviors sample every frame.
    pub fn period_for(&self, behavior: Option<&str>) -> u32 {
        behavior
            .and_then(|label| self.periods.get(label).copied())
            .unwrap_or(constants::DEFAULT_PERIOD)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.occluded_period == 0 {
            return Err(ConfigError::ZeroPeriod(constants::OCCLUDED_FOLDER.to_string()));
        }
        if let Some((label, _)) = self.periods.iter().find(|(_, period)| **period == 0) {
            return Err(ConfigError::ZeroPeriod(label.clone()));
        }
        Ok(())
    }
}

/// Raw behavior label to canonical output folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelMapping {
    folders: BTreeMap<String, String>,
}

impl Default for LabelMapping {
    fn default() -> Self {
        Self {
            folders: constants::DEFAULT_BEHAVIOR_PERIODS
                .iter()
                .map(|(label, _)| (label.to_string(), label.to_string()))
                .collect(),
        }
    }
}

impl LabelMapping {
    pub fn new(folders: BTreeMap<String, String>) -> Self {
        Self { folders }
    }

    pub fn canonical<'a>(&'a self, behavior: Option<&str>) -> &'a str {
        behavior
            .and_then(|label| self.folders.get(label))
            .map(String::as_str)
            .unwrap_or(constants::OTHER_FOLDER)
    }

    /// Every folder a crop can be filed under, including the catch-all.
    pub fn folders(&self) -> BTreeSet<&str> {
        let mut folders: BTreeSet<&str> = self.folders.values().map(String::as_str).collect();
        folders.insert(constants::OTHER_FOLDER);
        folders
    }
}

/// On-disk shape of the rules file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesFile {
    occluded_period: Option<u32>,
    periods: Option<BTreeMap<String, u32>>,
    folders: Option<BTreeMap<String, String>>,
}

/// Immutable configuration shared by every video job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetConfig {
    pub rules: SamplingRules,
    pub labels: LabelMapping,
}

impl DatasetConfig {
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let file: RulesFile = serde_json::from_str(content)?;
        let defaults = Self::default();

        let rules = SamplingRules {
            periods: file.periods.unwrap_or(defaults.rules.periods),
            occluded_period: file
                .occluded_period
                .unwrap_or(defaults.rules.occluded_period),
        };
        rules.validate()?;

        let labels = file.folders.map(LabelMapping::new).unwrap_or(defaults.labels);

        Ok(Self { rules, labels })
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }
}
