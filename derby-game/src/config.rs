//! Bundled configuration and the startup integrity report.
use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::bindings::ActionId;
use crate::navigation::{ConfigIssue, NavigationConfig};
use crate::timeline::{Timeline, TimelineIssue};
use crate::training::{TrainingConfig, TrainingConfigError, TrainingOptions};

const NAVIGATION_JSON: &str = include_str!("../assets/navigation.json");
const TRAINING_JSON: &str = include_str!("../assets/training.json");
const TIMELINE_JSON: &str = include_str!("../assets/timeline.json");

pub const DEFAULT_SAVE_SLOT: &str = "career";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub timeline: Timeline,
}

impl GameConfig {
    /// Load the configuration shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if a bundled asset fails to parse.
    pub fn load_from_static() -> Result<Self> {
        let navigation = NavigationConfig::from_json(NAVIGATION_JSON)
            .context("parsing bundled navigation table")?;
        let training =
            serde_json::from_str(TRAINING_JSON).context("parsing bundled training table")?;
        let timeline =
            serde_json::from_str(TIMELINE_JSON).context("parsing bundled race schedule")?;
        Ok(Self {
            navigation,
            training,
            timeline,
        })
    }

    /// Parse a combined `{ navigation, training, timeline }` document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not match the config shape.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parsing game configuration")
    }

    /// Read and parse a combined configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("loading config {}", path.display()))
    }

    /// Run every one-time integrity check. Problems are collected, not raised.
    #[must_use]
    pub fn validate(&self) -> ConfigReport {
        let mut navigation = self.navigation.check();
        for (screen, input, action) in self.navigation.action_bindings() {
            if action.parse::<ActionId>().is_err() {
                navigation.push(ConfigIssue::UnknownAction {
                    screen,
                    input: input.to_string(),
                    action: action.to_string(),
                });
            }
        }
        ConfigReport {
            navigation,
            timeline: self.timeline.validate(),
            training: self.training.validate().err(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigReport {
    pub navigation: Vec<ConfigIssue>,
    pub timeline: Vec<TimelineIssue>,
    pub training: Option<TrainingConfigError>,
}

impl ConfigReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.navigation.is_empty() && self.timeline.is_empty() && self.training.is_none()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.navigation
            .iter()
            .map(|issue| format!("navigation: {issue}"))
            .chain(self.timeline.iter().map(|issue| format!("timeline: {issue}")))
            .chain(self.training.iter().map(|err| format!("training: {err}")))
            .collect()
    }

    pub fn log(&self) {
        for message in self.messages() {
            warn!("config check: {message}");
        }
    }
}

/// Per-session knobs supplied by the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOptions {
    pub seed: u64,
    /// Suppress training jitter and form rolls (tests, scripted flows).
    #[serde(default)]
    pub deterministic: bool,
    #[serde(default = "GameOptions::default_save_slot")]
    pub save_slot: String,
}

impl GameOptions {
    fn default_save_slot() -> String {
        String::from(DEFAULT_SAVE_SLOT)
    }

    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn deterministic(mut self) -> Self {
        self.deterministic = true;
        self
    }

    #[must_use]
    pub const fn training(&self) -> TrainingOptions {
        TrainingOptions {
            deterministic: self.deterministic,
        }
    }
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            deterministic: false,
            save_slot: Self::default_save_slot(),
        }
    }
}
