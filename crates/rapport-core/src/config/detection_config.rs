//! Detection configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    /// Custom catalog TOML. The embedded catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
    /// Silence (hours) after which a message counts as a new initiation. Default: 4.0.
    pub initiation_gap_hours: Option<f64>,
    /// Messages after a repair that still belong to the same conflict episode. Default: 5.
    pub conflict_episode_messages: Option<usize>,
    /// Longest gap (minutes) still counted as a response. Default: 1440.
    pub max_response_minutes: Option<f64>,
    /// Run detection on the rayon pool. Default: true.
    pub parallel: Option<bool>,
}

impl DetectionConfig {
    pub fn effective_initiation_gap_hours(&self) -> f64 {
        self.initiation_gap_hours.unwrap_or(4.0)
    }

    pub fn effective_conflict_episode_messages(&self) -> usize {
        self.conflict_episode_messages.unwrap_or(5)
    }

    pub fn effective_max_response_minutes(&self) -> f64 {
        self.max_response_minutes.unwrap_or(1440.0)
    }

    pub fn effective_parallel(&self) -> bool {
        self.parallel.unwrap_or(true)
    }
}
