//! Configuration system for rapport.
//! TOML-based, layered: overrides > env > file > defaults.

pub mod detection_config;
pub mod oracle_config;
pub mod rapport_config;
pub mod scoring_config;

pub use detection_config::DetectionConfig;
pub use oracle_config::OracleConfig;
pub use rapport_config::{
    ConfigOverrides, RapportConfig, MAX_PULSE_WEEKS, MAX_SCORING_WINDOW_DAYS,
};
pub use scoring_config::{DimensionWeights, ScoringConfig};
