//! Top-level rapport configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{DetectionConfig, OracleConfig, ScoringConfig};
use crate::errors::ConfigError;
use crate::types::{Dimension, PatternCategory};

/// Project config file name looked up in the root passed to `load`.
pub const CONFIG_FILE_NAME: &str = "rapport.toml";

/// Upper bound on `scoring_window_days` (about 100 years).
pub const MAX_SCORING_WINDOW_DAYS: u32 = 36_500;

/// Upper bound on `pulse_weeks` (10 years).
pub const MAX_PULSE_WEEKS: u32 = 520;

/// Top-level configuration.
///
/// Resolution order (highest priority first):
/// 1. Programmatic overrides (`ConfigOverrides`)
/// 2. Environment variables (`RAPPORT_*`)
/// 3. Project config (`rapport.toml` in the given root)
/// 4. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RapportConfig {
    pub scoring: ScoringConfig,
    pub detection: DetectionConfig,
    pub oracle: OracleConfig,
}

/// Overrides applied on top of file and environment values.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub scoring_window_days: Option<u32>,
    pub use_llm: Option<bool>,
    pub llm_confidence_threshold: Option<f64>,
    pub catalog_path: Option<std::path::PathBuf>,
}

impl RapportConfig {
    /// Load configuration from `root/rapport.toml` (if present), then env,
    /// then `overrides`, and validate the result.
    pub fn load(root: &Path, overrides: Option<&ConfigOverrides>) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        let mut config = Self::default();
        if path.exists() {
            Self::merge_toml_file(&mut config, &path)?;
        }
        Self::finish(config, overrides)
    }

    /// Load configuration from an explicit file. A missing file is an error.
    pub fn load_file(path: &Path, overrides: Option<&ConfigOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        Self::merge_toml_file(&mut config, path)?;
        Self::finish(config, overrides)
    }

    fn finish(mut config: Self, overrides: Option<&ConfigOverrides>) -> Result<Self, ConfigError> {
        Self::apply_env_overrides(&mut config);
        if let Some(o) = overrides {
            Self::apply_overrides(&mut config, o);
        }
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string (no env, no validation).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Validate the configuration values.
    pub fn validate(config: &RapportConfig) -> Result<(), ConfigError> {
        let scoring = &config.scoring;
        let window_days = scoring.effective_scoring_window_days();
        if window_days == 0 || window_days > MAX_SCORING_WINDOW_DAYS {
            return Err(invalid(
                "scoring.scoring_window_days",
                &format!("must be between 1 and {MAX_SCORING_WINDOW_DAYS}"),
            ));
        }
        if scoring.effective_pulse_weeks() > MAX_PULSE_WEEKS {
            return Err(invalid(
                "scoring.pulse_weeks",
                &format!("must be at most {MAX_PULSE_WEEKS}"),
            ));
        }
        for dimension in Dimension::ALL {
            let w = scoring.dimension_weights.effective(dimension);
            if !(0.0..=1.0).contains(&w) {
                return Err(invalid(
                    &format!("scoring.dimension_weights.{}", snake(dimension)),
                    "must be between 0.0 and 1.0",
                ));
            }
        }
        let sum = scoring.dimension_weights.effective_sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(invalid(
                "scoring.dimension_weights",
                &format!("must sum to 1.0, got {sum}"),
            ));
        }
        for (field, value) in [
            (
                "scoring.affection_baseline_per_week",
                scoring.effective_affection_baseline_per_week(),
            ),
            (
                "scoring.commitment_baseline_per_week",
                scoring.effective_commitment_baseline_per_week(),
            ),
            (
                "scoring.appreciation_baseline_per_week",
                scoring.effective_appreciation_baseline_per_week(),
            ),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }
        let max_confidence = scoring.effective_max_confidence();
        if max_confidence.is_nan() || max_confidence <= 0.0 || max_confidence > 1.0 {
            return Err(invalid("scoring.max_confidence", "must be in (0.0, 1.0]"));
        }
        for (field, value) in [
            ("scoring.criticism_penalty", scoring.effective_criticism_penalty()),
            (
                "scoring.defensiveness_penalty",
                scoring.effective_defensiveness_penalty(),
            ),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(invalid(field, "must not be negative"));
            }
        }

        let detection = &config.detection;
        let gap = detection.effective_initiation_gap_hours();
        if gap.is_nan() || gap <= 0.0 {
            return Err(invalid("detection.initiation_gap_hours", "must be greater than 0"));
        }
        let max_response = detection.effective_max_response_minutes();
        if max_response.is_nan() || max_response <= 0.0 {
            return Err(invalid("detection.max_response_minutes", "must be greater than 0"));
        }

        let oracle = &config.oracle;
        let threshold = oracle.effective_llm_confidence_threshold();
        if !(0.0..=1.0).contains(&threshold) {
            return Err(invalid(
                "oracle.llm_confidence_threshold",
                "must be between 0.0 and 1.0",
            ));
        }
        if oracle.effective_batch_size() == 0 {
            return Err(invalid("oracle.batch_size", "must be greater than 0"));
        }
        if oracle.effective_timeout_ms() == 0 {
            return Err(invalid("oracle.timeout_ms", "must be greater than 0"));
        }
        if let Some(unknown) = oracle
            .validated_categories
            .iter()
            .find(|name| PatternCategory::parse_str(name).is_none())
        {
            return Err(ConfigError::InvalidValue {
                field: "oracle.validated_categories".to_string(),
                message: format!("unknown category '{unknown}'"),
            });
        }
        Ok(())
    }

    fn merge_toml_file(config: &mut RapportConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let file_config: RapportConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins only where it has a value.
    fn merge(base: &mut RapportConfig, other: &RapportConfig) {
        let (b, o) = (&mut base.scoring, &other.scoring);
        if o.scoring_window_days.is_some() {
            b.scoring_window_days = o.scoring_window_days;
        }
        b.dimension_weights.merge_from(&o.dimension_weights);
        if o.affection_baseline_per_week.is_some() {
            b.affection_baseline_per_week = o.affection_baseline_per_week;
        }
        if o.commitment_baseline_per_week.is_some() {
            b.commitment_baseline_per_week = o.commitment_baseline_per_week;
        }
        if o.appreciation_baseline_per_week.is_some() {
            b.appreciation_baseline_per_week = o.appreciation_baseline_per_week;
        }
        if o.min_messages_for_pattern.is_some() {
            b.min_messages_for_pattern = o.min_messages_for_pattern;
        }
        if o.max_confidence.is_some() {
            b.max_confidence = o.max_confidence;
        }
        if o.criticism_penalty.is_some() {
            b.criticism_penalty = o.criticism_penalty;
        }
        if o.defensiveness_penalty.is_some() {
            b.defensiveness_penalty = o.defensiveness_penalty;
        }
        if o.pulse_weeks.is_some() {
            b.pulse_weeks = o.pulse_weeks;
        }
        if o.pulse_min_messages.is_some() {
            b.pulse_min_messages = o.pulse_min_messages;
        }

        let (b, o) = (&mut base.detection, &other.detection);
        if o.catalog_path.is_some() {
            b.catalog_path = o.catalog_path.clone();
        }
        if o.initiation_gap_hours.is_some() {
            b.initiation_gap_hours = o.initiation_gap_hours;
        }
        if o.conflict_episode_messages.is_some() {
            b.conflict_episode_messages = o.conflict_episode_messages;
        }
        if o.max_response_minutes.is_some() {
            b.max_response_minutes = o.max_response_minutes;
        }
        if o.parallel.is_some() {
            b.parallel = o.parallel;
        }

        let (b, o) = (&mut base.oracle, &other.oracle);
        if o.use_llm.is_some() {
            b.use_llm = o.use_llm;
        }
        if o.llm_confidence_threshold.is_some() {
            b.llm_confidence_threshold = o.llm_confidence_threshold;
        }
        if o.batch_size.is_some() {
            b.batch_size = o.batch_size;
        }
        if o.timeout_ms.is_some() {
            b.timeout_ms = o.timeout_ms;
        }
        if !o.validated_categories.is_empty() {
            b.validated_categories = o.validated_categories.clone();
        }
        if o.endpoint.is_some() {
            b.endpoint = o.endpoint.clone();
        }
        if o.model.is_some() {
            b.model = o.model.clone();
        }
        if o.api_key_env.is_some() {
            b.api_key_env = o.api_key_env.clone();
        }
        if o.max_tokens.is_some() {
            b.max_tokens = o.max_tokens;
        }
        if o.cost_per_million_input.is_some() {
            b.cost_per_million_input = o.cost_per_million_input;
        }
        if o.cost_per_million_output.is_some() {
            b.cost_per_million_output = o.cost_per_million_output;
        }
    }

    /// Apply environment variable overrides. Unparseable values are ignored.
    fn apply_env_overrides(config: &mut RapportConfig) {
        if let Some(v) = env_parse::<u32>("RAPPORT_SCORING_WINDOW_DAYS") {
            config.scoring.scoring_window_days = Some(v);
        }
        if let Some(v) = env_parse::<usize>("RAPPORT_MIN_MESSAGES_FOR_PATTERN") {
            config.scoring.min_messages_for_pattern = Some(v);
        }
        if let Some(v) = env_parse::<f64>("RAPPORT_AFFECTION_BASELINE_PER_WEEK") {
            config.scoring.affection_baseline_per_week = Some(v);
        }
        if let Some(v) = env_parse::<bool>("RAPPORT_USE_LLM") {
            config.oracle.use_llm = Some(v);
        }
        if let Some(v) = env_parse::<f64>("RAPPORT_LLM_CONFIDENCE_THRESHOLD") {
            config.oracle.llm_confidence_threshold = Some(v);
        }
        if let Some(v) = env_parse::<u64>("RAPPORT_ORACLE_TIMEOUT_MS") {
            config.oracle.timeout_ms = Some(v);
        }
    }

    fn apply_overrides(config: &mut RapportConfig, overrides: &ConfigOverrides) {
        if let Some(v) = overrides.scoring_window_days {
            config.scoring.scoring_window_days = Some(v);
        }
        if let Some(v) = overrides.use_llm {
            config.oracle.use_llm = Some(v);
        }
        if let Some(v) = overrides.llm_confidence_threshold {
            config.oracle.llm_confidence_threshold = Some(v);
        }
        if let Some(ref v) = overrides.catalog_path {
            config.detection.catalog_path = Some(v.clone());
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationFailed {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn snake(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::EmotionalConnection => "emotional_connection",
        Dimension::AffectionCommitment => "affection_commitment",
        Dimension::CommunicationHealth => "communication_health",
        Dimension::PartnershipEquity => "partnership_equity",
    }
}
