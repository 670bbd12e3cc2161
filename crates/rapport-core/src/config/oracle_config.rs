//! Oracle configuration. Model names and cost tables are injected here, never global.

use serde::{Deserialize, Serialize};

use crate::types::PatternCategory;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct OracleConfig {
    /// Consult the oracle at all. Default: false.
    pub use_llm: Option<bool>,
    /// Minimum oracle confidence for an override to be accepted. Default: 0.7.
    pub llm_confidence_threshold: Option<f64>,
    /// Messages per oracle call. Default: 20.
    pub batch_size: Option<usize>,
    /// Per-call timeout in milliseconds. Default: 30000.
    pub timeout_ms: Option<u64>,
    /// Categories sent for validation. Default: the four horsemen and repair.
    #[serde(default)]
    pub validated_categories: Vec<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// Env var holding the API key. Default: `ANTHROPIC_API_KEY`.
    pub api_key_env: Option<String>,
    pub max_tokens: Option<u32>,
    /// USD per million input tokens.
    pub cost_per_million_input: Option<f64>,
    /// USD per million output tokens.
    pub cost_per_million_output: Option<f64>,
}

impl OracleConfig {
    pub fn effective_use_llm(&self) -> bool {
        self.use_llm.unwrap_or(false)
    }

    pub fn effective_llm_confidence_threshold(&self) -> f64 {
        self.llm_confidence_threshold.unwrap_or(0.7)
    }

    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(20)
    }

    pub fn effective_timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(30_000)
    }

    /// Categories to validate. Unknown names are dropped here; `validate()`
    /// rejects them at load time.
    pub fn effective_validated_categories(&self) -> Vec<PatternCategory> {
        if self.validated_categories.is_empty() {
            return vec![
                PatternCategory::Contempt,
                PatternCategory::Criticism,
                PatternCategory::Defensiveness,
                PatternCategory::Stonewalling,
                PatternCategory::Repair,
            ];
        }
        self.validated_categories
            .iter()
            .filter_map(|name| PatternCategory::parse_str(name))
            .collect()
    }

    pub fn effective_endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or("https://api.anthropic.com/v1/messages")
    }

    pub fn effective_model(&self) -> &str {
        self.model.as_deref().unwrap_or("claude-sonnet-4-20250514")
    }

    pub fn effective_api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or("ANTHROPIC_API_KEY")
    }

    pub fn effective_max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(1024)
    }

    pub fn effective_cost_per_million_input(&self) -> f64 {
        self.cost_per_million_input.unwrap_or(3.0)
    }

    pub fn effective_cost_per_million_output(&self) -> f64 {
        self.cost_per_million_output.unwrap_or(15.0)
    }
}
