//! Oracle capability: optional soft validation of rule matches.
//!
//! The engine ships with `NoOpOracle` (rule-only mode). Network-backed
//! adapters live outside this crate and implement the same trait, so the
//! scorers only ever see the interface.

use serde::{Deserialize, Serialize};

use crate::errors::OracleError;
use crate::types::{Message, PatternCategory};

/// A batch of candidate messages for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    pub messages: Vec<Message>,
    pub category: PatternCategory,
    pub prompt_template_id: String,
}

impl OracleRequest {
    pub fn new(category: PatternCategory, messages: Vec<Message>) -> Self {
        Self {
            prompt_template_id: format!("{}.v1", category.name()),
            messages,
            category,
        }
    }
}

/// What the oracle concluded about one message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    /// `validity_flags` shape: is the rule match a real instance?
    Validity { is_valid: bool },
    /// `category_counts` shape: how many instances the oracle found.
    Count(u32),
}

impl Verdict {
    /// True when the oracle says the category is absent.
    pub fn rejects(&self) -> bool {
        match self {
            Self::Validity { is_valid } => !is_valid,
            Self::Count(n) => *n == 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleJudgment {
    pub message_id: String,
    pub verdict: Verdict,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// Validates rule-detected candidates. Implementations must be callable
/// from a worker thread.
pub trait Oracle: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the adapter can be consulted at all.
    fn is_available(&self) -> bool {
        true
    }

    fn validate(&self, request: &OracleRequest) -> Result<Vec<OracleJudgment>, OracleError>;
}

/// Rule-only mode: never available, never overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpOracle;

impl Oracle for NoOpOracle {
    fn name(&self) -> &str {
        "rule-only"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn validate(&self, _request: &OracleRequest) -> Result<Vec<OracleJudgment>, OracleError> {
        Err(OracleError::Disabled)
    }
}
