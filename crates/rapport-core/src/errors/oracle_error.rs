//! Oracle errors.
//!
//! Every variant is an "oracle unavailable" condition. The validation stage
//! converts them into degradation events and keeps the rule-based matches;
//! none of them is ever raised into aggregation.

use super::error_code::{self, RapportErrorCode};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle is disabled")]
    Disabled,

    #[error("Oracle call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Oracle transport failure: {reason}")]
    Transport { reason: String },

    #[error("Oracle quota exceeded: {reason}")]
    Quota { reason: String },

    #[error("Oracle returned an invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Oracle call cancelled")]
    Cancelled,
}

impl OracleError {
    /// All oracle errors degrade to rule-only scoring.
    pub fn is_unavailable(&self) -> bool {
        true
    }
}

impl RapportErrorCode for OracleError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => error_code::ORACLE_TIMEOUT,
            Self::InvalidResponse { .. } => error_code::ORACLE_INVALID_RESPONSE,
            Self::Cancelled => error_code::CANCELLED,
            Self::Disabled | Self::Transport { .. } | Self::Quota { .. } => {
                error_code::ORACLE_UNAVAILABLE
            }
        }
    }
}
