//! Oracle driven by canned model output, for offline runs and tests.
//!
//! Each category maps to a raw response string (or a failure). Responses go
//! through the same parser as live model output, so fenced or chatty JSON
//! behaves exactly as it would over HTTP.

use std::sync::Mutex;

use rustc_hash::FxHashMap;

use rapport_core::errors::OracleError;
use rapport_core::traits::{Oracle, OracleJudgment, OracleRequest};
use rapport_core::types::PatternCategory;

use crate::response::parse_response;

#[derive(Debug, Clone)]
enum Script {
    Respond(String),
    Fail(OracleError),
}

#[derive(Debug, Default)]
pub struct ScriptedOracle {
    scripts: FxHashMap<PatternCategory, Script>,
    /// Raw text for categories without a script. `None` means "no judgments".
    fallback: Option<String>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `category` requests with `raw`.
    pub fn respond(mut self, category: PatternCategory, raw: impl Into<String>) -> Self {
        self.scripts.insert(category, Script::Respond(raw.into()));
        self
    }

    /// Fail `category` requests with `error`.
    pub fn fail(mut self, category: PatternCategory, error: OracleError) -> Self {
        self.scripts.insert(category, Script::Fail(error));
        self
    }

    pub fn with_fallback(mut self, raw: impl Into<String>) -> Self {
        self.fallback = Some(raw.into());
        self
    }

    /// Every request seen so far, in call order.
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    fn validate(&self, request: &OracleRequest) -> Result<Vec<OracleJudgment>, OracleError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        match self.scripts.get(&request.category) {
            Some(Script::Respond(raw)) => parse_response(raw, request),
            Some(Script::Fail(error)) => Err(error.clone()),
            None => match &self.fallback {
                Some(raw) => parse_response(raw, request),
                None => Ok(Vec::new()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rapport_core::traits::Verdict;
    use rapport_core::types::{Message, Sender};

    use super::*;

    fn request(category: PatternCategory) -> OracleRequest {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        OracleRequest::new(category, vec![Message::new("m1", ts, Sender::A, "esquece")])
    }

    #[test]
    fn scripted_category_is_parsed() {
        let oracle = ScriptedOracle::new().respond(
            PatternCategory::Stonewalling,
            r#"{"validity_flags": [{"message_id": "m1", "is_valid": false, "confidence": 0.8}]}"#,
        );
        let judgments = oracle.validate(&request(PatternCategory::Stonewalling)).unwrap();
        assert_eq!(judgments.len(), 1);
        assert_eq!(judgments[0].verdict, Verdict::Validity { is_valid: false });
        assert_eq!(oracle.call_count(), 1);
    }

    #[test]
    fn unscripted_category_yields_no_judgments() {
        let oracle = ScriptedOracle::new();
        assert!(oracle.validate(&request(PatternCategory::Repair)).unwrap().is_empty());
        assert_eq!(oracle.requests()[0].category, PatternCategory::Repair);
    }

    #[test]
    fn scripted_failure_is_returned() {
        let oracle = ScriptedOracle::new().fail(
            PatternCategory::Contempt,
            OracleError::Quota {
                reason: "429".to_string(),
            },
        );
        assert!(matches!(
            oracle.validate(&request(PatternCategory::Contempt)),
            Err(OracleError::Quota { .. })
        ));
    }

    #[test]
    fn fallback_applies_to_unscripted_categories() {
        let oracle = ScriptedOracle::new().with_fallback("isto não é JSON");
        assert!(matches!(
            oracle.validate(&request(PatternCategory::Criticism)),
            Err(OracleError::InvalidResponse { .. })
        ));
    }
}
