//! Tolerant parsing of model output into `OracleJudgment`s.
//!
//! Accepts bare JSON, JSON inside a markdown code fence, or JSON embedded in
//! prose. Two shapes are understood:
//!
//! - `validity_flags`: `[{message_id, is_valid, confidence, reasoning}]`
//! - `category_counts`: `[{message_id, count, confidence, reasoning}]` or a
//!   `{message_id: count}` map
//!
//! plus a flat single-judgment object for one-message batches. Entries naming
//! messages outside the request are dropped.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde_json::Value;

use rapport_core::errors::OracleError;
use rapport_core::traits::{OracleJudgment, OracleRequest, Verdict};

/// First flat (brace-free) JSON object in a string.
static FLAT_OBJECT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)\{[^{}]*\}").ok());

#[derive(Debug, Deserialize)]
struct ValidityEntry {
    #[serde(default, alias = "messageId")]
    message_id: Option<String>,
    #[serde(alias = "isValid")]
    is_valid: bool,
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Deserialize)]
struct CountEntry {
    #[serde(default, alias = "messageId")]
    message_id: Option<String>,
    count: u32,
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Counts {
    List(Vec<CountEntry>),
    Map(BTreeMap<String, u32>),
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(alias = "validityFlags")]
    validity_flags: Option<Vec<ValidityEntry>>,
    #[serde(alias = "categoryCounts")]
    category_counts: Option<Counts>,
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: String,
    // Flat single-judgment form.
    #[serde(alias = "messageId")]
    message_id: Option<String>,
    #[serde(alias = "isValid")]
    is_valid: Option<bool>,
    count: Option<u32>,
}

/// Pull a JSON object out of raw model output.
pub fn extract_json(raw: &str) -> Option<Value> {
    let text = strip_code_fence(raw.trim());
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Some(value);
            }
        }
    }
    let re = FLAT_OBJECT_RE.as_ref()?;
    re.find(text)
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .filter(Value::is_object)
}

fn strip_code_fence(text: &str) -> &str {
    if !text.starts_with("```") {
        return text;
    }
    // Drop the opening fence line (with any language tag) and a closing fence.
    let body = text.split_once('\n').map_or("", |(_, rest)| rest);
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse raw model output for `request`.
pub fn parse_response(raw: &str, request: &OracleRequest) -> Result<Vec<OracleJudgment>, OracleError> {
    let value = extract_json(raw).ok_or_else(|| OracleError::InvalidResponse {
        reason: "no JSON object in response".to_string(),
    })?;
    let envelope: Envelope =
        serde_json::from_value(value).map_err(|e| OracleError::InvalidResponse {
            reason: e.to_string(),
        })?;

    let ids: FxHashSet<&str> = request.messages.iter().map(|m| m.id.as_str()).collect();
    let only_id = match request.messages.as_slice() {
        [single] => Some(single.id.as_str()),
        _ => None,
    };
    let default_confidence = envelope.confidence;
    let mut judgments = Vec::new();
    let mut push = |id: Option<String>, verdict: Verdict, confidence: Option<f64>, reasoning: String| {
        let Some(id) = id.or_else(|| only_id.map(str::to_string)) else {
            return;
        };
        if !ids.contains(id.as_str()) {
            tracing::debug!(message_id = %id, category = %request.category, "oracle judged a message outside the batch");
            return;
        }
        judgments.push(OracleJudgment {
            message_id: id,
            verdict,
            confidence: clamp_confidence(confidence.or(default_confidence)),
            reasoning,
        });
    };

    let mut recognized = false;
    if let Some(flags) = envelope.validity_flags {
        recognized = true;
        for e in flags {
            push(e.message_id, Verdict::Validity { is_valid: e.is_valid }, e.confidence, e.reasoning);
        }
    }
    match envelope.category_counts {
        Some(Counts::List(entries)) => {
            recognized = true;
            for e in entries {
                push(e.message_id, Verdict::Count(e.count), e.confidence, e.reasoning);
            }
        }
        Some(Counts::Map(map)) => {
            recognized = true;
            for (id, count) in map {
                push(Some(id), Verdict::Count(count), None, envelope.reasoning.clone());
            }
        }
        None => {}
    }
    if !recognized {
        let verdict = match (envelope.is_valid, envelope.count) {
            (Some(is_valid), _) => Some(Verdict::Validity { is_valid }),
            (None, Some(count)) => Some(Verdict::Count(count)),
            (None, None) => None,
        };
        let Some(verdict) = verdict else {
            return Err(OracleError::InvalidResponse {
                reason: "expected validity_flags or category_counts".to_string(),
            });
        };
        push(envelope.message_id, verdict, None, envelope.reasoning);
    }
    Ok(judgments)
}

fn clamp_confidence(confidence: Option<f64>) -> f64 {
    match confidence {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use rapport_core::types::{Message, PatternCategory, Sender};

    use super::*;

    fn request(ids: &[&str]) -> OracleRequest {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        OracleRequest::new(
            PatternCategory::Contempt,
            ids.iter().map(|id| Message::new(*id, ts, Sender::A, "x")).collect(),
        )
    }

    proptest! {
        #[test]
        fn confidence_is_always_clamped(confidence in -1.0e6f64..1.0e6, is_valid in any::<bool>()) {
            let raw = serde_json::json!({
                "validity_flags": [{"message_id": "m1", "is_valid": is_valid, "confidence": confidence}]
            })
            .to_string();
            let judgments = parse_response(&raw, &request(&["m1"])).unwrap();
            prop_assert_eq!(judgments.len(), 1);
            prop_assert!((0.0..=1.0).contains(&judgments[0].confidence));
            prop_assert_eq!(judgments[0].verdict, Verdict::Validity { is_valid });
        }

        #[test]
        fn arbitrary_text_never_panics(raw in ".{0,200}") {
            let _ = parse_response(&raw, &request(&["m1", "m2"]));
        }
    }

    #[test]
    fn parses_validity_flags_inside_code_fence() {
        let raw = "```json\n{\"validity_flags\": [\
            {\"message_id\": \"m1\", \"is_valid\": false, \"confidence\": 0.92, \"reasoning\": \"brincadeira\"},\
            {\"message_id\": \"m2\", \"is_valid\": true, \"confidence\": 0.8}\
        ]}\n```";
        let judgments = parse_response(raw, &request(&["m1", "m2"])).unwrap();
        assert_eq!(judgments.len(), 2);
        assert_eq!(judgments[0].verdict, Verdict::Validity { is_valid: false });
        assert_eq!(judgments[0].confidence, 0.92);
        assert_eq!(judgments[0].reasoning, "brincadeira");
        assert_eq!(judgments[1].verdict, Verdict::Validity { is_valid: true });
    }

    #[test]
    fn parses_category_counts_map_with_top_level_confidence() {
        let raw = "Aqui está a análise:\n{\"category_counts\": {\"m1\": 0, \"m2\": 2}, \"confidence\": 0.75, \"reasoning\": \"ok\"}\nEspero ter ajudado.";
        let judgments = parse_response(raw, &request(&["m1", "m2"])).unwrap();
        assert_eq!(judgments.len(), 2);
        assert_eq!(judgments[0].message_id, "m1");
        assert_eq!(judgments[0].verdict, Verdict::Count(0));
        assert_eq!(judgments[0].confidence, 0.75);
        assert_eq!(judgments[1].verdict, Verdict::Count(2));
    }

    #[test]
    fn flat_object_applies_to_single_message_batch() {
        let raw = "Resultado: {\"is_valid\": false, \"confidence\": 1.7, \"reasoning\": \"sem sarcasmo\"} fim";
        let judgments = parse_response(raw, &request(&["only"])).unwrap();
        assert_eq!(judgments.len(), 1);
        assert_eq!(judgments[0].message_id, "only");
        // Out-of-range confidence is clamped.
        assert_eq!(judgments[0].confidence, 1.0);
    }

    #[test]
    fn unknown_message_ids_are_dropped() {
        let raw = r#"{"validity_flags": [{"message_id": "ghost", "is_valid": false, "confidence": 0.9}]}"#;
        assert!(parse_response(raw, &request(&["m1"])).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_an_invalid_response() {
        for raw in ["", "não sei", "{\"foo\": 1}", "[1, 2, 3]"] {
            assert!(matches!(
                parse_response(raw, &request(&["m1", "m2"])),
                Err(OracleError::InvalidResponse { .. })
            ));
        }
    }

    #[test]
    fn fence_without_closing_marker_is_tolerated() {
        let raw = "```\n{\"validity_flags\": [{\"message_id\": \"m1\", \"is_valid\": true, \"confidence\": 0.9}]}";
        assert_eq!(parse_response(raw, &request(&["m1"])).unwrap().len(), 1);
    }
}
