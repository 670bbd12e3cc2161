//! Oracle validation stage.
//!
//! Rule matches in the oracle-validated categories are sent to the oracle in
//! per-category batches. Each batch runs on a worker thread and is awaited
//! with a timeout. A failed, timed-out, or cancelled batch keeps its rule
//! matches unchanged and is recorded as a degradation; the run never fails
//! because of the oracle.
//!
//! The oracle can only remove or re-stamp candidates the detector produced.
//! Judgments for messages without a candidate in that category are ignored.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use rapport_core::config::OracleConfig;
use rapport_core::errors::OracleError;
use rapport_core::tracing::metrics;
use rapport_core::traits::{
    Cancellable, CancellationToken, Oracle, OracleJudgment, OracleRequest,
};
use rapport_core::types::{Component, MatchSource, Message, PatternCategory, PatternMatch};

/// Fallback recorded for every degraded batch.
pub const RULE_ONLY_FALLBACK: &str = "rule-only";

/// One oracle batch that fell back to rule-based counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradationEvent {
    pub component: Component,
    pub category: PatternCategory,
    pub batch_size: usize,
    pub failure: String,
    pub fallback_used: String,
}

/// Accumulates degraded batches during one validation pass.
#[derive(Debug, Default)]
pub struct DegradationTracker {
    events: Vec<DegradationEvent>,
}

impl DegradationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, category: PatternCategory, batch_size: usize, error: &OracleError) {
        tracing::warn!(
            category = %category,
            { metrics::ORACLE_BATCH_SIZE } = batch_size,
            failure = %error,
            "oracle batch degraded to rule-only"
        );
        self.events.push(DegradationEvent {
            component: category.owner(),
            category,
            batch_size,
            failure: error.to_string(),
            fallback_used: RULE_ONLY_FALLBACK.to_string(),
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn events(&self) -> &[DegradationEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<DegradationEvent> {
        self.events
    }
}

/// Which components the oracle actually validated in a window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationStatus {
    consulted: BTreeSet<Component>,
    degraded: BTreeSet<Component>,
}

impl ValidationStatus {
    /// Consulted at least once and never degraded.
    pub fn is_validated(&self, component: Component) -> bool {
        self.consulted.contains(&component) && !self.degraded.contains(&component)
    }

    pub fn mark_consulted(&mut self, component: Component) {
        self.consulted.insert(component);
    }

    pub fn mark_degraded(&mut self, component: Component) {
        self.degraded.insert(component);
    }
}

/// Result of validating one window's rule matches.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    /// Matches that count, in input order.
    pub accepted: Vec<PatternMatch>,
    /// Matches the oracle rejected with enough confidence. Kept for audit.
    pub suppressed: Vec<PatternMatch>,
    pub status: ValidationStatus,
    pub degradations: Vec<DegradationEvent>,
    pub errors: Vec<OracleError>,
}

impl ValidationOutcome {
    fn rule_only(matches: Vec<PatternMatch>) -> Self {
        Self {
            accepted: matches,
            ..Self::default()
        }
    }
}

pub struct OracleValidator<'a> {
    oracle: Arc<dyn Oracle>,
    config: &'a OracleConfig,
    cancel: &'a CancellationToken,
}

impl<'a> OracleValidator<'a> {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        config: &'a OracleConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            oracle,
            config,
            cancel,
        }
    }

    /// Whether this validator will consult the oracle at all.
    pub fn is_active(&self) -> bool {
        self.config.effective_use_llm() && self.oracle.is_available()
    }

    /// Validate `matches`, which were detected on `messages`.
    pub fn validate(&self, messages: &[Message], matches: Vec<PatternMatch>) -> ValidationOutcome {
        if !self.is_active() || matches.is_empty() {
            return ValidationOutcome::rule_only(matches);
        }

        let threshold = self.config.effective_llm_confidence_threshold();
        let batch_size = self.config.effective_batch_size().max(1);
        let timeout = Duration::from_millis(self.config.effective_timeout_ms());
        let by_id: FxHashMap<&str, &Message> =
            messages.iter().map(|m| (m.id.as_str(), m)).collect();

        let mut status = ValidationStatus::default();
        let mut tracker = DegradationTracker::new();
        let mut errors = Vec::new();
        let mut judgments: FxHashMap<PatternCategory, FxHashMap<String, OracleJudgment>> =
            FxHashMap::default();

        for category in self.config.effective_validated_categories() {
            let mut seen = FxHashSet::default();
            let candidates: Vec<&str> = matches
                .iter()
                .filter(|m| m.category == category)
                .map(|m| m.message_id.as_str())
                .filter(|id| seen.insert(*id))
                .collect();

            for chunk in candidates.chunks(batch_size) {
                if self.cancel.is_cancelled() {
                    let error = OracleError::Cancelled;
                    tracker.record(category, chunk.len(), &error);
                    status.mark_degraded(category.owner());
                    errors.push(error);
                    continue;
                }

                let batch: Vec<Message> = chunk
                    .iter()
                    .filter_map(|id| by_id.get(id).map(|m| (*m).clone()))
                    .collect();
                let request = OracleRequest::new(category, batch);
                let started = Instant::now();
                match call_with_timeout(Arc::clone(&self.oracle), request, timeout) {
                    Ok(returned) => {
                        tracing::debug!(
                            oracle = self.oracle.name(),
                            category = %category,
                            { metrics::ORACLE_BATCH_SIZE } = chunk.len(),
                            judgments = returned.len(),
                            { metrics::ORACLE_CALL_TIME_MS } = started.elapsed().as_millis() as u64,
                            "oracle batch validated"
                        );
                        status.mark_consulted(category.owner());
                        let in_batch: FxHashSet<&str> = chunk.iter().copied().collect();
                        let slot = judgments.entry(category).or_default();
                        for judgment in returned {
                            if in_batch.contains(judgment.message_id.as_str()) {
                                slot.insert(judgment.message_id.clone(), judgment);
                            }
                        }
                    }
                    Err(error) => {
                        tracker.record(category, chunk.len(), &error);
                        status.mark_degraded(category.owner());
                        errors.push(error);
                    }
                }
            }
        }

        let mut accepted = Vec::with_capacity(matches.len());
        let mut suppressed = Vec::new();
        for mut m in matches {
            let judgment = judgments
                .get(&m.category)
                .and_then(|j| j.get(m.message_id.as_str()))
                .filter(|j| j.confidence >= threshold);
            match judgment {
                Some(j) if j.verdict.rejects() => suppressed.push(m),
                Some(j) => {
                    m.source = MatchSource::Llm;
                    m.confidence = j.confidence;
                    accepted.push(m);
                }
                None => accepted.push(m),
            }
        }

        ValidationOutcome {
            accepted,
            suppressed,
            status,
            degradations: tracker.into_events(),
            errors,
        }
    }
}

/// Run one oracle call on a worker thread, waiting at most `timeout`.
/// A call that outlives the timeout is abandoned; its result is dropped.
fn call_with_timeout(
    oracle: Arc<dyn Oracle>,
    request: OracleRequest,
    timeout: Duration,
) -> Result<Vec<OracleJudgment>, OracleError> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::Builder::new()
        .name("rapport-oracle".to_string())
        .spawn(move || {
            let _ = tx.send(oracle.validate(&request));
        })
        .map_err(|e| OracleError::Transport {
            reason: format!("failed to spawn oracle worker: {e}"),
        })?;
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(OracleError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
        Err(RecvTimeoutError::Disconnected) => Err(OracleError::Transport {
            reason: "oracle worker exited without a response".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};
    use rapport_core::traits::{NoOpOracle, Verdict};
    use rapport_core::types::{Polarity, Sender};

    use super::*;

    struct FixedOracle {
        judgments: Vec<OracleJudgment>,
        calls: Mutex<usize>,
    }

    impl Oracle for FixedOracle {
        fn name(&self) -> &str {
            "fixed"
        }

        fn validate(&self, request: &OracleRequest) -> Result<Vec<OracleJudgment>, OracleError> {
            *self.calls.lock().unwrap() += 1;
            Ok(self
                .judgments
                .iter()
                .filter(|j| request.messages.iter().any(|m| m.id == j.message_id))
                .cloned()
                .collect())
        }
    }

    struct FailingOracle;

    impl Oracle for FailingOracle {
        fn name(&self) -> &str {
            "failing"
        }

        fn validate(&self, _request: &OracleRequest) -> Result<Vec<OracleJudgment>, OracleError> {
            Err(OracleError::Quota {
                reason: "rate limited".to_string(),
            })
        }
    }

    fn message(id: &str) -> Message {
        Message::new(id, Utc.with_ymd_and_hms(2024, 2, 2, 10, 0, 0).unwrap(), Sender::A, "x")
    }

    fn rule_match(id: &str, category: PatternCategory) -> PatternMatch {
        PatternMatch {
            message_id: id.to_string(),
            sender: Sender::A,
            timestamp: Utc.with_ymd_and_hms(2024, 2, 2, 10, 0, 0).unwrap(),
            category,
            polarity: category.polarity(),
            source: MatchSource::Rule,
            confidence: 1.0,
            score_impact: -8,
            span: None,
            excerpt: "x".to_string(),
            trigger_id: format!("{category}.1"),
        }
    }

    fn judgment(id: &str, is_valid: bool, confidence: f64) -> OracleJudgment {
        OracleJudgment {
            message_id: id.to_string(),
            verdict: Verdict::Validity { is_valid },
            confidence,
            reasoning: String::new(),
        }
    }

    fn enabled() -> OracleConfig {
        OracleConfig {
            use_llm: Some(true),
            ..OracleConfig::default()
        }
    }

    #[test]
    fn confident_rejection_suppresses_and_confident_acceptance_restamps() {
        let oracle = Arc::new(FixedOracle {
            judgments: vec![
                judgment("1", false, 0.9),
                judgment("2", true, 0.8),
                judgment("3", false, 0.5),
            ],
            calls: Mutex::new(0),
        });
        let config = enabled();
        let cancel = CancellationToken::new();
        let validator = OracleValidator::new(oracle.clone(), &config, &cancel);
        let messages = vec![message("1"), message("2"), message("3")];
        let matches = vec![
            rule_match("1", PatternCategory::Contempt),
            rule_match("2", PatternCategory::Contempt),
            rule_match("3", PatternCategory::Contempt),
        ];
        let out = validator.validate(&messages, matches);

        assert_eq!(out.suppressed.len(), 1);
        assert_eq!(out.suppressed[0].message_id, "1");
        assert_eq!(out.accepted.len(), 2);
        assert_eq!(out.accepted[0].source, MatchSource::Llm);
        assert_eq!(out.accepted[0].confidence, 0.8);
        // Below threshold: untouched.
        assert_eq!(out.accepted[1].source, MatchSource::Rule);
        assert!(out.status.is_validated(Component::EmotionalSafety));
        assert_eq!(*oracle.calls.lock().unwrap(), 1);
    }

    #[test]
    fn judgments_for_unflagged_messages_are_ignored() {
        let oracle = Arc::new(FixedOracle {
            judgments: vec![judgment("9", false, 1.0)],
            calls: Mutex::new(0),
        });
        let config = enabled();
        let cancel = CancellationToken::new();
        let validator = OracleValidator::new(oracle, &config, &cancel);
        let out = validator.validate(
            &[message("1"), message("9")],
            vec![rule_match("1", PatternCategory::Criticism)],
        );
        assert_eq!(out.accepted.len(), 1);
        assert!(out.suppressed.is_empty());
    }

    #[test]
    fn failure_degrades_to_rule_only() {
        let config = enabled();
        let cancel = CancellationToken::new();
        let validator = OracleValidator::new(Arc::new(FailingOracle), &config, &cancel);
        let matches = vec![rule_match("1", PatternCategory::Stonewalling)];
        let out = validator.validate(&[message("1")], matches.clone());
        assert_eq!(out.accepted, matches);
        assert_eq!(out.degradations.len(), 1);
        assert_eq!(out.degradations[0].fallback_used, RULE_ONLY_FALLBACK);
        assert!(!out.status.is_validated(Component::EmotionalSafety));
        assert_eq!(out.errors.len(), 1);
    }

    #[test]
    fn cancelled_token_skips_every_batch() {
        let config = enabled();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let oracle = Arc::new(FixedOracle {
            judgments: vec![judgment("1", false, 1.0)],
            calls: Mutex::new(0),
        });
        let validator = OracleValidator::new(oracle.clone(), &config, &cancel);
        let out = validator.validate(&[message("1")], vec![rule_match("1", PatternCategory::Contempt)]);
        assert_eq!(out.accepted.len(), 1);
        assert_eq!(out.errors, vec![OracleError::Cancelled]);
        assert_eq!(*oracle.calls.lock().unwrap(), 0);
    }

    #[test]
    fn disabled_or_unavailable_oracle_is_rule_only() {
        let cancel = CancellationToken::new();
        let config = enabled();
        let validator = OracleValidator::new(Arc::new(NoOpOracle), &config, &cancel);
        assert!(!validator.is_active());

        let off = OracleConfig::default();
        let validator = OracleValidator::new(Arc::new(FailingOracle), &off, &cancel);
        let out = validator.validate(&[message("1")], vec![rule_match("1", PatternCategory::Contempt)]);
        assert!(out.degradations.is_empty());
        assert_eq!(out.status, ValidationStatus::default());
        assert_eq!(out.accepted[0].polarity, Polarity::Negative);
    }

    #[test]
    fn batches_respect_batch_size() {
        let oracle = Arc::new(FixedOracle {
            judgments: Vec::new(),
            calls: Mutex::new(0),
        });
        let config = OracleConfig {
            use_llm: Some(true),
            batch_size: Some(2),
            ..OracleConfig::default()
        };
        let cancel = CancellationToken::new();
        let validator = OracleValidator::new(oracle.clone(), &config, &cancel);
        let ids = ["1", "2", "3", "4", "5"];
        let messages: Vec<Message> = ids.iter().map(|id| message(id)).collect();
        let matches = ids
            .iter()
            .map(|id| rule_match(id, PatternCategory::Criticism))
            .collect();
        let out = validator.validate(&messages, matches);
        assert_eq!(*oracle.calls.lock().unwrap(), 3);
        assert_eq!(out.accepted.len(), 5);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn batch_logs_use_shared_metric_field_names() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let config = enabled();
        let cancel = CancellationToken::new();
        let messages = vec![message("1"), message("2")];
        tracing::subscriber::with_default(subscriber, || {
            let ok = OracleValidator::new(
                Arc::new(FixedOracle {
                    judgments: Vec::new(),
                    calls: Mutex::new(0),
                }),
                &config,
                &cancel,
            );
            ok.validate(&messages, vec![rule_match("1", PatternCategory::Contempt)]);
            let failing = OracleValidator::new(Arc::new(FailingOracle), &config, &cancel);
            failing.validate(&messages, vec![rule_match("2", PatternCategory::Criticism)]);
        });

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains(&format!("{}=1", metrics::ORACLE_BATCH_SIZE)), "{logs}");
        assert!(logs.contains(metrics::ORACLE_CALL_TIME_MS), "{logs}");
        assert!(logs.contains("oracle batch degraded to rule-only"), "{logs}");
    }
}
