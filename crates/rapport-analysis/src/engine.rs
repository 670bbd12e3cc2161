//! Run orchestrator: `(MessageStream, ScoringWindow, RapportConfig) → HealthScoreResult`.
//!
//! A run holds no state between invocations. The catalog is loaded once per
//! engine and shared read-only with the detection workers.

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use rapport_core::config::RapportConfig;
use rapport_core::errors::RunError;
use rapport_core::tracing::metrics;
use rapport_core::traits::{CancellationToken, NoOpOracle, Oracle};
use rapport_core::types::{
    DimensionScore, HealthScoreResult, Message, MessageStream, PatternMatch, ScoringWindow,
};

use crate::aggregate::{build_result, ResultParts};
use crate::balance::compute_balance;
use crate::catalog::{CatalogLoader, PatternCatalog};
use crate::detector::{MessageDetection, PatternDetector};
use crate::filter::{FilterReason, MessageFilter};
use crate::pulse::{weekly_pulse, WeeklyPulse};
use crate::scoring::{round1, score_dimensions, weighted_overall, ScoringInput};
use crate::validation::{DegradationEvent, OracleValidator, ValidationOutcome};

/// Counters for one run, keyed by the shared tracing field names.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunStats {
    pub detection_time_ms: u64,
    pub messages_in_window: usize,
    pub rule_matches: usize,
    pub oracle_suppressed: usize,
    pub overall: f64,
    pub confidence: f64,
}

impl RunStats {
    pub fn fields(&self) -> [(&'static str, f64); 6] {
        [
            (metrics::DETECTION_TIME_MS, self.detection_time_ms as f64),
            (metrics::MESSAGES_IN_WINDOW, self.messages_in_window as f64),
            (metrics::RULE_MATCHES, self.rule_matches as f64),
            (metrics::ORACLE_SUPPRESSED, self.oracle_suppressed as f64),
            (metrics::OVERALL_SCORE, self.overall),
            (metrics::CONFIDENCE, self.confidence),
        ]
    }
}

/// Everything one run produced. `result` is the public contract; the rest
/// is audit data.
#[derive(Debug)]
pub struct RunOutcome {
    pub result: HealthScoreResult,
    /// Matches counted in the current window, in message order.
    pub matches: Vec<PatternMatch>,
    /// Matches the oracle rejected in the current window.
    pub suppressed: Vec<PatternMatch>,
    pub degradations: Vec<DegradationEvent>,
    /// Messages removed by the filter, with the reason.
    pub filtered_out: Vec<(String, FilterReason)>,
    pub pulse: Vec<WeeklyPulse>,
    pub stats: RunStats,
    /// Non-fatal errors (oracle failures). Never affects whether a result exists.
    pub errors: Vec<RunError>,
}

impl RunOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

struct WindowScore {
    dimensions: Vec<DimensionScore>,
    validation: ValidationOutcome,
    message_count: usize,
    text_messages: usize,
    rule_matches: usize,
}

pub struct HealthEngine {
    config: RapportConfig,
    catalog: Arc<PatternCatalog>,
    oracle: Arc<dyn Oracle>,
    cancel: CancellationToken,
}

impl HealthEngine {
    /// Validate `config` and load the catalog it names (or the embedded one).
    /// Catalog errors are fatal here and never surface during a run.
    pub fn new(config: RapportConfig) -> Result<Self, RunError> {
        RapportConfig::validate(&config)?;
        let catalog = match &config.detection.catalog_path {
            Some(path) => CatalogLoader::load_from_file(path)?,
            None => CatalogLoader::load_default()?,
        };
        Ok(Self::with_catalog(config, catalog))
    }

    /// Use an already-compiled catalog. Runs in rule-only mode until an
    /// oracle is attached.
    pub fn with_catalog(config: RapportConfig, catalog: PatternCatalog) -> Self {
        Self {
            config,
            catalog: Arc::new(catalog),
            oracle: Arc::new(NoOpOracle),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Share a cancellation token; cancelling it skips remaining oracle batches.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &RapportConfig {
        &self.config
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The trailing window of `scoring_window_days` ending at the stream's
    /// last message (the Unix epoch for an empty stream).
    pub fn default_window(&self, stream: &MessageStream) -> ScoringWindow {
        let end = stream
            .last_timestamp()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        ScoringWindow::trailing(end, self.config.scoring.effective_scoring_window_days())
    }

    /// Score `stream` over `window` (or the default trailing window).
    /// Always returns a result; degraded runs are reported in-band.
    pub fn score(&self, stream: &MessageStream, window: Option<ScoringWindow>) -> RunOutcome {
        let started = Instant::now();
        let window = window.unwrap_or_else(|| self.default_window(stream));

        // Phase 1: Drop non-dyadic messages.
        let filtered = MessageFilter::new(&self.catalog).filter(stream);
        let messages = filtered.stream.messages();

        // Phase 2: Detect every message against its predecessor.
        let detections = PatternDetector::new(&self.catalog)
            .detect_all(messages, self.config.detection.effective_parallel());
        let detection_time_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(
            messages = messages.len(),
            detection_time_ms,
            "detection pass complete"
        );

        // Phase 3: Validate and score the current and previous windows.
        let validator =
            OracleValidator::new(Arc::clone(&self.oracle), &self.config.oracle, &self.cancel);
        let current = self.score_range(
            &validator,
            messages,
            &detections,
            filtered.stream.window_range(&window),
        );
        let previous = self.score_range(
            &validator,
            messages,
            &detections,
            filtered.stream.window_range(&window.previous()),
        );
        let previous_overall = (previous.text_messages > 0)
            .then(|| round1(weighted_overall(&previous.dimensions)));

        // Phase 4: Aggregate.
        let result = build_result(ResultParts {
            dimensions: current.dimensions,
            matches: &current.validation.accepted,
            catalog: &self.catalog,
            config: &self.config.scoring,
            window,
            message_count: current.message_count,
            previous_overall,
        });

        // Phase 5: Weekly pulse (rule matches only).
        let pulse = weekly_pulse(messages, &detections, window.end, &self.catalog, &self.config);

        let stats = RunStats {
            detection_time_ms,
            messages_in_window: current.message_count,
            rule_matches: current.rule_matches,
            oracle_suppressed: current.validation.suppressed.len(),
            overall: result.overall,
            confidence: result.confidence,
        };
        tracing::info!(
            stats = ?stats.fields(),
            label = %result.label_en,
            degraded_batches = current.validation.degradations.len() + previous.validation.degradations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scoring run complete"
        );

        let mut degradations = current.validation.degradations;
        degradations.extend(previous.validation.degradations);
        let errors = current
            .validation
            .errors
            .into_iter()
            .chain(previous.validation.errors)
            .map(RunError::from)
            .collect();

        RunOutcome {
            result,
            matches: current.validation.accepted,
            suppressed: current.validation.suppressed,
            degradations,
            filtered_out: filtered.dropped,
            pulse,
            stats,
            errors,
        }
    }

    fn score_range(
        &self,
        validator: &OracleValidator<'_>,
        messages: &[Message],
        detections: &[MessageDetection],
        range: Range<usize>,
    ) -> WindowScore {
        let window_messages = &messages[range.clone()];
        let window_detections = &detections[range];
        let rule_matches: Vec<PatternMatch> = window_detections
            .iter()
            .flat_map(|d| d.matches.iter().cloned())
            .collect();
        let rule_count = rule_matches.len();
        let validation = validator.validate(window_messages, rule_matches);
        let balance = compute_balance(window_messages, &self.catalog, &self.config.detection);
        let input = ScoringInput {
            messages: window_messages,
            detections: window_detections,
            matches: &validation.accepted,
            balance: &balance,
            validation: &validation.status,
            config: &self.config,
        };
        let dimensions = score_dimensions(&input);
        WindowScore {
            text_messages: input.text_message_count(),
            dimensions,
            validation,
            message_count: window_messages.len(),
            rule_matches: rule_count,
        }
    }
}
