//! Structured field names used in spans and events across rapport crates.

/// Detector: wall time for one window's detection pass, in milliseconds.
pub const DETECTION_TIME_MS: &str = "detection_time_ms";

/// Detector: messages examined in the window.
pub const MESSAGES_IN_WINDOW: &str = "messages_in_window";

/// Detector: rule matches produced before oracle validation.
pub const RULE_MATCHES: &str = "rule_matches";

/// Oracle: messages in one batch.
pub const ORACLE_BATCH_SIZE: &str = "oracle_batch_size";

/// Oracle: round-trip time for one batch, in milliseconds.
pub const ORACLE_CALL_TIME_MS: &str = "oracle_call_time_ms";

/// Oracle: matches suppressed by the oracle in one run.
pub const ORACLE_SUPPRESSED: &str = "oracle_suppressed";

/// Aggregator: overall score of the run.
pub const OVERALL_SCORE: &str = "overall_score";

/// Aggregator: confidence of the run.
pub const CONFIDENCE: &str = "confidence";
