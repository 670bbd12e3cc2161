//! # rapport-analysis
//!
//! The scoring engine: declarative pattern catalog, message filter,
//! priority-ordered detector, balance calculator, the four dimension
//! scorers, optional oracle validation, and aggregation into a
//! `HealthScoreResult`.

pub mod aggregate;
pub mod balance;
pub mod catalog;
pub mod detector;
pub mod engine;
pub mod filter;
pub mod pulse;
pub mod scoring;
pub mod validation;

// Re-export the most commonly used types at the crate root.
pub use catalog::{CatalogLoader, PatternCatalog};
pub use detector::{MessageDetection, PatternDetector};
pub use engine::{HealthEngine, RunOutcome, RunStats};
pub use filter::{FilterReason, MessageFilter};
pub use pulse::WeeklyPulse;
pub use validation::{DegradationEvent, OracleValidator, ValidationOutcome};
