//! Value types shared across the engine. Everything here is recomputed per run.

pub mod balance;
pub mod dimension;
pub mod message;
pub mod pattern;
pub mod result;
pub mod stream;
pub mod window;

pub use balance::{BalanceMetrics, PerSender, Split};
pub use dimension::{Component, Dimension};
pub use message::{Message, MessageKind, RawMessage, Sender};
pub use pattern::{MatchSource, PatternCategory, PatternMatch, Polarity, Span};
pub use result::{
    Alert, AlertSeverity, ComponentScore, DimensionScore, HealthLabel, HealthScoreResult,
    Insight, Insights,
};
pub use stream::MessageStream;
pub use window::ScoringWindow;
