//! Oracle adapters for rapport.
//!
//! The analysis engine only knows the `Oracle` trait from `rapport-core`.
//! This crate supplies concrete implementations and the pieces they share:
//!
//! - [`prompts`]: versioned per-category prompt templates
//! - [`response`]: tolerant parsing of model output into judgments
//! - [`cost`]: token usage and estimated spend
//! - [`scripted`]: canned responses for offline runs and tests
//! - [`http`]: Messages-API client (transport behind the `http` feature)

pub mod cost;
pub mod http;
pub mod prompts;
pub mod response;
pub mod scripted;

pub use cost::{CostReport, CostTable, CostTracker, Usage};
pub use http::HttpOracle;
pub use prompts::{PromptRegistry, PromptTemplate, ResponseShape};
pub use response::{extract_json, parse_response};
pub use scripted::ScriptedOracle;
