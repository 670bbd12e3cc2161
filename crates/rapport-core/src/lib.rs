//! Core types, traits, errors, config, and tracing for the rapport engine.
//!
//! Every other rapport crate depends on this one. It holds no scoring logic:
//! the message model, the result shapes, the layered configuration, the
//! error taxonomy, and the `Oracle` capability live here so that the
//! analysis engine and the oracle adapters never depend on each other.

pub mod config;
pub mod errors;
pub mod tracing;
pub mod traits;
pub mod types;
