//! Capability traits at the engine's seams.

pub mod cancellation;
pub mod oracle;

pub use cancellation::{Cancellable, CancellationToken};
pub use oracle::{NoOpOracle, Oracle, OracleJudgment, OracleRequest, Verdict};
