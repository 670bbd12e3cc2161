//! Error handling for rapport.
//! One error enum per subsystem, `thiserror` only.

pub mod catalog_error;
pub mod config_error;
pub mod error_code;
pub mod message_error;
pub mod oracle_error;
pub mod run_error;

pub use catalog_error::CatalogError;
pub use config_error::ConfigError;
pub use error_code::RapportErrorCode;
pub use message_error::MessageError;
pub use oracle_error::OracleError;
pub use run_error::{RunError, RunResult};
