//! Run-level errors and non-fatal error collection.

use super::error_code::{self, RapportErrorCode};
use super::{CatalogError, ConfigError, MessageError, OracleError};

/// Errors that can surface from a scoring run.
/// Aggregates subsystem errors via `From` conversions.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Malformed message: {0}")]
    Message(#[from] MessageError),

    #[error("Oracle unavailable: {0}")]
    Oracle(#[from] OracleError),

    #[error("Run cancelled")]
    Cancelled,
}

impl RapportErrorCode for RunError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Catalog(e) => e.error_code(),
            Self::Message(e) => e.error_code(),
            Self::Oracle(e) => e.error_code(),
            Self::Cancelled => error_code::CANCELLED,
        }
    }
}

/// Result of a run that accumulates non-fatal errors alongside the data.
#[derive(Debug, Default)]
pub struct RunResult<T: Default = ()> {
    pub data: T,
    pub errors: Vec<RunError>,
}

impl<T: Default> RunResult<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            errors: Vec::new(),
        }
    }

    /// Add a non-fatal error to the result.
    pub fn add_error(&mut self, error: impl Into<RunError>) {
        self.errors.push(error.into());
    }

    /// Returns true if there are no non-fatal errors.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}
