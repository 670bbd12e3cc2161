//! Pattern catalog load-time errors. Fatal: a catalog that fails here is never used.

use super::error_code::{self, RapportErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The same trigger (normalized) is claimed by two categories.
    #[error("Trigger '{trigger}' is claimed by both {first} and {second}")]
    Inconsistency {
        trigger: String,
        first: String,
        second: String,
    },

    #[error("Invalid pattern '{trigger}' in category {category}: {message}")]
    InvalidPattern {
        category: String,
        trigger: String,
        message: String,
    },

    #[error("Unknown category '{0}'")]
    UnknownCategory(String),

    #[error("Category {0} is missing from the catalog")]
    MissingCategory(String),

    #[error("Category {0} is declared more than once")]
    DuplicateCategory(String),

    #[error("Category {category} declares {field} '{declared}', expected '{expected}'")]
    OwnerMismatch {
        category: String,
        field: String,
        declared: String,
        expected: String,
    },

    #[error("Catalog parse error in {source_name}: {message}")]
    ParseError {
        source_name: String,
        message: String,
    },
}

impl RapportErrorCode for CatalogError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Inconsistency { .. } => error_code::CATALOG_INCONSISTENCY,
            _ => error_code::CATALOG_ERROR,
        }
    }
}
