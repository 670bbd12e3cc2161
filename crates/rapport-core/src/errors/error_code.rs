//! Stable error codes for callers that cross a process or language boundary.

/// Every rapport error enum implements this to expose a machine-readable code.
pub trait RapportErrorCode {
    /// Returns the error code string (e.g., "CATALOG_INCONSISTENCY").
    fn error_code(&self) -> &'static str;

    /// Returns `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const CATALOG_INCONSISTENCY: &str = "CATALOG_INCONSISTENCY";
pub const CATALOG_ERROR: &str = "CATALOG_ERROR";
pub const MALFORMED_MESSAGE: &str = "MALFORMED_MESSAGE";
pub const ORACLE_UNAVAILABLE: &str = "ORACLE_UNAVAILABLE";
pub const ORACLE_TIMEOUT: &str = "ORACLE_TIMEOUT";
pub const ORACLE_INVALID_RESPONSE: &str = "ORACLE_INVALID_RESPONSE";
pub const CANCELLED: &str = "CANCELLED";
