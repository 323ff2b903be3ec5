//! Result and error types for the core library

use chrono::NaiveDate;
use thiserror::Error;

use crate::ports::EngineError;

/// Core library error type
///
/// Wrapped engine failures are part of the message and are not exposed as
/// `source()`.
///
/// Local validation errors (`InvalidCredential`, `InvalidRange`, `Lifecycle`,
/// `SessionNotOpen`) are raised before the engine is contacted.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Engine initialization failed: {0}")]
    EngineInit(String),

    #[error("Engine teardown failed: {0}")]
    Teardown(EngineError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Session is not open")]
    SessionNotOpen,

    #[error("Invalid date range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("Credential rejected by engine: {0}")]
    CredentialRejected(EngineError),

    #[error("Query failed ({operation}): {error}")]
    QueryFailed {
        operation: &'static str,
        error: EngineError,
    },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid credential error
    pub fn invalid_credential(msg: impl Into<String>) -> Self {
        Self::InvalidCredential(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a lifecycle error
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// Create a malformed record error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Wrap an engine failure raised during a query
    pub fn query_failed(operation: &'static str, error: EngineError) -> Self {
        Self::QueryFailed { operation, error }
    }

    /// Whether retrying the same call might succeed
    ///
    /// Only engine-side query failures qualify. Everything else is a caller
    /// bug or a data defect.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::QueryFailed { .. })
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_range_message() {
        let err = Error::InvalidRange {
            from: NaiveDate::from_ymd_opt(2014, 5, 16).unwrap(),
            to: NaiveDate::from_ymd_opt(2014, 5, 14).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid date range: 2014-05-16 is after 2014-05-14"
        );
    }

    #[test]
    fn test_engine_message_appears_once_in_chain() {
        use std::error::Error as _;

        let errors = [
            Error::CredentialRejected(EngineError::rejected("unknown bank 30000000")),
            Error::query_failed("list_users", EngineError::rejected("unknown bank 30000000")),
            Error::Teardown(EngineError::rejected("unknown bank 30000000")),
        ];
        for err in errors {
            assert!(err.source().is_none());
            let chain = format!("{:#}", anyhow::Error::new(err));
            assert_eq!(chain.matches("unknown bank 30000000").count(), 1, "{}", chain);
        }
    }

    #[test]
    fn test_only_query_failures_are_transient() {
        let failed = Error::query_failed("list_accounts", EngineError::transport("timeout"));
        assert!(failed.is_transient());
        assert!(failed.to_string().contains("list_accounts"));

        assert!(!Error::SessionNotOpen.is_transient());
        assert!(!Error::lifecycle("double release").is_transient());
        assert!(!Error::malformed("missing currency").is_transient());
    }
}
