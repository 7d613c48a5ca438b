//! Persistence error type.

use derive_more::{Display, Error};

/// Error raised by the persistence layer, with call-site capture.
#[derive(Debug, Clone, Display, Error)]
#[display("database error: {} at {}:{}", message, file, line)]
pub struct DbError {
    /// Human-readable description of the failure.
    pub message: String,
    /// Line of the call site that produced the error.
    pub line: u32,
    /// Source file of the call site.
    pub file: &'static str,
}

impl DbError {
    /// Creates a new error, recording the caller's location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::new(format!("query failed: {err}"))
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(format!("connection failed: {err}"))
    }
}
