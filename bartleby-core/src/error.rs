//! Error types for Bartleby

use thiserror::Error;

/// A failure reported by the underlying database driver.
///
/// Drivers convert their native error types into this uniform signal so the
/// execution adapter can treat every backend the same way.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The main error type for Bartleby operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database driver failure surfaced through the Connection capability
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// The leading SQL verb is not in the recognized statement set
    #[error("Unrecognized statement type for query: {sql}")]
    QueryType { sql: String },

    /// Invalid query configuration
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience Result type for Bartleby operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create a new unrecognized-statement error
    pub fn query_type(sql: impl Into<String>) -> Self {
        Self::QueryType { sql: sql.into() }
    }
}
