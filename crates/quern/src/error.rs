//! Error types for quern

use thiserror::Error;

/// Result type alias for quern operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for database operations.
///
/// Every native driver failure is normalized into [`DbError::Connection`] or
/// [`DbError::Query`] at the driver boundary; callers never handle
/// driver-library error types. Builder and parameter misuse are distinct
/// kinds so callers can tell "I used the API wrong" from "the database
/// rejected my statement".
#[derive(Debug, Error)]
pub enum DbError {
    /// Missing or invalid instance configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Native connect failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Native execution failure, with the offending SQL
    #[error("Query error: {message} in statement [ {sql} ]")]
    Query { message: String, sql: String },

    /// Invalid fluent builder usage
    #[error("Builder error: {0}")]
    Builder(String),

    /// Invalid parameter key or unbindable parameter value
    #[error("Parameter error: {0}")]
    Parameter(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl DbError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a query error carrying the offending SQL
    pub fn query(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: sql.into(),
        }
    }

    /// Create a builder error
    pub fn builder(message: impl Into<String>) -> Self {
        Self::Builder(message.into())
    }

    /// Create a parameter error
    pub fn parameter(message: impl Into<String>) -> Self {
        Self::Parameter(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Check if this is a builder usage error
    pub fn is_builder(&self) -> bool {
        matches!(self, Self::Builder(_))
    }

    /// Check if this is a normalized database (query) error
    pub fn is_query(&self) -> bool {
        matches!(self, Self::Query { .. })
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// The SQL text attached to a query error, if any
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Query { sql, .. } => Some(sql),
            _ => None,
        }
    }
}
