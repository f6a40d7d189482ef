//! Error types for patient record access.

use chrono::NaiveDate;
use std::io;
use thiserror::Error;

/// Result type alias for patient record operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`].
///
/// Callers usually only need to know whether the input was rejected, the
/// connection failed, or the database refused a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, detected before any statement was sent.
    Validation,
    /// Missing or malformed configuration.
    Config,
    /// Connection open/close failure or connection lost mid-query.
    Connection,
    /// The database rejected or failed a statement.
    Query,
    /// Local I/O or serialization failure.
    Io,
}

/// Error type for patient record operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Patient identifier is not a 10-digit code.
    #[error("Invalid patient identifier {value:?}: {reason}")]
    InvalidPatientId { value: String, reason: &'static str },

    /// Date string is not `YYYY-MM-DD`.
    #[error("Invalid date {value:?}: expected YYYY-MM-DD")]
    InvalidDate { value: String },

    /// Start of a date range is after its end.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Name search input rejected.
    #[error("Invalid search: {message}")]
    InvalidSearch { message: String },

    /// Invalid connect string.
    #[error("Invalid connect string: {message}")]
    InvalidConnectString { message: String },

    /// Required configuration key not present.
    #[error("Missing configuration value: {key}")]
    MissingConfig { key: &'static str },

    /// Configuration key present but unusable.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfigValue { key: &'static str, message: String },

    /// Configuration file could not be read or parsed.
    #[error("Configuration file error: {0}")]
    EnvFile(#[from] dotenvy::Error),

    /// Opening the connection failed.
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Connection dropped while a statement was running.
    #[error("Connection lost: {message}")]
    ConnectionLost { message: String },

    /// Statement issued without an open connection.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Statement failed on the server.
    #[error("Query on {table} failed: {message}")]
    Query {
        table: String,
        sql: String,
        message: String,
    },

    /// I/O error while exporting.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid patient identifier error.
    pub fn invalid_patient_id(value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPatientId {
            value: value.into(),
            reason,
        }
    }

    /// Create an invalid search error.
    pub fn invalid_search(message: impl Into<String>) -> Self {
        Self::InvalidSearch {
            message: message.into(),
        }
    }

    /// Create a connection failure error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Create a connection lost error.
    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self::ConnectionLost {
            message: message.into(),
        }
    }

    /// Create a query error for a statement against `table`.
    pub fn query(table: impl Into<String>, sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            table: table.into(),
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidPatientId { .. }
            | Error::InvalidDate { .. }
            | Error::InvalidDateRange { .. }
            | Error::InvalidSearch { .. } => ErrorKind::Validation,
            Error::InvalidConnectString { .. }
            | Error::MissingConfig { .. }
            | Error::InvalidConfigValue { .. }
            | Error::EnvFile(_) => ErrorKind::Config,
            Error::ConnectionFailed { .. } | Error::ConnectionLost { .. } | Error::ConnectionClosed => {
                ErrorKind::Connection
            }
            Error::Query { .. } => ErrorKind::Query,
            Error::Io(_) | Error::Json(_) => ErrorKind::Io,
        }
    }

    /// True for input rejected before any statement ran.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// True for connection-level failures.
    pub fn is_connection(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }

    /// True for statement failures reported by the database.
    pub fn is_query(&self) -> bool {
        self.kind() == ErrorKind::Query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(Error::invalid_patient_id("12", "must be 10 digits").is_validation());
        assert!(Error::connection("refused").is_connection());
        assert!(Error::ConnectionClosed.is_connection());
        assert!(Error::query("TTPT01", "SELECT 1 FROM DUAL", "ORA-00942").is_query());
        assert_eq!(
            Error::MissingConfig { key: "RAPPORT_DB_DSN" }.kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn test_query_error_display_names_table() {
        let err = Error::query("TTBY01", "SELECT F001 FROM TTBY01", "ORA-00904: invalid identifier");
        assert_eq!(
            err.to_string(),
            "Query on TTBY01 failed: ORA-00904: invalid identifier"
        );
    }
}
