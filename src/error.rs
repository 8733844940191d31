//! Error types for query-gate.
//!
//! Defines the main error enum used throughout the application. The display
//! text of each variant is what clients see, so it follows the status
//! taxonomy of the HTTP interface.

use std::time::Duration;

use thiserror::Error;

use crate::pool::PoolError;
use crate::safety::Rejection;

/// Main error type for query-gate operations.
#[derive(Error, Debug)]
pub enum GateError {
    /// The caller submitted no SQL at all.
    #[error("no query provided")]
    EmptyQuery,

    /// The classification gate refused the query.
    #[error("{0}")]
    Rejected(Rejection),

    /// Caller input that is malformed rather than unsafe (bad identifiers, bad file names).
    #[error("{0}")]
    Validation(String),

    /// No connection could be obtained from the pool.
    #[error("error: {0}")]
    Pool(#[from] PoolError),

    /// The database engine rejected or failed an already-gated statement.
    #[error("SQL error: {0}")]
    Database(String),

    /// The statement did not finish within the configured budget.
    #[error("error: query timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Replacing the backing database from a script failed.
    #[error("Failed to load SQL: {0}")]
    Load(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (I/O, unexpected states, bugs, etc.)
    #[error("error: {0}")]
    Internal(String),
}

impl GateError {
    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a database error with the given message.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Creates a load error with the given message.
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::EmptyQuery | Self::Rejected(_) | Self::Validation(_) => "Validation Error",
            Self::Pool(_) => "Pool Error",
            Self::Database(_) => "Database Error",
            Self::Timeout(_) => "Timeout",
            Self::Load(_) => "Load Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true if the caller's input caused the failure.
    ///
    /// Client errors are never worth retrying; everything else except
    /// database errors is an infrastructure problem that may clear up.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyQuery | Self::Rejected(_) | Self::Validation(_) | Self::Database(_)
        )
    }

    /// Returns true if retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Pool(_) | Self::Timeout(_))
    }
}

impl From<std::io::Error> for GateError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

/// Result type alias using GateError.
pub type Result<T> = std::result::Result<T, GateError>;
