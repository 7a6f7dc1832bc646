//! Warehouse error types
//!
//! Defines all errors that can occur while talking to the data warehouse.

use thiserror::Error;

/// Errors that can occur in the warehouse client
#[derive(Error, Debug)]
pub enum WarehouseError {
    /// Could not open a session (missing credentials, login rejected, host unreachable)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The warehouse rejected or failed to run a statement
    #[error("Query error: {0}")]
    Query(String),

    /// A returned row could not be converted into the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SQLite backend failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<serde_json::Error> for WarehouseError {
    fn from(err: serde_json::Error) -> Self {
        WarehouseError::Decode(err.to_string())
    }
}

/// Result type alias for warehouse operations
pub type WarehouseResult<T> = Result<T, WarehouseError>;
