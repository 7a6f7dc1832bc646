//! Dashboard error types

use thiserror::Error;

use crate::warehouse::WarehouseError;

/// Errors that can occur during a dashboard pass
#[derive(Error, Debug)]
pub enum DashboardError {
    /// The warehouse query failed; never replaced by partial data
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    /// Requested country is not in the catalog
    #[error("Unknown country: {0}")]
    UnknownCountry(String),

    /// The catalog has no entries, so there is no default selection
    #[error("Country catalog is empty")]
    EmptyCatalog,

    /// Start date after end date
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}

/// Result type alias for dashboard operations
pub type DashboardResult<T> = Result<T, DashboardError>;
