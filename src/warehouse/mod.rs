//! Warehouse Client
//!
//! The one seam between the dashboard and the data warehouse. Everything
//! upstream sees only [`Warehouse::query`]: run a parameterized statement,
//! get back column names and rows.
//!
//! - **types**: `Value` cells and `RowSet` results
//! - **snowflake**: production backend over Snowflake's REST session API
//! - **sqlite**: local backend over a SQLite file
//! - **error**: Error types
//!
//! A single handle is opened at startup and shared as `Arc<dyn Warehouse>`
//! for the lifetime of the process.

pub mod error;
pub mod snowflake;
pub mod sqlite;
pub mod types;

pub use error::{WarehouseError, WarehouseResult};
pub use snowflake::{SnowflakeCredentials, SnowflakeWarehouse};
pub use sqlite::SqliteWarehouse;
pub use types::{RowSet, Value};

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::config::{WarehouseBackend, WarehouseConfig};

/// Read-only query interface to a tabular data warehouse
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Short human-readable identity (backend + target), for logs and health
    fn name(&self) -> &str;

    /// Run one statement with positional parameters
    async fn query(&self, sql: &str, params: &[Value]) -> WarehouseResult<RowSet>;
}

/// Open the configured backend.
///
/// Fails with [`WarehouseError::Connection`] when a required setting is
/// absent or the warehouse refuses the session; callers treat that as fatal.
pub async fn connect_from_config(config: &WarehouseConfig) -> WarehouseResult<Arc<dyn Warehouse>> {
    match config.backend {
        WarehouseBackend::Snowflake => {
            let wh = SnowflakeWarehouse::connect(config).await?;
            Ok(Arc::new(wh))
        }
        WarehouseBackend::Sqlite => {
            let path = config.database.as_deref().ok_or_else(|| {
                WarehouseError::Connection("SNOWFLAKE_DATABASE is not set".to_string())
            })?;
            let wh = SqliteWarehouse::open(Path::new(path))?;
            Ok(Arc::new(wh))
        }
    }
}
