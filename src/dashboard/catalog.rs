//! Country Catalog
//!
//! Distinct location names in the source table, alphabetical. Loaded with
//! one query per process run; every later call is served from the memo cache.

use std::sync::Arc;

use super::error::DashboardResult;
use crate::cache::{CacheKey, MemoCache};
use crate::warehouse::{Value, Warehouse, WarehouseError};

const OPERATION: &str = "countries";

/// Loads and memoizes the list of selectable countries
#[derive(Clone)]
pub struct CountryCatalog {
    warehouse: Arc<dyn Warehouse>,
    cache: Arc<MemoCache>,
    table: String,
}

impl CountryCatalog {
    pub fn new(warehouse: Arc<dyn Warehouse>, cache: Arc<MemoCache>, table: impl Into<String>) -> Self {
        Self {
            warehouse,
            cache,
            table: table.into(),
        }
    }

    /// Statement issued on first load. `table` comes from trusted configuration.
    pub fn sql(&self) -> String {
        format!(
            "SELECT DISTINCT location FROM {} ORDER BY location",
            self.table
        )
    }

    /// Return the catalog, querying the warehouse only the first time.
    ///
    /// Query failures propagate; an empty or partial catalog is never
    /// substituted for an error.
    pub async fn load(&self) -> DashboardResult<Arc<Vec<String>>> {
        self.cache
            .get_or_try_insert_with(CacheKey::new(OPERATION, &[]), || self.fetch())
            .await
    }

    async fn fetch(&self) -> DashboardResult<Vec<String>> {
        let set = self.warehouse.query(&self.sql(), &[]).await?;

        if set.columns.is_empty() {
            return Err(
                WarehouseError::Decode("catalog query returned no columns".to_string()).into(),
            );
        }
        let idx = set.column_index("location").unwrap_or(0);

        // Null locations are not selectable
        let mut countries: Vec<String> = set
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().nth(idx))
            .filter_map(|value| match value {
                Value::Text(name) => Some(name),
                _ => None,
            })
            .collect();

        // Collation differs between warehouses; the contract is byte order
        countries.sort();
        countries.dedup();

        tracing::info!(
            countries = countries.len(),
            backend = self.warehouse.name(),
            "Loaded country catalog"
        );

        Ok(countries)
    }
}
