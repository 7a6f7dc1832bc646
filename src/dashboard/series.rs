//! Series Loader
//!
//! One country's date-indexed metrics, ascending by date. The query binds the
//! country as a parameter and matches it exactly. Each distinct country is
//! queried once per process run and memoized.

use std::sync::Arc;

use super::error::DashboardResult;
use super::types::{SeriesRow, SeriesTable};
use crate::cache::{CacheKey, MemoCache};
use crate::warehouse::{RowSet, Value, Warehouse, WarehouseError, WarehouseResult};

const OPERATION: &str = "series";

static NULL: Value = Value::Null;

/// Loads and memoizes per-country series tables
#[derive(Clone)]
pub struct SeriesLoader {
    warehouse: Arc<dyn Warehouse>,
    cache: Arc<MemoCache>,
    table: String,
}

impl SeriesLoader {
    pub fn new(warehouse: Arc<dyn Warehouse>, cache: Arc<MemoCache>, table: impl Into<String>) -> Self {
        Self {
            warehouse,
            cache,
            table: table.into(),
        }
    }

    pub fn sql(&self) -> String {
        format!(
            "SELECT date, new_cases, total_deaths, people_fully_vaccinated \
             FROM {} WHERE location = ? ORDER BY date",
            self.table
        )
    }

    /// Load one country's table.
    ///
    /// A country with no rows yields an empty table, not an error. The
    /// caller is expected to pass a catalog member.
    pub async fn load(&self, country: &str) -> DashboardResult<Arc<SeriesTable>> {
        self.cache
            .get_or_try_insert_with(CacheKey::new(OPERATION, &[country]), || {
                self.fetch(country)
            })
            .await
    }

    async fn fetch(&self, country: &str) -> DashboardResult<SeriesTable> {
        let set = self
            .warehouse
            .query(&self.sql(), &[Value::from(country)])
            .await?;

        let table = SeriesTable::new(country, decode_rows(&set)?);

        tracing::debug!(
            country = %country,
            rows = table.len(),
            span = ?table.span(),
            "Loaded series"
        );

        Ok(table)
    }
}

/// Convert warehouse rows into `SeriesRow`s, locating columns by name
pub fn decode_rows(set: &RowSet) -> WarehouseResult<Vec<SeriesRow>> {
    let column = |name: &str| {
        set.column_index(name)
            .ok_or_else(|| WarehouseError::Decode(format!("missing column {}", name)))
    };

    let date_idx = column("date")?;
    let cases_idx = column("new_cases")?;
    let deaths_idx = column("total_deaths")?;
    let vax_idx = column("people_fully_vaccinated")?;

    set.rows
        .iter()
        .map(|row| -> WarehouseResult<SeriesRow> {
            let cell = |idx: usize| row.get(idx).unwrap_or(&NULL);

            let date = cell(date_idx).as_date().ok_or_else(|| {
                WarehouseError::Decode(format!("invalid date {:?}", cell(date_idx)))
            })?;

            Ok(SeriesRow {
                date,
                new_cases: count(cell(cases_idx), "new_cases")?,
                total_deaths: count(cell(deaths_idx), "total_deaths")?,
                people_fully_vaccinated: count(cell(vax_idx), "people_fully_vaccinated")?,
            })
        })
        .collect()
}

fn count(value: &Value, column: &str) -> WarehouseResult<Option<i64>> {
    if value.is_null() {
        return Ok(None);
    }
    value.as_i64().map(Some).ok_or_else(|| {
        WarehouseError::Decode(format!("invalid {} value {:?}", column, value))
    })
}
