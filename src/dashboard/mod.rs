//! Dashboard pipeline
//!
//! - **catalog**: distinct country names
//! - **series**: one country's ordered metrics
//! - **filter**: inclusive date-range narrowing
//! - **kpi**: summary statistics
//! - **chart**: line-chart specifications
//! - **view**: one full interaction pass
//! - **types**: Core data types
//! - **error**: Error types

pub mod catalog;
pub mod chart;
pub mod error;
pub mod filter;
pub mod kpi;
pub mod series;
pub mod types;
pub mod view;

pub use catalog::CountryCatalog;
pub use chart::{render_charts, ChartPoint, ChartSpec};
pub use error::{DashboardError, DashboardResult};
pub use filter::filter_range;
pub use kpi::{KpiDisplay, KpiSummary};
pub use series::SeriesLoader;
pub use types::{DateRange, SeriesField, SeriesRow, SeriesTable};
pub use view::{Dashboard, DashboardRequest, DashboardView, Selection};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::types::{SeriesRow, SeriesTable};
    use crate::warehouse::{RowSet, SqliteWarehouse, Value, Warehouse, WarehouseError, WarehouseResult};

    pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    pub const FIXTURE_SQL: &str = "
        CREATE TABLE owid_covid2 (
            location TEXT,
            date TEXT NOT NULL,
            new_cases INTEGER,
            total_deaths INTEGER,
            people_fully_vaccinated INTEGER
        );
        INSERT INTO owid_covid2 VALUES ('France', '2021-01-02', 20, 2, 5);
        INSERT INTO owid_covid2 VALUES ('France', '2021-01-01', 10, 1, NULL);
        INSERT INTO owid_covid2 VALUES ('Chad', '2021-02-01', 3, NULL, NULL);
        INSERT INTO owid_covid2 VALUES ('Chad', '2021-02-02', 4, 1, NULL);
        INSERT INTO owid_covid2 VALUES ('Chad', '2021-02-03', NULL, 1, 2);
        INSERT INTO owid_covid2 VALUES (NULL, '2021-01-01', 99, 99, 99);
    ";

    /// In-memory warehouse: France holds the two-row reference table
    pub fn fixture_warehouse() -> SqliteWarehouse {
        let wh = SqliteWarehouse::in_memory().unwrap();
        wh.execute_batch(FIXTURE_SQL).unwrap();
        wh
    }

    /// The France rows of the fixture, already loaded
    pub fn scenario_table() -> SeriesTable {
        SeriesTable::new(
            "France",
            vec![
                SeriesRow::new(d(2021, 1, 1)).new_cases(10).total_deaths(1),
                SeriesRow::new(d(2021, 1, 2))
                    .new_cases(20)
                    .total_deaths(2)
                    .people_fully_vaccinated(5),
            ],
        )
    }

    /// Delegates to SQLite and counts issued queries
    pub struct CountingWarehouse {
        inner: SqliteWarehouse,
        queries: AtomicUsize,
    }

    impl CountingWarehouse {
        pub fn new(inner: SqliteWarehouse) -> Self {
            Self {
                inner,
                queries: AtomicUsize::new(0),
            }
        }

        pub fn queries(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Warehouse for CountingWarehouse {
        fn name(&self) -> &str {
            self.inner.name()
        }

        async fn query(&self, sql: &str, params: &[Value]) -> WarehouseResult<RowSet> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.inner.query(sql, params).await
        }
    }

    /// Every query fails
    pub struct FailingWarehouse;

    #[async_trait]
    impl Warehouse for FailingWarehouse {
        fn name(&self) -> &str {
            "failing"
        }

        async fn query(&self, _sql: &str, _params: &[Value]) -> WarehouseResult<RowSet> {
            Err(WarehouseError::Query("warehouse unavailable".to_string()))
        }
    }
}
