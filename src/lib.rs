//! # Pandemic Dashboard
//!
//! Interactive per-country pandemic dashboard. Reads a daily per-country
//! table from a data warehouse, narrows it to a date range, and serves
//! three KPIs and three line charts over HTTP.
//!
//! ## Modules
//!
//! - [`config`]: Settings from `.env`, a TOML file and the environment
//! - [`warehouse`]: Query interface with Snowflake and SQLite backends
//! - [`cache`]: Process-scoped memoization of warehouse reads
//! - [`dashboard`]: Catalog, series loading, range filter, KPIs, charts
//! - [`api`]: HTTP server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pandemic_dashboard::dashboard::{Dashboard, DashboardRequest};
//! use pandemic_dashboard::warehouse::SqliteWarehouse;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Arc::new(SqliteWarehouse::open(Path::new("owid.db"))?);
//!     let dashboard = Dashboard::new(warehouse, "owid_covid2");
//!
//!     let view = dashboard.render(&DashboardRequest::country("France")).await?;
//!     println!("Total new cases: {}", view.display.total_new_cases);
//!     println!("Max total deaths: {}", view.display.max_total_deaths);
//!     println!("% vaccinated: {}", view.display.vaccination_ratio);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod warehouse;

pub use config::Config;
pub use dashboard::{Dashboard, DashboardRequest, DashboardView};
pub use warehouse::{connect_from_config, Warehouse};
