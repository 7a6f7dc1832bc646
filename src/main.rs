//! Pandemic Dashboard Server
//!
//! Run with: cargo run --bin pandemic-dashboard
//!
//! # Configuration
//!
//! Read from `.env`, then the config file, then environment variables:
//! - `SNOWFLAKE_USER`, `SNOWFLAKE_PASSWORD`, `SNOWFLAKE_ACCOUNT`,
//!   `SNOWFLAKE_WAREHOUSE`, `SNOWFLAKE_DATABASE`, `SNOWFLAKE_SCHEMA`
//! - `DASHBOARD_WAREHOUSE_BACKEND`: snowflake or sqlite (default: snowflake)
//! - `DASHBOARD_TABLE`: Source table (default: owid_covid2)
//! - `DASHBOARD_HOST`, `DASHBOARD_PORT`: Bind address (default: 0.0.0.0:8501)
//! - `DASHBOARD_LOG_LEVEL`, `DASHBOARD_LOG_FORMAT`: info / pretty by default
//! - `RUST_LOG`: Overrides the log filter

use pandemic_dashboard::api::{serve, AppState};
use pandemic_dashboard::config::{Config, LoggingConfig};
use pandemic_dashboard::dashboard::Dashboard;
use pandemic_dashboard::warehouse::{connect_from_config, Warehouse};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load_default()?;
    init_tracing(&config.logging);

    tracing::info!(
        "Starting Pandemic Dashboard v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!(
        backend = ?config.warehouse.backend,
        table = %config.warehouse.table,
        "Connecting to warehouse"
    );

    let warehouse = match connect_from_config(&config.warehouse).await {
        Ok(warehouse) => warehouse,
        Err(e) => {
            tracing::error!(error = %e, "Warehouse connection failed");
            return Err(e.into());
        }
    };
    tracing::info!(warehouse = warehouse.name(), "Warehouse connected");

    let dashboard = Arc::new(Dashboard::new(warehouse, config.warehouse.table.clone()));
    let api_config = config.api_config();
    let state = AppState::new(dashboard, api_config.clone());

    serve(state, &api_config).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("pandemic_dashboard={},tower_http=info", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
