//! Dashboard Routes
//!
//! - GET /api/v1/dashboard?country=&start=&end= - One full dashboard pass
//!
//! Every request recomputes filter, KPIs and charts; only the warehouse
//! reads behind them are memoized.

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::SelectionParams;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::dashboard::DashboardView;

/// GET /api/v1/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SelectionParams>,
) -> ApiResult<Json<DashboardView>> {
    let request = params.into_request()?;
    let view = state.dashboard.render(&request).await?;
    Ok(Json(view))
}
