//! Country Routes
//!
//! - GET /api/v1/countries - Country catalog, alphabetical

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::CountriesResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/v1/countries
pub async fn list_countries(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CountriesResponse>> {
    let countries = state.dashboard.countries().await?;

    Ok(Json(CountriesResponse {
        count: countries.len(),
        countries: countries.as_ref().clone(),
    }))
}
