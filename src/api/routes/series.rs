//! Series Routes
//!
//! - GET /api/v1/series?country=&start=&end=&format=json|csv - Filtered rows
//!
//! Same defaults and clamping as the dashboard endpoint. CSV leaves absent
//! values as empty fields.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{SeriesParams, SeriesResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::dashboard::SeriesRow;

/// GET /api/v1/series
pub async fn get_series(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SeriesParams>,
) -> ApiResult<Response> {
    let format = params.format.to_lowercase();
    if format != "json" && format != "csv" {
        return Err(ApiError::Validation(format!(
            "Unsupported format '{}', expected json or csv",
            params.format
        )));
    }

    let request = params.selection.into_request()?;
    let selection = state.dashboard.select(&request).await?;

    tracing::debug!(
        country = %selection.country,
        rows = selection.table.len(),
        format = %format,
        "Exporting series"
    );

    if format == "csv" {
        let body = format_csv(&selection.table.rows)?;
        let filename = format!("{}.csv", file_stem(&selection.country));

        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            Body::from(body),
        )
            .into_response());
    }

    Ok(Json(SeriesResponse {
        country: selection.country,
        range: selection.range,
        rows: selection.table.rows,
    })
    .into_response())
}

/// Rows as CSV with a `date,new_cases,total_deaths,people_fully_vaccinated` header
pub fn format_csv(rows: &[SeriesRow]) -> ApiResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if rows.is_empty() {
        writer
            .write_record(["date", "new_cases", "total_deaths", "people_fully_vaccinated"])
            .map_err(|e| ApiError::Internal(format!("CSV error: {}", e)))?;
    }
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| ApiError::Internal(format!("CSV error: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV error: {}", e)))
}

fn file_stem(country: &str) -> String {
    country
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
