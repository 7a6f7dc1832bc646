//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::cache::CacheStats;
use crate::dashboard::{DashboardRequest, DateRange, SeriesRow};

// ============================================
// SELECTION DTOs
// ============================================

/// Query string shared by `/dashboard` and `/series`
///
/// Dates stay strings here so a bad value becomes a validation error with
/// our own body instead of the extractor's plain-text rejection. Empty
/// values (a cleared form field) count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionParams {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

impl SelectionParams {
    pub fn into_request(self) -> ApiResult<DashboardRequest> {
        Ok(DashboardRequest {
            country: self.country.filter(|c| !c.is_empty()),
            start: parse_date("start", self.start.as_deref())?,
            end: parse_date("end", self.end.as_deref())?,
        })
    }
}

fn parse_date(name: &str, value: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Some).map_err(|_| {
            ApiError::Validation(format!("{} must be a YYYY-MM-DD date, got '{}'", name, s))
        }),
    }
}

/// `/series` query string
#[derive(Debug, Deserialize)]
pub struct SeriesParams {
    #[serde(flatten)]
    pub selection: SelectionParams,
    /// Output format: json, csv
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "json".to_string()
}

// ============================================
// RESPONSE DTOs
// ============================================

/// Country catalog response
#[derive(Debug, Serialize, Deserialize)]
pub struct CountriesResponse {
    pub countries: Vec<String>,
    pub count: usize,
}

/// Filtered series response
#[derive(Debug, Serialize, Deserialize)]
pub struct SeriesResponse {
    pub country: String,
    pub range: Option<DateRange>,
    pub rows: Vec<SeriesRow>,
}

/// Full health status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: healthy, unhealthy
    pub status: String,
    /// Warehouse identity
    pub backend: String,
    /// Warehouse status: ok, error
    pub warehouse: String,
    pub cache: CacheStatsDto,
    pub uptime_seconds: u64,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStatsDto {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl From<CacheStats> for CacheStatsDto {
    fn from(stats: CacheStats) -> Self {
        Self {
            entries: stats.entries,
            hits: stats.hits,
            misses: stats.misses,
        }
    }
}
