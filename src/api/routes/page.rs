//! Page Route
//!
//! - GET / - The interactive dashboard page
//!
//! The page is static; it fetches `/api/v1/countries` once and
//! `/api/v1/dashboard` on every control change, then draws the returned
//! chart specifications with Plotly.

use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../../static/index.html");

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
