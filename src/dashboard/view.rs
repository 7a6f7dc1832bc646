//! Presentation Shell: the per-interaction dashboard pass
//!
//! A [`Dashboard`] owns the injected warehouse handle and the memo cache.
//! Every call to [`Dashboard::render`] is a full top-to-bottom recomputation
//! (load, filter, aggregate, chart); only the warehouse reads are memoized.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::catalog::CountryCatalog;
use super::chart::{render_charts, ChartSpec};
use super::error::{DashboardError, DashboardResult};
use super::filter::filter_range;
use super::kpi::{KpiDisplay, KpiSummary};
use super::series::SeriesLoader;
use super::types::{DateRange, SeriesTable};
use crate::cache::{CacheStats, MemoCache};
use crate::warehouse::Warehouse;

/// Page heading
pub const TITLE: &str = "Global COVID-19 Dashboard";

/// User selection for one pass. Absent fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DashboardRequest {
    pub country: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DashboardRequest {
    pub fn country(country: impl Into<String>) -> Self {
        Self {
            country: Some(country.into()),
            ..Default::default()
        }
    }

    /// Builder method: set the date bounds
    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}

/// A resolved selection and its filtered rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub country: String,
    /// Full date span of the country's table; `None` when it has no rows
    pub span: Option<DateRange>,
    /// Effective range after defaulting and clamping
    pub range: Option<DateRange>,
    pub table: SeriesTable,
}

/// Everything the page shows after one pass
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub title: &'static str,
    pub country: String,
    pub countries: Vec<String>,
    pub span: Option<DateRange>,
    pub range: Option<DateRange>,
    pub kpis: KpiSummary,
    pub display: KpiDisplay,
    pub charts: [ChartSpec; 3],
    pub row_count: usize,
}

/// Dashboard context shared by every request in the process
pub struct Dashboard {
    warehouse: Arc<dyn Warehouse>,
    cache: Arc<MemoCache>,
    catalog: CountryCatalog,
    loader: SeriesLoader,
}

impl Dashboard {
    pub fn new(warehouse: Arc<dyn Warehouse>, table: impl Into<String>) -> Self {
        Self::with_cache(warehouse, Arc::new(MemoCache::new()), table)
    }

    pub fn with_cache(
        warehouse: Arc<dyn Warehouse>,
        cache: Arc<MemoCache>,
        table: impl Into<String>,
    ) -> Self {
        let table = table.into();
        Self {
            catalog: CountryCatalog::new(warehouse.clone(), cache.clone(), table.clone()),
            loader: SeriesLoader::new(warehouse.clone(), cache.clone(), table),
            warehouse,
            cache,
        }
    }

    /// Warehouse identity, for health reporting
    pub fn backend(&self) -> &str {
        self.warehouse.name()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn countries(&self) -> DashboardResult<Arc<Vec<String>>> {
        self.catalog.load().await
    }

    /// Full table for a catalog country
    pub async fn series(&self, country: &str) -> DashboardResult<Arc<SeriesTable>> {
        let countries = self.countries().await?;
        if !countries.iter().any(|c| c == country) {
            return Err(DashboardError::UnknownCountry(country.to_string()));
        }
        self.loader.load(country).await
    }

    /// Resolve defaults, validate and filter.
    ///
    /// The country defaults to the first catalog entry. Date bounds default
    /// to the loaded table's span, so they follow the country rather than
    /// any earlier selection. Supplied bounds are clamped into the span.
    pub async fn select(&self, request: &DashboardRequest) -> DashboardResult<Selection> {
        if let (Some(start), Some(end)) = (request.start, request.end) {
            if start > end {
                return Err(DashboardError::InvalidDateRange { start, end });
            }
        }

        let countries = self.countries().await?;
        let country = match &request.country {
            Some(country) => country.clone(),
            None => countries.first().cloned().ok_or(DashboardError::EmptyCatalog)?,
        };

        let full = self.series(&country).await?;
        let span = full.span();

        let range = span.map(|span| {
            DateRange {
                start: request.start.unwrap_or(span.start),
                end: request.end.unwrap_or(span.end),
            }
            .clamp_to(&span)
        });

        let table = match range {
            Some(range) => filter_range(&full, range),
            None => SeriesTable::empty(country.clone()),
        };

        Ok(Selection {
            country,
            span,
            range,
            table,
        })
    }

    /// One dashboard pass
    pub async fn render(&self, request: &DashboardRequest) -> DashboardResult<DashboardView> {
        let selection = self.select(request).await?;
        let countries = self.countries().await?;

        let kpis = KpiSummary::compute(&selection.table);
        let charts = render_charts(&selection.country, &selection.table);

        tracing::debug!(
            country = %selection.country,
            range = ?selection.range,
            rows = selection.table.len(),
            "Rendered dashboard"
        );

        Ok(DashboardView {
            title: TITLE,
            countries: countries.as_ref().clone(),
            span: selection.span,
            range: selection.range,
            display: kpis.display(),
            kpis,
            charts,
            row_count: selection.table.len(),
            country: selection.country,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::testing::{d, fixture_warehouse, CountingWarehouse, FailingWarehouse};

    fn dashboard() -> (Dashboard, Arc<CountingWarehouse>) {
        let wh = Arc::new(CountingWarehouse::new(fixture_warehouse()));
        (Dashboard::new(wh.clone(), "owid_covid2"), wh)
    }

    #[tokio::test]
    async fn test_defaults_to_first_country_and_full_span() {
        let (dash, _) = dashboard();
        let view = dash.render(&DashboardRequest::default()).await.unwrap();

        assert_eq!(view.title, "Global COVID-19 Dashboard");
        assert_eq!(view.country, "Chad");
        assert_eq!(view.countries, vec!["Chad", "France"]);
        assert_eq!(view.range, view.span);
        assert!(view.row_count > 0);
    }

    #[tokio::test]
    async fn test_full_range_kpis() {
        let (dash, _) = dashboard();
        let view = dash.render(&DashboardRequest::country("France")).await.unwrap();

        assert_eq!(
            view.range,
            Some(DateRange::new(d(2021, 1, 1), d(2021, 1, 2)).unwrap())
        );
        assert_eq!(view.kpis.total_new_cases, 30);
        assert_eq!(view.kpis.max_total_deaths, Some(2));
        assert_eq!(view.display.vaccination_ratio, "16.67%");
        assert_eq!(view.charts[0].title, "New Cases in France");
        assert_eq!(view.charts[0].points.len(), 2);
    }

    #[tokio::test]
    async fn test_narrowed_range_kpis() {
        let (dash, _) = dashboard();
        let request = DashboardRequest::country("France").between(d(2021, 1, 1), d(2021, 1, 1));
        let view = dash.render(&request).await.unwrap();

        assert_eq!(view.row_count, 1);
        assert_eq!(view.kpis.total_new_cases, 10);
        assert_eq!(view.kpis.max_total_deaths, Some(1));
        assert_eq!(view.kpis.vaccination_ratio, None);
        assert_eq!(view.display.vaccination_ratio, "N/A");
    }

    #[tokio::test]
    async fn test_bounds_are_clamped_to_span() {
        let (dash, _) = dashboard();
        let request = DashboardRequest::country("France").between(d(2020, 1, 1), d(2030, 1, 1));
        let view = dash.render(&request).await.unwrap();

        assert_eq!(view.range, view.span);
        assert_eq!(view.row_count, 2);
    }

    #[tokio::test]
    async fn test_start_after_end_is_rejected() {
        let (dash, wh) = dashboard();
        let request = DashboardRequest::country("France").between(d(2021, 1, 2), d(2021, 1, 1));

        let err = dash.render(&request).await.unwrap_err();
        assert!(matches!(err, DashboardError::InvalidDateRange { .. }));
        assert_eq!(wh.queries(), 0);
    }

    #[tokio::test]
    async fn test_unknown_country() {
        let (dash, _) = dashboard();
        let err = dash
            .render(&DashboardRequest::country("Atlantis"))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::UnknownCountry(c) if c == "Atlantis"));
    }

    #[tokio::test]
    async fn test_repeat_passes_are_memoized() {
        let (dash, wh) = dashboard();
        let request = DashboardRequest::country("France");

        dash.render(&request).await.unwrap();
        dash.render(&request).await.unwrap();
        dash.render(&request.clone().between(d(2021, 1, 2), d(2021, 1, 2)))
            .await
            .unwrap();

        // catalog + France series
        assert_eq!(wh.queries(), 2);

        let stats = dash.cache_stats().await;
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.misses, 2);
    }

    #[tokio::test]
    async fn test_concurrent_passes_share_queries() {
        let (dash, wh) = dashboard();
        let request = DashboardRequest::country("France");

        let (a, b) = tokio::join!(dash.render(&request), dash.render(&request));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.kpis, b.kpis);
        assert_eq!(a.row_count, 2);
        assert_eq!(b.row_count, 2);

        // catalog + France series
        assert_eq!(wh.queries(), 2);
    }

    #[tokio::test]
    async fn test_range_follows_country_change() {
        let (dash, _) = dashboard();
        let france = dash.render(&DashboardRequest::country("France")).await.unwrap();
        let chad = dash.render(&DashboardRequest::country("Chad")).await.unwrap();

        assert_ne!(france.span, chad.span);
        assert_eq!(chad.range, chad.span);
    }

    #[tokio::test]
    async fn test_warehouse_failure_propagates() {
        let dash = Dashboard::new(Arc::new(FailingWarehouse), "owid_covid2");
        let err = dash.render(&DashboardRequest::default()).await.unwrap_err();
        assert!(matches!(err, DashboardError::Warehouse(_)));
    }
}
