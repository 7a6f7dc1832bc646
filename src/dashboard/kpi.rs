//! KPI Aggregator
//!
//! Three independent summary statistics over a filtered table:
//!
//! - total new cases: sum, absent values contribute nothing
//! - max total deaths: absent values excluded, `None` when all are absent
//! - vaccination ratio: max people fully vaccinated / total new cases × 100
//!
//! The ratio divides a vaccination count by a case count; it is not a share
//! of the population and can exceed 100.
//! The ratio is `None` when it is undefined or when the case total is not
//! positive (revisions can make it negative); nothing else is suppressed.

use serde::Serialize;

use super::types::{SeriesField, SeriesRow, SeriesTable};

/// Display text for an undefined metric
pub const NOT_AVAILABLE: &str = "N/A";

/// Sum of `new_cases`, absent values counted as zero
pub fn total_new_cases(rows: &[SeriesRow]) -> i64 {
    rows.iter().filter_map(|r| r.new_cases).sum()
}

/// Maximum of `total_deaths` over present values
pub fn max_total_deaths(rows: &[SeriesRow]) -> Option<i64> {
    max_of(rows, SeriesField::TotalDeaths)
}

/// Maximum of `people_fully_vaccinated` over present values
pub fn max_people_fully_vaccinated(rows: &[SeriesRow]) -> Option<i64> {
    max_of(rows, SeriesField::PeopleFullyVaccinated)
}

fn max_of(rows: &[SeriesRow], field: SeriesField) -> Option<i64> {
    rows.iter().filter_map(|r| r.get(field)).max()
}

/// `max_vaccinated / total_new_cases * 100`, or `None` when undefined or
/// when the total is not positive
pub fn ratio_percent(max_vaccinated: Option<i64>, total_new_cases: i64) -> Option<f64> {
    if total_new_cases <= 0 {
        return None;
    }
    let ratio = max_vaccinated? as f64 / total_new_cases as f64 * 100.0;
    ratio.is_finite().then_some(ratio)
}

/// Vaccination ratio of a filtered table
pub fn vaccination_ratio(rows: &[SeriesRow]) -> Option<f64> {
    ratio_percent(max_people_fully_vaccinated(rows), total_new_cases(rows))
}

/// The three dashboard KPIs for one filtered table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_new_cases: i64,
    pub max_total_deaths: Option<i64>,
    pub vaccination_ratio: Option<f64>,
}

impl KpiSummary {
    pub fn compute(table: &SeriesTable) -> Self {
        Self::from_rows(&table.rows)
    }

    pub fn from_rows(rows: &[SeriesRow]) -> Self {
        Self {
            total_new_cases: total_new_cases(rows),
            max_total_deaths: max_total_deaths(rows),
            vaccination_ratio: vaccination_ratio(rows),
        }
    }

    /// Display strings in dashboard order
    pub fn display(&self) -> KpiDisplay {
        KpiDisplay {
            total_new_cases: format_count(self.total_new_cases),
            max_total_deaths: self
                .max_total_deaths
                .map(format_count)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            vaccination_ratio: self
                .vaccination_ratio
                .map(format_percent)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }
}

/// KPI values formatted for the metric tiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KpiDisplay {
    pub total_new_cases: String,
    pub max_total_deaths: String,
    pub vaccination_ratio: String,
}

/// Integer with thousands separators: `1234567` → `1,234,567`
pub fn format_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Percentage with two decimals: `16.666…` → `16.67%`
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}
