//! Chart Renderer
//!
//! Builds one line-chart specification per plotted metric. A spec is plain
//! data (kind, labels, points); drawing it is the browser's job.

use chrono::NaiveDate;
use serde::Serialize;

use super::types::{SeriesField, SeriesTable};

/// X axis column and label shared by every chart
pub const X_COLUMN: &str = "date";
pub const X_LABEL: &str = "Date";

/// One plotted point; absent values stay `null` so the chart shows a gap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Axis {
    pub column: &'static str,
    pub label: &'static str,
}

/// Line chart specification for one metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSpec {
    pub kind: &'static str,
    pub field: SeriesField,
    pub title: String,
    pub x: Axis,
    pub y: Axis,
    pub points: Vec<ChartPoint>,
}

impl ChartSpec {
    pub fn line(country: &str, field: SeriesField, table: &SeriesTable) -> Self {
        Self {
            kind: "line",
            field,
            title: chart_title(field, country),
            x: Axis {
                column: X_COLUMN,
                label: X_LABEL,
            },
            y: Axis {
                column: field.column(),
                label: field.label(),
            },
            points: table
                .rows
                .iter()
                .map(|row| ChartPoint {
                    date: row.date,
                    value: row.get(field),
                })
                .collect(),
        }
    }
}

/// Heading shown above each chart
pub fn chart_title(field: SeriesField, country: &str) -> String {
    match field {
        SeriesField::NewCases => format!("New Cases in {}", country),
        SeriesField::TotalDeaths => format!("Total Deaths in {}", country),
        SeriesField::PeopleFullyVaccinated => format!("Vaccinations in {}", country),
    }
}

/// New cases, total deaths and fully vaccinated charts, in that order
pub fn render_charts(country: &str, table: &SeriesTable) -> [ChartSpec; 3] {
    [
        ChartSpec::line(country, SeriesField::NewCases, table),
        ChartSpec::line(country, SeriesField::TotalDeaths, table),
        ChartSpec::line(country, SeriesField::PeopleFullyVaccinated, table),
    ]
}
