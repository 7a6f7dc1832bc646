//! Core data types for the dashboard pipeline
//!
//! - `SeriesRow`: one country-day of metrics
//! - `SeriesTable`: one country's rows, ascending by date
//! - `DateRange`: inclusive date interval
//! - `SeriesField`: the three plotted/aggregated columns

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{DashboardError, DashboardResult};

/// One country-day's pandemic metrics record
///
/// Absent values stay `None`; they are never filled with zero here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub date: NaiveDate,
    pub new_cases: Option<i64>,
    /// Cumulative by source convention (not enforced)
    pub total_deaths: Option<i64>,
    /// Cumulative by source convention (not enforced)
    pub people_fully_vaccinated: Option<i64>,
}

impl SeriesRow {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            new_cases: None,
            total_deaths: None,
            people_fully_vaccinated: None,
        }
    }

    /// Builder method: set new cases
    pub fn new_cases(mut self, v: i64) -> Self {
        self.new_cases = Some(v);
        self
    }

    /// Builder method: set total deaths
    pub fn total_deaths(mut self, v: i64) -> Self {
        self.total_deaths = Some(v);
        self
    }

    /// Builder method: set people fully vaccinated
    pub fn people_fully_vaccinated(mut self, v: i64) -> Self {
        self.people_fully_vaccinated = Some(v);
        self
    }

    pub fn get(&self, field: SeriesField) -> Option<i64> {
        match field {
            SeriesField::NewCases => self.new_cases,
            SeriesField::TotalDeaths => self.total_deaths,
            SeriesField::PeopleFullyVaccinated => self.people_fully_vaccinated,
        }
    }
}

/// Ordered rows for exactly one country
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesTable {
    pub country: String,
    pub rows: Vec<SeriesRow>,
}

impl SeriesTable {
    /// Build a table, sorting rows ascending by date
    pub fn new(country: impl Into<String>, mut rows: Vec<SeriesRow>) -> Self {
        rows.sort_by_key(|r| r.date);
        Self {
            country: country.into(),
            rows,
        }
    }

    pub fn empty(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Min/max date present in the table
    pub fn span(&self) -> Option<DateRange> {
        let first = self.rows.first()?;
        let last = self.rows.last()?;
        Some(DateRange {
            start: first.date,
            end: last.date,
        })
    }
}

/// Inclusive date interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> DashboardResult<Self> {
        if start > end {
            return Err(DashboardError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Single-day range
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Check if a date falls within the range (both ends inclusive)
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Clamp each bound into `span`. A range lying wholly outside the span
    /// collapses onto the nearest end day.
    pub fn clamp_to(&self, span: &DateRange) -> DateRange {
        DateRange {
            start: self.start.clamp(span.start, span.end),
            end: self.end.clamp(span.start, span.end),
        }
    }

    /// Number of calendar days covered
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// The three metric columns the dashboard aggregates and plots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesField {
    NewCases,
    TotalDeaths,
    PeopleFullyVaccinated,
}

impl SeriesField {
    pub fn all() -> &'static [SeriesField] {
        &[
            SeriesField::NewCases,
            SeriesField::TotalDeaths,
            SeriesField::PeopleFullyVaccinated,
        ]
    }

    /// Source column name
    pub fn column(&self) -> &'static str {
        match self {
            SeriesField::NewCases => "new_cases",
            SeriesField::TotalDeaths => "total_deaths",
            SeriesField::PeopleFullyVaccinated => "people_fully_vaccinated",
        }
    }

    /// Human-readable axis label
    pub fn label(&self) -> &'static str {
        match self {
            SeriesField::NewCases => "New Cases",
            SeriesField::TotalDeaths => "Total Deaths",
            SeriesField::PeopleFullyVaccinated => "Fully Vaccinated",
        }
    }
}

impl std::fmt::Display for SeriesField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}
