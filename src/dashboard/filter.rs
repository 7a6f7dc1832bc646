//! Range Filter
//!
//! Narrows a loaded table to an inclusive date range. Each bound is clamped
//! into the table's span first, so a range past either end still selects
//! that end day. Because tables are ascending by date, the
//! result is always one contiguous slice, located by binary search.

use super::types::{DateRange, SeriesRow, SeriesTable};

/// Rows of `table` whose date lies within `range` (inclusive).
///
/// Pure function of its inputs; the source table is never modified.
pub fn filter_range(table: &SeriesTable, range: DateRange) -> SeriesTable {
    SeriesTable {
        country: table.country.clone(),
        rows: slice_range(&table.rows, range).to_vec(),
    }
}

/// Borrowing form of [`filter_range`]
pub fn slice_range(rows: &[SeriesRow], range: DateRange) -> &[SeriesRow] {
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return &[];
    };
    let span = DateRange {
        start: first.date,
        end: last.date,
    };

    let range = range.clamp_to(&span);

    let lo = rows.partition_point(|r| r.date < range.start);
    let hi = rows.partition_point(|r| r.date <= range.end);
    &rows[lo..hi]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::testing::d;

    fn table(days: &[u32]) -> SeriesTable {
        SeriesTable::new(
            "France",
            days.iter()
                .map(|&day| SeriesRow::new(d(2021, 1, day)).new_cases(day as i64))
                .collect(),
        )
    }

    fn range(start: u32, end: u32) -> DateRange {
        DateRange::new(d(2021, 1, start), d(2021, 1, end)).unwrap()
    }

    fn days(t: &SeriesTable) -> Vec<u32> {
        use chrono::Datelike;
        t.rows.iter().map(|r| r.date.day()).collect()
    }

    #[test]
    fn test_inclusive_bounds() {
        let t = table(&[1, 2, 3, 4, 5]);
        assert_eq!(days(&filter_range(&t, range(2, 4))), vec![2, 3, 4]);
        assert_eq!(days(&filter_range(&t, range(3, 3))), vec![3]);
    }

    #[test]
    fn test_full_span_is_identity() {
        let t = table(&[1, 2, 3]);
        assert_eq!(filter_range(&t, t.span().unwrap()), t);
    }

    #[test]
    fn test_out_of_span_bounds_are_clamped() {
        let t = table(&[5, 6, 7]);
        assert_eq!(days(&filter_range(&t, range(1, 6))), vec![5, 6]);
        assert_eq!(days(&filter_range(&t, range(6, 30))), vec![6, 7]);
        assert_eq!(days(&filter_range(&t, range(1, 4))), vec![5]);
        assert_eq!(days(&filter_range(&t, range(8, 9))), vec![7]);
    }

    #[tokio::test]
    async fn test_agrees_with_dashboard_selection() {
        use crate::dashboard::testing::fixture_warehouse;
        use crate::dashboard::{Dashboard, DashboardRequest};

        let dashboard = Dashboard::new(std::sync::Arc::new(fixture_warehouse()), "owid_covid2");
        let request = DashboardRequest::country("France").between(d(2030, 1, 1), d(2031, 1, 1));
        let selection = dashboard.select(&request).await.unwrap();

        let full = dashboard.series("France").await.unwrap();
        let direct = filter_range(&full, DateRange::new(d(2030, 1, 1), d(2031, 1, 1)).unwrap());

        assert_eq!(direct.len(), 1);
        assert_eq!(direct, selection.table);
        assert_eq!(selection.range, Some(DateRange::day(d(2021, 1, 2))));
    }

    #[test]
    fn test_gaps_in_dates() {
        let t = table(&[1, 4, 9, 12]);
        assert_eq!(days(&filter_range(&t, range(2, 9))), vec![4, 9]);
        assert!(filter_range(&t, range(5, 8)).is_empty());
    }

    #[test]
    fn test_empty_table() {
        let t = SeriesTable::empty("Atlantis");
        let out = filter_range(&t, range(1, 31));
        assert!(out.is_empty());
        assert_eq!(out.country, "Atlantis");
    }

    #[test]
    fn test_result_is_exact_ordered_subsequence() {
        let t = table(&[1, 2, 3, 5, 8, 13, 21, 30]);

        for start in 1..=30 {
            for end in start..=30 {
                let r = range(start, end);
                let out = filter_range(&t, r);

                let clamped = r.clamp_to(&t.span().unwrap());
                let expected: Vec<SeriesRow> =
                    t.rows.iter().filter(|row| clamped.contains(row.date)).copied().collect();
                assert_eq!(out.rows, expected, "range {}", r);
                assert!(out.rows.windows(2).all(|w| w[0].date < w[1].date));
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let t = table(&[1, 2, 3, 5, 8, 13]);
        let r = range(2, 9);
        let once = filter_range(&t, r);
        let twice = filter_range(&once, r);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_source_unchanged() {
        let t = table(&[1, 2, 3]);
        let before = t.clone();
        let _ = filter_range(&t, range(2, 2));
        assert_eq!(t, before);
    }
}
