//! Missing-data characterization: pattern and summary tables.
//!
//! Both analyses are pure functions of a table and an ordered column set.
//! Percentages use the full table row count as denominator and are rounded
//! to one decimal place, consistently across both outputs.

pub mod pattern;
pub mod summary;

pub use pattern::{PatternRow, PatternTable, missing_pattern};
pub use summary::{ColumnSummary, SummaryTable, missing_summary};

/// Percentage of `count` over `total`, in [0, 100], rounded to one decimal.
/// An empty table yields 0.0 rather than NaN.
#[must_use]
pub(crate) fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 100.0 / total as f64 * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(2, 5), 40.0);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 5), 100.0);
    }
}
