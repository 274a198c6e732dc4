//! Calendar - valuation date sequencing
//!
//! A simulation run covers a half-open range `[start_date, end_date)`:
//! day zero (initialization) happens at `start_date`, and one rebalance runs
//! for every interior date strictly between start and end. `end_date` itself
//! is never processed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Iterator over the rebalance dates of a transaction.
///
/// Yields `start_date + 1` through `end_date - 1` in ascending order; empty
/// whenever the range has no interior (`end_date <= start_date + 1`).
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use collateral_simulator_core_rs::DateRange;
///
/// let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
///
/// let dates: Vec<NaiveDate> = DateRange::interior(start, end).collect();
/// assert_eq!(dates.len(), 3); // 4/2, 4/3, 4/4
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    cursor: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Rebalance dates of the run `[start_date, end_date)`, skipping the
    /// initialization day.
    pub fn interior(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let cursor = start_date.succ_opt().unwrap_or(end_date);
        DateRange {
            cursor,
            end: end_date,
        }
    }

    /// Number of dates left to yield.
    pub fn remaining(&self) -> u64 {
        if self.cursor >= self.end {
            0
        } else {
            (self.end - self.cursor).num_days() as u64
        }
    }
}

impl Iterator for DateRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.cursor >= self.end {
            return None;
        }
        let date = self.cursor;
        self.cursor = date.succ_opt().unwrap_or(self.end);
        Some(date)
    }
}

/// Whether `date` is the last interior date of a run ending at `end_date`,
/// i.e. the date on which the transaction completes.
pub fn is_final_valuation_date(date: NaiveDate, end_date: NaiveDate) -> bool {
    date.succ_opt() == Some(end_date)
}
