//! Trading calendar — the ordered set of evaluation timestamps for a range.
//!
//! Weekends are excluded; no holiday calendar is applied. The sequence is
//! strictly increasing and finite, so a replay over it is restartable and
//! deterministic by construction.

use chrono::{Datelike, NaiveDate, Weekday};

/// True if `date` falls on a Saturday or Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Generate the business-day sequence for `[start, end]`, inclusive.
///
/// Returns an empty vector when `start > end`. Pure function: no clock, no
/// side effects.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        if !is_weekend(cursor) {
            days.push(cursor);
        }
        match cursor.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    days
}
