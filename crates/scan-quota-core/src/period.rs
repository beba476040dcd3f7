// Billing window arithmetic.
//
// Windows are anchored to the day-of-month of the user's trial start, not to
// calendar month boundaries. When the anchor day does not exist in a month
// (day 31 in a 30-day month) the boundary falls on the last day of that
// month, and returns to the anchor day in the next month that has it. This
// is the only place that performs month arithmetic.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// A `[start, end)` consumption window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// The anchor day clamped into the given month.
fn clamped_date(year: i32, month: u32, anchor_day: u32) -> NaiveDate {
    let day = anchor_day.min(days_in_month(year, month));
    // Total for any valid (year, month) since day is clamped to the month
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default())
}

fn month_after(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn month_before(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// The billing window containing `now`, anchored to `anchor`'s day-of-month
/// and time-of-day: the start is the most recent occurrence of the anchor
/// day that is `<= now`, the end is one anchor month later.
pub fn window_containing(anchor: DateTime<Utc>, now: DateTime<Utc>) -> BillingWindow {
    let anchor_day = anchor.day();
    let time = anchor.time();

    let candidate = clamped_date(now.year(), now.month(), anchor_day)
        .and_time(time)
        .and_utc();
    let start = if candidate <= now {
        candidate
    } else {
        let (year, month) = month_before(now.year(), now.month());
        clamped_date(year, month, anchor_day).and_time(time).and_utc()
    };

    let (end_year, end_month) = month_after(start.year(), start.month());
    let end = clamped_date(end_year, end_month, anchor_day)
        .and_time(time)
        .and_utc();

    BillingWindow { start, end }
}

/// Trial days remaining at `now`, rounded up, floored at zero.
pub fn days_remaining(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (until - now).num_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + 86_399) / 86_400
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    #[test]
    fn window_for_mid_month_anchor() {
        // Anchor day 10; now Jan 24 → [Jan 10, Feb 10)
        let window = window_containing(at(2025, 1, 10), at(2025, 1, 24));
        assert_eq!(window.start, at(2025, 1, 10));
        assert_eq!(window.end, at(2025, 2, 10));
    }

    #[test]
    fn window_when_anchor_day_not_yet_reached() {
        // Anchor day 10; now Feb 3 → [Jan 10, Feb 10)
        let window = window_containing(at(2025, 1, 10), at(2025, 2, 3));
        assert_eq!(window.start, at(2025, 1, 10));
        assert_eq!(window.end, at(2025, 2, 10));
    }

    #[test]
    fn window_start_is_inclusive() {
        let window = window_containing(at(2025, 1, 10), at(2025, 2, 10));
        assert_eq!(window.start, at(2025, 2, 10));
        assert_eq!(window.end, at(2025, 3, 10));
    }

    #[test]
    fn anchor_day_31_clamps_into_short_months() {
        // Anchor Jan 31; now Feb 15 → [Jan 31, Feb 28)
        let window = window_containing(at(2025, 1, 31), at(2025, 2, 15));
        assert_eq!(window.start, at(2025, 1, 31));
        assert_eq!(window.end, at(2025, 2, 28));

        // Now Mar 1: Feb window elapsed → [Feb 28, Mar 31), back to day 31
        let window = window_containing(at(2025, 1, 31), at(2025, 3, 1));
        assert_eq!(window.start, at(2025, 2, 28));
        assert_eq!(window.end, at(2025, 3, 31));

        // Day 31 anchored into a 30-day month
        let window = window_containing(at(2025, 1, 31), at(2025, 4, 10));
        assert_eq!(window.start, at(2025, 3, 31));
        assert_eq!(window.end, at(2025, 4, 30));
    }

    #[test]
    fn leap_february_keeps_day_29() {
        let window = window_containing(at(2024, 1, 31), at(2024, 2, 15));
        assert_eq!(window.start, at(2024, 1, 31));
        assert_eq!(window.end, at(2024, 2, 29));
    }

    #[test]
    fn year_boundary_rolls_into_january() {
        let window = window_containing(at(2024, 12, 15), at(2024, 12, 20));
        assert_eq!(window.start, at(2024, 12, 15));
        assert_eq!(window.end, at(2025, 1, 15));
    }

    #[test]
    fn days_remaining_rounds_up_and_floors_at_zero() {
        let end = at(2025, 1, 20);
        assert_eq!(days_remaining(end, at(2025, 1, 10)), 10);
        assert_eq!(days_remaining(end, end - chrono::Duration::hours(1)), 1);
        assert_eq!(days_remaining(end, end), 0);
        assert_eq!(days_remaining(end, at(2025, 1, 25)), 0);
    }
}
