//! Pure date and balance arithmetic used by the leave engine.

use chrono::{Datelike, NaiveDate, Weekday};

/// Counts the working days of an inclusive date range and returns them.
///
/// A day counts unless it falls on Saturday or Sunday. An inverted range
/// yields `(0, [])`; callers treat zero working days as an invalid request.
pub fn compute_working_days(start: NaiveDate, end: NaiveDate) -> (i32, Vec<NaiveDate>) {
    if end < start {
        return (0, Vec::new());
    }

    let dates: Vec<NaiveDate> = start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| is_working_day(*day))
        .collect();

    (dates.len() as i32, dates)
}

pub fn is_working_day(day: NaiveDate) -> bool {
    !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `total - reserved - (pending + approved)`, floored at zero.
pub fn available_balance(total: i32, reserved: i32, pending: i32, approved: i32) -> i32 {
    (total - reserved - (pending + approved)).max(0)
}

/// Share of the entitlement already pending or approved, in percent.
pub fn used_percent(total: i32, pending: i32, approved: i32) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    f64::from(pending + approved) / f64::from(total) * 100.0
}

/// Inclusive range intersection.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}
