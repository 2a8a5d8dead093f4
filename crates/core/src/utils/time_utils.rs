use chrono::{DateTime, Duration, Months, NaiveDate, NaiveTime, SubsecRound, Utc};

use crate::constants::MS_IN_DAY;

/// Whole days until `target`, rounded up. Negative when `target` is in the past.
///
/// A deadline 1 ms away counts as 1 day, a deadline 1 ms ago counts as 0 days,
/// and anything more than a full day ago is negative.
pub fn ceil_days_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let diff_ms = (target - now).num_milliseconds();
    (diff_ms as f64 / MS_IN_DAY as f64).ceil() as i64
}

/// Whole days elapsed since `instant`, rounded down and never negative.
pub fn whole_days_since(instant: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let diff_ms = (now - instant).num_milliseconds();
    (diff_ms as f64 / MS_IN_DAY as f64).floor().max(0.0) as i64
}

/// Drops sub-second precision so values survive a round trip through storage.
pub fn truncate_to_seconds(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(0)
}

/// Adds `days` calendar days.
pub fn add_days(instant: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    instant + Duration::days(days)
}

/// Adds calendar months, clamping to the last valid day of the target month.
pub fn add_months(instant: DateTime<Utc>, months: u32) -> Option<DateTime<Utc>> {
    instant.checked_add_months(Months::new(months))
}

/// Midnight UTC of the given calendar date.
pub fn start_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
