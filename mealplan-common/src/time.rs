//! Timestamp utilities

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Start of the Monday-based week containing `date` (Monday 00:00 UTC)
pub fn start_of_week(date: DateTime<Utc>) -> DateTime<Utc> {
    let days_from_monday = i64::from(date.weekday().num_days_from_monday());
    let monday = date.date_naive() - Duration::days(days_from_monday);
    monday.and_time(NaiveTime::MIN).and_utc()
}

/// Start of the current week
pub fn start_of_current_week() -> DateTime<Utc> {
    start_of_week(now())
}
