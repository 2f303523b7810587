//! Timestamp and period helpers

use crate::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

/// First day covered by a period identifier
///
/// `YYYY-MM` starts on the first of the month, `YYYY-MM-DD` on that day.
pub fn period_start(period: &str) -> Result<NaiveDate> {
    let invalid = || Error::InvalidInput(format!("Invalid period format: {}", period));
    if !has_period_shape(period) {
        return Err(invalid());
    }
    match period.len() {
        7 => NaiveDate::parse_from_str(&format!("{}-01", period), "%Y-%m-%d")
            .map_err(|_| invalid()),
        _ => NaiveDate::parse_from_str(period, "%Y-%m-%d").map_err(|_| invalid()),
    }
}

/// Exactly `DDDD-DD` or `DDDD-DD-DD` with ASCII digits, so ids sort chronologically
fn has_period_shape(period: &str) -> bool {
    let bytes = period.as_bytes();
    if bytes.len() != 7 && bytes.len() != 10 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    })
}

/// Midnight UTC at the start of `date`
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Age in fractional days of `published` relative to `reference`, never negative
pub fn age_in_days(published: DateTime<Utc>, reference: DateTime<Utc>) -> f64 {
    let seconds = (reference - published).num_seconds() as f64;
    (seconds / 86_400.0).max(0.0)
}

/// `YYYY-MM` bucket for a timestamp
pub fn month_key(timestamp: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", timestamp.year(), timestamp.month())
}

/// Validate a `YYYY-MM` month key
pub fn parse_month_key(month: &str) -> Result<NaiveDate> {
    if month.len() != 7 {
        return Err(Error::InvalidInput(format!("Invalid month: {}", month)));
    }
    period_start(month)
}
