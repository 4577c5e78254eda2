//! Pure local date-time computations behind the start/end time defaults.
//! These deliberately know nothing about the DOM so they can be tested on
//! their own.

use chrono::{Duration, NaiveDateTime, Timelike};

/// The value format of a `datetime-local` input: zero-padded, 24-hour
/// clock, minute precision.
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Parses a `datetime-local` value. Accepts an optional seconds component,
/// which some user agents emit, but always drops it.
pub fn parse_local(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, LOCAL_DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|parsed| parsed.with_second(0).unwrap_or(parsed))
}

pub fn format_local(value: NaiveDateTime) -> String {
    value.format(LOCAL_DATETIME_FORMAT).to_string()
}

/// Current time with minutes zeroed and the hour advanced by one. The date
/// rolls forward when called in the last hour of the day.
pub fn next_full_hour(now: NaiveDateTime) -> NaiveDateTime {
    let on_the_hour = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    on_the_hour + Duration::hours(1)
}

/// Default reservation length: one hour past the chosen start.
pub fn plus_one_hour(start: NaiveDateTime) -> NaiveDateTime {
    start + Duration::hours(1)
}
