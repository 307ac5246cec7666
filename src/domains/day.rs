use std::time::{SystemTime, UNIX_EPOCH};

use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::{EchoError, Result};

pub const SECONDS_PER_DAY: i64 = 86_400;

pub fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// UTC day-start instant for the day containing `ts`. The reference timezone
/// is UTC on every path, so the same key is produced on write and read.
pub fn day_start(ts: i64) -> i64 {
    ts.div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY
}

/// Half-open `[day_start, day_end)` window for the day containing `ts`.
pub fn day_window(ts: i64) -> (i64, i64) {
    let start = day_start(ts);
    (start, start + SECONDS_PER_DAY)
}

pub fn utc_hour(ts: i64) -> Result<u8> {
    let instant = OffsetDateTime::from_unix_timestamp(ts)
        .map_err(|e| EchoError::Runtime(e.to_string()))?;
    Ok(instant.hour())
}

/// Parses a `YYYY-MM-DD` day string into its UTC day-start epoch second.
pub fn parse_day(value: &str) -> Result<i64> {
    let format = format_description!("[year]-[month]-[day]");
    let date = Date::parse(value.trim(), &format)
        .map_err(|_| EchoError::Validation(format!("invalid date: {value}")))?;
    Ok(date.midnight().assume_utc().unix_timestamp())
}
