use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Parses an HTTP-date header value into unix milliseconds.
///
/// Malformed dates are treated as absent rather than errors; a stored
/// response with a bad `Date` must not poison the cache.
pub fn parse_http_date_millis(value: &str) -> Option<i64> {
    let time = httpdate::parse_http_date(value).ok()?;
    Some(system_time_millis(time))
}

pub fn system_time_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
        Err(err) => i64::try_from(err.duration().as_millis())
            .map(|millis| -millis)
            .unwrap_or(i64::MIN),
    }
}

/// Parses a non-negative decimal seconds value (`Age`, cache-control
/// directives), saturating when the digits overflow a `u64`.
pub fn parse_seconds(value: &str) -> Option<u64> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(trimmed.parse::<u64>().unwrap_or(u64::MAX))
}

pub fn saturating_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

pub fn seconds_to_millis(seconds: u64) -> i64 {
    i64::try_from(seconds).unwrap_or(i64::MAX).saturating_mul(1000)
}
