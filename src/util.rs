//! Utility functions shared by the load tests and the action service.

use regex::Regex;
use std::str::FromStr;
use std::time::Duration;

/// Parse a string representing a time span and return the number of seconds.
///
/// Can be specified as an integer, indicating seconds. Or can use integers
/// together with one or more of "h", "m", and "s", in that order, indicating
/// "hours", "minutes", and "seconds".
///
/// Valid formats include: 20, 20s, 3m, 2h, 1h20m, 3h30m10s, etc. Invalid
/// values are 0 seconds. Returns `None` when the span doesn't fit in a `u64`.
///
/// # Example
/// ```rust
/// use telemetry_demo::util;
///
/// // 1 hour 2 minutes and 3 seconds is 3,723 seconds.
/// assert_eq!(util::parse_timespan("1h2m3s"), Some(3_723));
///
/// // 45 seconds is 45 seconds.
/// assert_eq!(util::parse_timespan("45"), Some(45));
///
/// // Invalid value is 0 seconds.
/// assert_eq!(util::parse_timespan("foo"), Some(0));
///
/// // Too many hours.
/// assert_eq!(util::parse_timespan("9999999999999999h"), None);
/// ```
pub fn parse_timespan(time_str: &str) -> Option<u64> {
    if let Ok(t) = u64::from_str(time_str) {
        trace!("{} is integer: {} seconds", time_str, t);
        return Some(t);
    }

    let re = match Regex::new(r"((?P<hours>\d+?)h)?((?P<minutes>\d+?)m)?((?P<seconds>\d+?)s)?")
    {
        Ok(re) => re,
        Err(e) => {
            warn!("failed to compile timespan regex: {}", e);
            return Some(0);
        }
    };
    let Some(time_matches) = re.captures(time_str) else {
        return Some(0);
    };
    // A run of digits too long for a u64 overflows as surely as the sum does.
    let unit = |name: &str| match time_matches.name(name) {
        Some(m) => u64::from_str(m.as_str()).ok(),
        None => Some(0),
    };
    let (hours, minutes, seconds) = (unit("hours")?, unit("minutes")?, unit("seconds")?);
    let total = hours
        .checked_mul(60 * 60)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?;
    trace!(
        "{} hours {} minutes {} seconds: {} seconds",
        hours,
        minutes,
        seconds,
        total
    );
    Some(total)
}

/// Sleep for a specified duration, minus the time already spent since `drift`.
///
/// Returns the instant the sleep ended, so callers can chain it as the start of
/// the next period.
pub async fn sleep_minus_drift(
    duration: Duration,
    drift: tokio::time::Instant,
) -> tokio::time::Instant {
    match duration.checked_sub(drift.elapsed()) {
        Some(delay) if delay.as_nanos() > 0 => tokio::time::sleep(delay).await,
        _ => debug!("sleep_minus_drift: drift was greater than or equal to duration, not sleeping"),
    };
    tokio::time::Instant::now()
}
