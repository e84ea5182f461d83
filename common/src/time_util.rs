use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Duration, Local, TimeZone, Utc};

/// Length of a `YYYY-MM-DD HH:MM:SS` timestamp string.
pub const TIMESTAMP_LEN: usize = 19;

/// Current wall-clock time in whole seconds since the Unix epoch.
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs()
}

/// Current local time, formatted `YYYY-MM-DD HH:MM:SS`, for log banners.
pub fn now_str() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Formats a Unix epoch-seconds value as `YYYY-MM-DD HH:MM:SS` at a fixed
/// UTC+2 offset.
///
/// This is a historical storage contract with downstream consumers of the
/// `ts` column (see the day file schema) and must be preserved bit-exactly:
/// no daylight-saving adjustment, no local-timezone lookup, just `epoch + 2h`.
pub fn format_epoch_as_utc_plus_2(epoch_secs: u64) -> String {
    let instant = Utc
        .timestamp_opt(epoch_secs as i64, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap());
    let shifted = instant + Duration::hours(2);
    let formatted = shifted.format("%Y-%m-%d %H:%M:%S").to_string();

    if formatted.len() > TIMESTAMP_LEN {
        formatted[..TIMESTAMP_LEN].to_string()
    } else {
        formatted
    }
}

/// Returns the `YYYY-MM-DD` day-partition prefix of a `dt` string.
///
/// Routing is a plain string prefix, never a parsed-date computation: the
/// on-disk partition must correspond exactly to the upstream calendar day,
/// with no timezone math applied to `dt`.
pub fn day_prefix(dt: &str) -> &str {
    let end = dt.len().min(10);
    &dt[..end]
}
