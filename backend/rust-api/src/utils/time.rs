use chrono::{DateTime, Duration, Utc};

/// Seconds left on an attempt's clock. None = no time limit.
/// Zero or negative means the attempt is expired.
pub fn remaining_seconds(
    started_at: DateTime<Utc>,
    time_limit_seconds: Option<i64>,
    now: DateTime<Utc>,
) -> Option<i64> {
    time_limit_seconds.map(|limit| limit - (now - started_at).num_seconds())
}

pub fn is_expired(
    started_at: DateTime<Utc>,
    time_limit_seconds: Option<i64>,
    now: DateTime<Utc>,
) -> bool {
    matches!(
        remaining_seconds(started_at, time_limit_seconds, now),
        Some(remaining) if remaining <= 0
    )
}

/// Server-side submission instant for a lazily reaped expired attempt:
/// the moment the clock ran out, not the moment we noticed.
pub fn expiry_instant(started_at: DateTime<Utc>, time_limit_seconds: i64) -> DateTime<Utc> {
    started_at + Duration::seconds(time_limit_seconds)
}
