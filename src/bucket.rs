use chrono::{DateTime, Duration, TimeZone, Utc};

/// Calendar-day format of a day bucket key. Lexicographic order is chronological.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Day bucket key (`YYYY-MM-DD`) of an instant. Days are always cut in UTC.
pub fn day_key(ts: DateTime<Utc>) -> String {
    ts.format(DAY_KEY_FORMAT).to_string()
}

/// Floor an instant to an epoch-aligned interval boundary.
pub fn align_down(ts: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let interval_ms = interval.num_milliseconds().max(1);
    let ts_ms = ts.timestamp_millis();
    let bucket_ms = ts_ms.div_euclid(interval_ms) * interval_ms;
    Utc.timestamp_millis_opt(bucket_ms).single().unwrap_or(ts)
}
