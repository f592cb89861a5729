use chrono::{SecondsFormat, Utc};

/// ISO-8601 UTC, second precision, `Z` suffix.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}
