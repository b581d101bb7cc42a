use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};

/// Truncate a timestamp to midnight UTC.
pub fn normalize_to_midnight(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Parse an ISO timestamp, a naive datetime, or a bare `YYYY-MM-DD` date.
/// Returns `None` on anything unparseable.
pub fn parse_iso_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }
    None
}

/// Inclusive sequence of calendar days between two timestamps, one entry per
/// day, each normalized to midnight. Empty when start is after end.
pub fn date_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let start = normalize_to_midnight(start);
    let end = normalize_to_midnight(end);

    let mut range = Vec::new();
    let mut current = start;
    while current <= end {
        range.push(current);
        current += Duration::days(1);
    }
    range
}

pub fn is_weekend(dt: DateTime<Utc>) -> bool {
    matches!(dt.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The last 30 days, used when no explicit range is given.
pub fn default_date_range() -> (DateTime<Utc>, DateTime<Utc>) {
    let end = Utc::now();
    (end - Duration::days(30), end)
}
