// src/date.rs
//! Calendar helpers anchored on a fixed reference offset (JST by default).

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

const JST_OFFSET_SECS: i32 = 9 * 60 * 60;

/// Asia/Tokyo as a fixed UTC+9 offset (no DST there).
pub fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).expect("UTC+9 is a valid offset")
}

/// Midnight (00:00:00.000) of `t`'s calendar date as seen in `offset`, returned in UTC.
pub fn beginning_of_day(t: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = t
        .with_timezone(&offset)
        .date_naive()
        .and_time(NaiveTime::MIN);
    // A fixed offset never produces gaps or folds.
    offset
        .from_local_datetime(&local_midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(t)
}

pub fn add_days(t: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    t + Duration::days(days)
}

/// `YYYY-MM-DD` of the instant, used for day-scoped lock keys.
pub fn date_key(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d").to_string()
}

/// `YYYY/MM/DD/HH/MM/SS`, the directory layout of persisted reports.
pub fn report_path_segment(t: DateTime<Utc>) -> String {
    t.format("%Y/%m/%d/%H/%M/%S").to_string()
}
