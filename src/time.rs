//! Local time handling. Colombia is UTC-5 all year.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

const NAIVE_FORMATS: [&str; 4] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

pub fn bogota() -> FixedOffset {
    FixedOffset::west_opt(5 * 3600).expect("UTC-5 is a valid offset")
}

/// RFC 3339, or a naive `datetime-local` value read as Bogotá time
pub fn parse_datetime(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .and_then(|naive| bogota().from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc))
}

/// Like [`parse_datetime`], but a bare `YYYY-MM-DD` becomes the first or last
/// second of that day in Bogotá
pub fn parse_day_bound(input: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Some(parsed) = parse_datetime(input) {
        return Some(parsed);
    }

    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)?
    } else {
        NaiveTime::MIN
    };
    bogota()
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|local| local.with_timezone(&Utc))
}

pub fn format_local(date: DateTime<Utc>) -> String {
    date.with_timezone(&bogota()).format("%d/%m/%Y %H:%M").to_string()
}
