//! Wire formats for calendar dates (`YYYY-MM-DD`) and times of day (`HH:MM`).

use serde::Serializer;
use time::{format_description::FormatItem, macros::format_description, Date, Time};

use crate::error::{AppError, AppResult};

pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
pub const TIME_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]");
const TIME_WITH_SECONDS_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");

pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

pub fn format_time(t: Time) -> String {
    t.format(TIME_FORMAT).unwrap_or_else(|_| t.to_string())
}

pub fn parse_date(field: &str, raw: &str) -> AppResult<Date> {
    Date::parse(raw.trim(), DATE_FORMAT)
        .map_err(|_| AppError::validation(format!("Invalid {field}: expected YYYY-MM-DD")))
}

/// Accepts `HH:MM` or `HH:MM:SS`; seconds are dropped.
pub fn parse_time(field: &str, raw: &str) -> AppResult<Time> {
    let raw = raw.trim();
    Time::parse(raw, TIME_FORMAT)
        .or_else(|_| Time::parse(raw, TIME_WITH_SECONDS_FORMAT))
        .map(|t| t.replace_second(0).unwrap_or(t))
        .map_err(|_| AppError::validation(format!("Invalid {field}: expected HH:MM")))
}

pub fn serialize_date<S: Serializer>(date: &Date, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_date(*date))
}

pub fn serialize_opt_date<S: Serializer>(date: &Option<Date>, s: S) -> Result<S::Ok, S::Error> {
    match date {
        Some(d) => s.serialize_str(&format_date(*d)),
        None => s.serialize_none(),
    }
}

pub fn serialize_time<S: Serializer>(t: &Time, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_time(*t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    #[test]
    fn parses_and_formats_dates() {
        let d = parse_date("start_date", "2025-06-10").unwrap();
        assert_eq!(d, date!(2025 - 06 - 10));
        assert_eq!(format_date(d), "2025-06-10");
        assert!(parse_date("start_date", "10/06/2025").is_err());
    }

    #[test]
    fn parses_times_with_optional_seconds() {
        assert_eq!(parse_time("reminder_time", "09:00").unwrap(), time!(09:00));
        assert_eq!(parse_time("reminder_time", "18:30:00").unwrap(), time!(18:30));
        assert_eq!(parse_time("reminder_time", "07:15:42").unwrap(), time!(07:15));
        assert!(parse_time("reminder_time", "9am").is_err());
        assert!(parse_time("reminder_time", "09:00xyz").is_err());
        assert!(parse_time("reminder_time", "09:00:").is_err());
        assert!(parse_time("reminder_time", "25:00").is_err());
        assert_eq!(format_time(time!(08:05)), "08:05");
    }
}
