// Utility helpers for parsing and basic statistics.
//
// This module centralizes the forgiving CSV/number/date handling so the rest
// of the code can assume typed values (or explicit `None` for missing ones).
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Weekday};
use num_format::{Locale, ToFormattedString};

/// Full weekday names, Monday first.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

// `%.f` also matches when there is no fractional part.
const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y%m%d", "%d-%m-%Y"];

fn non_empty(s: Option<&str>) -> Option<&str> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Trims whitespace.
/// - Strips thousands separators like `","` before parsing.
/// - Accepts exponent notation (`2.5E3`).
/// - Returns `None` for text, `NaN` and infinities.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = non_empty(s)?;
    s.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Hour of day in `0..=23`. Accepts `"7"` as well as `"7.0"`, which is how
/// float-typed hour columns usually come back out of spreadsheets.
pub fn parse_hour_safe(s: Option<&str>) -> Option<u32> {
    let s = non_empty(s)?;
    let hour = match s.parse::<u32>() {
        Ok(h) => h,
        Err(_) => {
            let f = s.parse::<f64>().ok()?;
            if f.fract() != 0.0 || f < 0.0 {
                return None;
            }
            f as u32
        }
    };
    (hour < 24).then_some(hour)
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = non_empty(s)?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse an event timestamp. Bare dates become midnight; anything
/// unrecognized is `None` rather than an error.
pub fn parse_timestamp_safe(s: Option<&str>) -> Option<NaiveDateTime> {
    let s = non_empty(s)?;
    if let Some(ts) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_local());
    }
    parse_date_safe(Some(s)).and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn weekday_name(day: Weekday) -> &'static str {
    WEEKDAY_NAMES[day.num_days_from_monday() as usize]
}

/// Weekday name of a date, e.g. `"Tuesday"`.
pub fn day_name(date: NaiveDate) -> &'static str {
    weekday_name(date.weekday())
}

pub fn average(v: &[f64]) -> Option<f64> {
    // Mean of the values; `None` for an empty slice instead of NaN.
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let mut res = match int_part.parse::<u128>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        Err(_) => int_part.to_string(),
    };
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_optional(n: &Option<f64>) -> String {
    match n {
        Some(v) => format_number(*v, 2),
        None => "-".to_string(),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
