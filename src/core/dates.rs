//! Date normalization for timecard rows
//!
//! Web forms and spreadsheets hand us dates in a handful of shapes. Each shape
//! is tried in a fixed priority order and the first one that yields a real
//! calendar date wins. The order matters: `01-02-03` is a two-digit-year ISO
//! date (2001-02-03), never day-first, and `01/02/2006` is month-first.

use chrono::{Datelike, Duration, NaiveDate};
use thiserror::Error;

/// Accepted input layouts, highest priority first.
///
/// `YYYY` is exactly four digits; `YY`, `MM` and `DD` exactly two. Any other
/// character must match literally.
pub const ACCEPTED_FORMATS: [&str; 6] = [
    "YYYY-MM-DD",
    "YY-MM-DD",
    "YYYY/MM/DD",
    "MM/DD/YYYY",
    "DD-MM-YYYY",
    "DD/MM/YYYY",
];

/// Raised when a date string matches none of [`ACCEPTED_FORMATS`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("bad date: {input:?}")]
pub struct DateParseError {
    pub input: String,
}

/// Normalize `text` into a calendar date.
///
/// The whole string must match a layout; surrounding whitespace is not
/// stripped, so `" 2024-01-13 "` is rejected.
pub fn normalize_date(text: &str) -> Result<NaiveDate, DateParseError> {
    ACCEPTED_FORMATS
        .iter()
        .find_map(|layout| parse_with_layout(text, layout))
        .ok_or_else(|| DateParseError {
            input: text.to_string(),
        })
}

/// The Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday() % 7))
}

/// Excel's 1900 date system counts from 1899-12-30 for every date after 1900-02-28.
fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN)
}

/// Serial number Excel stores for `date` in the 1900 date system.
pub fn to_excel_serial(date: NaiveDate) -> f64 {
    (date - excel_epoch()).num_days() as f64
}

/// Inverse of [`to_excel_serial`]; fractional days (times) are dropped.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    excel_epoch().checked_add_signed(Duration::days(serial.trunc() as i64))
}

#[derive(Default)]
struct Fields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
}

fn parse_with_layout(input: &str, layout: &str) -> Option<NaiveDate> {
    let mut rest = input;
    let mut pattern = layout;
    let mut fields = Fields::default();

    while !pattern.is_empty() {
        if let Some(p) = pattern.strip_prefix("YYYY") {
            fields.year = Some(take_digits(&mut rest, 4)? as i32);
            pattern = p;
        } else if let Some(p) = pattern.strip_prefix("YY") {
            let yy = take_digits(&mut rest, 2)? as i32;
            // 69..=99 -> 19xx, 00..=68 -> 20xx
            fields.year = Some(if yy >= 69 { 1900 + yy } else { 2000 + yy });
            pattern = p;
        } else if let Some(p) = pattern.strip_prefix("MM") {
            fields.month = Some(take_digits(&mut rest, 2)?);
            pattern = p;
        } else if let Some(p) = pattern.strip_prefix("DD") {
            fields.day = Some(take_digits(&mut rest, 2)?);
            pattern = p;
        } else {
            let sep = pattern.chars().next()?;
            rest = rest.strip_prefix(sep)?;
            pattern = &pattern[sep.len_utf8()..];
        }
    }

    if !rest.is_empty() {
        return None;
    }
    NaiveDate::from_ymd_opt(fields.year?, fields.month?, fields.day?)
}

fn take_digits(rest: &mut &str, width: usize) -> Option<u32> {
    let head = rest.get(..width)?;
    if !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    *rest = &rest[width..];
    head.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_each_accepted_format() {
        assert_eq!(normalize_date("2024-03-05").unwrap(), ymd(2024, 3, 5));
        assert_eq!(normalize_date("24-03-05").unwrap(), ymd(2024, 3, 5));
        assert_eq!(normalize_date("2024/03/05").unwrap(), ymd(2024, 3, 5));
        assert_eq!(normalize_date("03/05/2024").unwrap(), ymd(2024, 3, 5));
        assert_eq!(normalize_date("05-03-2024").unwrap(), ymd(2024, 3, 5));
        assert_eq!(normalize_date("25/03/2024").unwrap(), ymd(2024, 3, 25));
    }

    /// Strings that more than one layout could read, and the reading that must win.
    #[test]
    fn test_ambiguous_strings_first_match_wins() {
        let fixtures = [
            // two-digit ISO beats day-first dashes
            ("01-02-03", ymd(2001, 2, 3)),
            ("12-11-10", ymd(2012, 11, 10)),
            // month-first beats day-first slashes
            ("01/02/2006", ymd(2006, 1, 2)),
            ("12/11/2010", ymd(2010, 12, 11)),
            // only day-first can read a 13th "month"
            ("13/02/2006", ymd(2006, 2, 13)),
            // four-digit-year ISO is never read as YY-MM-DD
            ("2001-02-03", ymd(2001, 2, 3)),
            // dashes with a trailing four-digit year are day-first
            ("01-02-2006", ymd(2006, 2, 1)),
            // two-digit year pivot
            ("69-01-01", ymd(1969, 1, 1)),
            ("68-12-31", ymd(2068, 12, 31)),
            ("99-07-04", ymd(1999, 7, 4)),
        ];

        for (input, expected) in fixtures {
            assert_eq!(normalize_date(input).unwrap(), expected, "input {input:?}");
        }
    }

    #[test]
    fn test_invalid_calendar_dates_rejected() {
        for input in ["2024-02-30", "2023-02-29", "00/10/2024", "31/04/2024"] {
            let err = normalize_date(input).unwrap_err();
            assert_eq!(err.input, input);
        }
    }

    #[test]
    fn test_leap_day_accepted() {
        assert_eq!(normalize_date("2024-02-29").unwrap(), ymd(2024, 2, 29));
    }

    #[test]
    fn test_exact_widths_required() {
        for input in ["2024-3-5", "3/5/2024", "202-03-05", "2024-03-05T00:00:00", "2024-03-05x"] {
            assert!(normalize_date(input).is_err(), "input {input:?}");
        }
    }

    #[test]
    fn test_garbage_and_empty() {
        let err = normalize_date("").unwrap_err();
        assert_eq!(err.to_string(), "bad date: \"\"");
        assert!(normalize_date("next tuesday").is_err());
        assert!(normalize_date("２０２４-03-05").is_err());
    }

    #[test]
    fn test_surrounding_whitespace_rejected() {
        for padded in [" 2024-01-13 ", "  2024-03-05", "2024-03-05\n", "\t03/05/2024"] {
            let err = normalize_date(padded).unwrap_err();
            assert_eq!(err.input, padded);
        }
    }

    #[test]
    fn test_week_start_of_wednesday() {
        let wednesday = ymd(2024, 3, 6);
        assert_eq!(wednesday.weekday(), Weekday::Wed);
        assert_eq!(week_start(wednesday), ymd(2024, 3, 3));
    }

    #[test]
    fn test_week_start_of_sunday_is_itself() {
        let sunday = ymd(2024, 3, 3);
        assert_eq!(week_start(sunday), sunday);
    }

    #[test]
    fn test_week_start_crosses_year_boundary() {
        // 2025-01-01 is a Wednesday
        assert_eq!(week_start(ymd(2025, 1, 1)), ymd(2024, 12, 29));
        assert_eq!(week_start(ymd(2025, 1, 4)), ymd(2024, 12, 29));
    }

    #[test]
    fn test_excel_serial_known_values() {
        assert_eq!(to_excel_serial(ymd(1900, 3, 1)), 61.0);
        assert_eq!(to_excel_serial(ymd(2024, 1, 1)), 45292.0);
        assert_eq!(from_excel_serial(45292.0), Some(ymd(2024, 1, 1)));
        assert_eq!(from_excel_serial(45292.75), Some(ymd(2024, 1, 1)));
        assert_eq!(from_excel_serial(f64::NAN), None);
    }
}
