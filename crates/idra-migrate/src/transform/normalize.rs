//! Value coercions applied by the transformer.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{MigrateError, Result};

/// Naive layouts tried in order. `%.f` also matches a missing fraction.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%d %B %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
    "%b %d, %Y %I:%M:%S %p",
    "%a %b %e %H:%M:%S %Y",
];

/// Layouts carrying a UTC offset. The wall-clock time is kept as written.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y"];

/// Parse a timestamp written in any common textual form.
///
/// Accepts ISO 8601 / RFC 3339 (with or without `T`, offset, or fraction),
/// RFC 2822, US month/day/year forms, date-only values (midnight), and unix
/// epochs in seconds or milliseconds.
pub fn parse_timestamp(field: &str, value: &str) -> Result<NaiveDateTime> {
    let s = value.trim();
    let malformed = || MigrateError::MalformedTimestamp {
        field: field.to_string(),
        value: value.to_string(),
    };

    if s.is_empty() {
        return Err(malformed());
    }

    if s.len() >= 9 && s.bytes().all(|b| b.is_ascii_digit()) {
        let n: i64 = s.parse().map_err(|_| malformed())?;
        let parsed = if s.len() > 11 {
            DateTime::from_timestamp_millis(n)
        } else {
            DateTime::from_timestamp(n, 0)
        };
        return parsed.map(|dt| dt.naive_utc()).ok_or_else(malformed);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Ok(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.naive_local());
        }
    }

    let naive = s.strip_suffix('Z').unwrap_or(s);
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(naive, fmt) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }

    Err(malformed())
}

/// Extract the leading number of a measurement such as `"1.7 in"`.
pub fn parse_measurement(field: &str, value: &str) -> Result<f64> {
    let token = value.split_whitespace().next().unwrap_or("");

    let mut end = 0;
    for (i, c) in token.char_indices() {
        let numeric = c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'));
        if !numeric {
            break;
        }
        end = i + c.len_utf8();
    }

    token[..end]
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .ok_or_else(|| MigrateError::MalformedMeasurement {
            field: field.to_string(),
            value: value.to_string(),
        })
}

/// Parse an integer count, tolerating surrounding whitespace.
pub fn parse_int(field: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| MigrateError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        })
}

/// First character upper-case, the rest lower-case.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::TIMESTAMP_FORMAT;

    fn canonical(value: &str) -> String {
        parse_timestamp("t", value)
            .unwrap()
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }

    #[test]
    fn test_parse_timestamp_common_forms() {
        assert_eq!(canonical("2024-03-05 14:07:09"), "2024-03-05 14:07:09");
        assert_eq!(canonical("2024-03-05T14:07:09"), "2024-03-05 14:07:09");
        assert_eq!(canonical("2024-03-05T14:07:09.123Z"), "2024-03-05 14:07:09");
        assert_eq!(canonical("2024-03-05 14:07:09.500"), "2024-03-05 14:07:09");
        assert_eq!(canonical("2024-03-05T14:07:09+02:00"), "2024-03-05 14:07:09");
        assert_eq!(canonical("2024/03/05 14:07:09"), "2024-03-05 14:07:09");
        assert_eq!(canonical("03/05/2024 02:07:09 PM"), "2024-03-05 14:07:09");
        assert_eq!(canonical("Tue, 5 Mar 2024 14:07:09 +0000"), "2024-03-05 14:07:09");
        assert_eq!(canonical("2024-03-05"), "2024-03-05 00:00:00");
    }

    #[test]
    fn test_parse_timestamp_epochs() {
        assert_eq!(canonical("1709647629"), "2024-03-05 14:07:09");
        assert_eq!(canonical("1709647629000"), "2024-03-05 14:07:09");
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        for bad in ["", "   ", "yesterday", "2024-13-45 99:99:99"] {
            assert!(matches!(
                parse_timestamp("startTime", bad),
                Err(MigrateError::MalformedTimestamp { .. })
            ));
        }
    }

    #[test]
    fn test_parse_measurement() {
        assert_eq!(parse_measurement("finalSize", "1.7 in").unwrap(), 1.7);
        assert_eq!(parse_measurement("finalSize", "  3 cm").unwrap(), 3.0);
        assert_eq!(parse_measurement("finalSize", "2.5in").unwrap(), 2.5);
        assert_eq!(parse_measurement("finalSize", "-0.5").unwrap(), -0.5);
    }

    #[test]
    fn test_parse_measurement_without_number() {
        for bad in ["no units", "", "in 1.7", "."] {
            assert!(matches!(
                parse_measurement("finalSize", bad),
                Err(MigrateError::MalformedMeasurement { .. })
            ));
        }
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("snco", " 4 ").unwrap(), 4);
        assert!(matches!(
            parse_int("snco", "four"),
            Err(MigrateError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("daily"), "Daily");
        assert_eq!(capitalize("DAILY CHECK"), "Daily check");
        assert_eq!(capitalize(""), "");
    }
}
