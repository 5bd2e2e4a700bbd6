//! Publication-date normalization.
//!
//! RSS feeds in the wild put almost anything in `<pubDate>`. This module
//! parses the common formats into a UTC timestamp and refuses to guess when
//! none of them match: an unrecognized date is an error the caller can see,
//! never a silently substituted "now".

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// A non-empty date string matched none of the supported formats.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized date format: {0:?}")]
pub struct DateFormatUnrecognized(pub String);

/// Formats carrying a numeric UTC offset.
///
/// Tried before the naive formats so that a trailing `-0700` is applied as an
/// offset instead of being swallowed by a `%Z` zone-name field.
const OFFSET_FORMATS: &[&str] = &[
    // Ruby date: "Mon Jan 02 15:04:05 -0700 2006"
    "%a %b %e %H:%M:%S %z %Y",
];

/// Formats without a usable offset. Zone abbreviations (`%Z`) are matched but
/// contribute nothing; the wall-clock time is taken as UTC.
const NAIVE_FORMATS: &[&str] = &[
    // RFC 850: "Monday, 02-Jan-06 15:04:05 UTC"
    "%A, %d-%b-%y %H:%M:%S %Z",
    // Unix `date` output: "Mon Jan  2 15:04:05 UTC 2006"
    "%a %b %e %H:%M:%S %Z %Y",
    // ANSI C asctime: "Mon Jan  2 15:04:05 2006"
    "%a %b %e %H:%M:%S %Y",
];

/// Parses a raw `<pubDate>` string into a UTC timestamp.
///
/// Returns `Ok(None)` for empty (or whitespace-only) input, `Ok(Some(_))` on
/// the first successful parse, and [`DateFormatUnrecognized`] when a non-empty
/// string matches nothing. Supported formats, in priority order: RFC 822 /
/// RFC 1123 (full RFC 2822 grammar, named or numeric zones), RFC 3339,
/// Ruby-style dates, RFC 850, Unix `date` output, ANSI C asctime.
pub fn parse_pub_date(raw: &str) -> Result<Option<DateTime<Utc>>, DateFormatUnrecognized> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Ok(Some(dt.with_timezone(&Utc)));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Some(dt.and_utc()));
        }
    }

    Err(DateFormatUnrecognized(trimmed.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    // 2006-01-02 15:04:05 in MST (-0700) is 22:04:05 UTC
    const REFERENCE_MST: i64 = 1_136_239_445;
    // 2006-01-02 15:04:05 taken as UTC
    const REFERENCE_UTC: i64 = 1_136_214_245;

    fn parse_secs(raw: &str) -> i64 {
        parse_pub_date(raw)
            .expect("should parse")
            .expect("should be present")
            .timestamp()
    }

    #[test]
    fn empty_input_is_absent_not_an_error() {
        assert_eq!(parse_pub_date("").unwrap(), None);
        assert_eq!(parse_pub_date("   \t ").unwrap(), None);
    }

    #[test]
    fn parses_rfc1123_with_named_zone() {
        assert_eq!(parse_secs("Mon, 02 Jan 2006 15:04:05 MST"), REFERENCE_MST);
    }

    #[test]
    fn parses_rfc1123_with_numeric_offset() {
        assert_eq!(parse_secs("Mon, 02 Jan 2006 15:04:05 -0700"), REFERENCE_MST);
    }

    #[test]
    fn parses_rfc822_short_year_without_weekday() {
        // no weekday, two-digit year, no seconds
        assert_eq!(parse_secs("02 Jan 06 15:04 MST"), REFERENCE_MST - 5);
    }

    #[test]
    fn parses_rfc3339() {
        assert_eq!(parse_secs("2006-01-02T15:04:05Z"), REFERENCE_UTC);
        assert_eq!(parse_secs("2006-01-02T08:04:05-07:00"), REFERENCE_UTC);
    }

    #[test]
    fn parses_ruby_date() {
        assert_eq!(parse_secs("Mon Jan 02 15:04:05 -0700 2006"), REFERENCE_MST);
    }

    #[test]
    fn parses_rfc850() {
        assert_eq!(parse_secs("Monday, 02-Jan-06 15:04:05 UTC"), REFERENCE_UTC);
    }

    #[test]
    fn parses_unix_date_output() {
        assert_eq!(parse_secs("Mon Jan  2 15:04:05 UTC 2006"), REFERENCE_UTC);
    }

    #[test]
    fn parses_ansic() {
        assert_eq!(parse_secs("Mon Jan  2 15:04:05 2006"), REFERENCE_UTC);
    }

    #[test]
    fn unrecognized_input_is_an_error_not_now() {
        let err = parse_pub_date("yesterday, probably").unwrap_err();
        assert_eq!(err, DateFormatUnrecognized("yesterday, probably".into()));
        assert!(parse_pub_date("2006/13/45").is_err());
    }

    proptest! {
        #[test]
        fn arbitrary_input_never_panics(raw in "\\PC*") {
            let _ = parse_pub_date(&raw);
        }
    }
}
