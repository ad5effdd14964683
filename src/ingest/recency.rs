// src/ingest/recency.rs
//! Same-day recency filter.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use crate::ingest::error::IngestError;

/// How a source writes its publication timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DateFormat {
    /// `Tue, 06 May 2025 14:03:00 GMT`, as in RSS `pubDate`.
    Rfc2822,
    /// W3C datetime as used by sitemaps: RFC 3339, minutes-only, or a bare `YYYY-MM-DD`.
    Iso8601,
    /// chrono strftime pattern, e.g. `%d.%m.%Y %H:%M`.
    Pattern(String),
}

impl From<String> for DateFormat {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "rfc2822" => DateFormat::Rfc2822,
            "iso8601" | "rfc3339" | "w3c" => DateFormat::Iso8601,
            _ => DateFormat::Pattern(s),
        }
    }
}

impl From<DateFormat> for String {
    fn from(f: DateFormat) -> Self {
        match f {
            DateFormat::Rfc2822 => "rfc2822".to_string(),
            DateFormat::Iso8601 => "iso8601".to_string(),
            DateFormat::Pattern(p) => p,
        }
    }
}

fn to_utc_date(dt: OffsetDateTime) -> Option<NaiveDate> {
    let utc = dt.to_offset(UtcOffset::UTC);
    NaiveDate::from_ymd_opt(utc.year(), u8::from(utc.month()) as u32, utc.day() as u32)
}

/// W3C datetime without seconds: `2025-05-06T08:00+02:00` or `2025-05-06T08:00Z`.
fn parse_w3c_minutes(s: &str) -> Option<NaiveDate> {
    if let Some(naive) = s.strip_suffix('Z') {
        return NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M")
            .ok()
            .map(|dt| dt.date());
    }
    DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M%:z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// Parse `raw` and return its calendar date in UTC.
pub fn parse_date(raw: &str, format: &DateFormat) -> Result<NaiveDate, IngestError> {
    let s = raw.trim();
    let parsed = match format {
        DateFormat::Rfc2822 => OffsetDateTime::parse(s, &Rfc2822)
            .ok()
            .and_then(to_utc_date)
            // chrono is more lenient with obsolete zone names and single-digit days
            .or_else(|| {
                DateTime::parse_from_rfc2822(s)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc).date_naive())
            }),
        DateFormat::Iso8601 => OffsetDateTime::parse(s, &Rfc3339)
            .ok()
            .and_then(to_utc_date)
            .or_else(|| parse_w3c_minutes(s))
            .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
        DateFormat::Pattern(p) => DateTime::parse_from_str(s, p)
            .map(|dt| dt.with_timezone(&Utc).date_naive())
            .or_else(|_| NaiveDateTime::parse_from_str(s, p).map(|dt| dt.date()))
            .or_else(|_| NaiveDate::parse_from_str(s, p))
            .ok(),
    };
    parsed.ok_or_else(|| {
        IngestError::Parse(format!(
            "date {s:?} does not match format {}",
            String::from(format.clone())
        ))
    })
}

/// Only items dated today (UTC) are ingested; no backfill of older items.
pub fn is_current(date: NaiveDate, today: NaiveDate) -> bool {
    date == today
}

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn rfc2822_is_converted_to_utc_date() {
        let f = DateFormat::Rfc2822;
        assert_eq!(
            parse_date("Tue, 06 May 2025 14:03:00 GMT", &f).unwrap(),
            d(2025, 5, 6)
        );
        // 23:30 at -0500 is already the next day in UTC.
        assert_eq!(
            parse_date("Tue, 06 May 2025 23:30:00 -0500", &f).unwrap(),
            d(2025, 5, 7)
        );
    }

    #[test]
    fn iso8601_accepts_datetime_and_bare_date() {
        let f = DateFormat::Iso8601;
        assert_eq!(
            parse_date("2025-05-06T01:00:00+02:00", &f).unwrap(),
            d(2025, 5, 5)
        );
        assert_eq!(parse_date("2025-05-06", &f).unwrap(), d(2025, 5, 6));
    }

    #[test]
    fn w3c_datetime_without_seconds() {
        let f = DateFormat::from("w3c".to_string());
        assert_eq!(parse_date("2025-05-06T08:00+00:00", &f).unwrap(), d(2025, 5, 6));
        assert_eq!(parse_date("2025-05-06T08:00Z", &f).unwrap(), d(2025, 5, 6));
        assert_eq!(parse_date("2025-05-06T01:30+02:00", &f).unwrap(), d(2025, 5, 5));
        assert_eq!(parse_date("2025-05-06T22:15-05:00", &f).unwrap(), d(2025, 5, 7));
        assert!(parse_date("2025-05-06T08", &f).is_err());
    }

    #[test]
    fn custom_patterns_with_and_without_offset() {
        let naive = DateFormat::from("%d.%m.%Y %H:%M".to_string());
        assert_eq!(parse_date("06.05.2025 09:15", &naive).unwrap(), d(2025, 5, 6));

        let offset = DateFormat::Pattern("%Y-%m-%d %H:%M:%S %z".into());
        assert_eq!(
            parse_date("2025-05-06 22:00:00 -0300", &offset).unwrap(),
            d(2025, 5, 7)
        );

        let date_only = DateFormat::Pattern("%Y/%m/%d".into());
        assert_eq!(parse_date("2025/05/06", &date_only).unwrap(), d(2025, 5, 6));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse_date("yesterday-ish", &DateFormat::Rfc2822).unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
    }

    #[test]
    fn config_names_map_to_variants() {
        assert_eq!(DateFormat::from("RFC2822".to_string()), DateFormat::Rfc2822);
        assert_eq!(DateFormat::from("w3c".to_string()), DateFormat::Iso8601);
        assert_eq!(
            DateFormat::from("%Y".to_string()),
            DateFormat::Pattern("%Y".into())
        );
    }

    #[test]
    fn only_today_is_current() {
        let today = d(2025, 5, 6);
        assert!(is_current(d(2025, 5, 6), today));
        assert!(!is_current(d(2025, 5, 5), today));
        assert!(!is_current(d(2025, 5, 7), today));
    }
}
