use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalRange {
    pub earliest: NaiveDateTime,
    pub latest: NaiveDateTime,
    pub span_days: f64,
}

static RE_DATE_PREFIX: OnceLock<Regex> = OnceLock::new();

fn re_date_prefix() -> &'static Regex { RE_DATE_PREFIX.get_or_init(|| Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}").unwrap()) }

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// ISO-like dates and datetimes; offsets are normalised to UTC.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let t = s.trim();
    if !re_date_prefix().is_match(t) {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(t, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(t, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub struct TemporalAccumulator {
    min: Option<NaiveDateTime>,
    max: Option<NaiveDateTime>,
}

impl TemporalAccumulator {
    pub fn new() -> Self { Self { min: None, max: None } }
    pub fn add(&mut self, ts: NaiveDateTime) {
        self.min = Some(self.min.map_or(ts, |m| m.min(ts)));
        self.max = Some(self.max.map_or(ts, |m| m.max(ts)));
    }
    pub fn finish(self) -> Option<TemporalRange> {
        let (earliest, latest) = (self.min?, self.max?);
        let span_days = (latest - earliest).num_seconds() as f64 / 86_400.0;
        Some(TemporalRange { earliest, latest, span_days })
    }
}

impl Default for TemporalAccumulator {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests_temporal {
    use super::*;

    #[test] fn date_only() { assert!(parse_datetime("2024-03-01").is_some()); }
    #[test] fn slashed() { assert!(parse_datetime("2024/03/01").is_some()); }
    #[test] fn with_time() { assert!(parse_datetime("2024-03-01 12:30:00").is_some()); }
    #[test] fn rfc3339_offset() { let t = parse_datetime("2024-03-01T12:00:00+02:00").unwrap(); assert_eq!(t.to_string(), "2024-03-01 10:00:00"); }
    #[test] fn not_a_date() { assert!(parse_datetime("March").is_none()); assert!(parse_datetime("2024").is_none()); }
    #[test] fn invalid_day() { assert!(parse_datetime("2024-02-30").is_none()); }
    #[test] fn range_span() {
        let mut acc = TemporalAccumulator::new();
        acc.add(parse_datetime("2024-01-11").unwrap());
        acc.add(parse_datetime("2024-01-01").unwrap());
        let r = acc.finish().unwrap();
        assert_eq!(r.span_days, 10.0);
        assert_eq!(r.earliest.to_string(), "2024-01-01 00:00:00");
    }
}
