use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};

use super::ingest::RawEventRecord;

/// Home port timezone of the fleet (UTC-5, no DST).
pub fn reference_offset() -> FixedOffset {
    FixedOffset::west_opt(5 * 3600).expect("valid offset")
}

/// Wall-clock "now" in the reference timezone. Pipeline functions take
/// the instant as a parameter instead of reading the clock themselves.
pub fn now_reference() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&reference_offset())
}

const DAY_FIRST_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

const DAY_FIRST_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y"];

const PERMISSIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const PERMISSIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

fn localize(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    naive.and_local_timezone(reference_offset()).single()
}

fn try_formats(raw: &str, formats: &[&str], date_formats: &[&str]) -> Option<DateTime<FixedOffset>> {
    for format in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return localize(naive);
        }
    }
    for format in date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return localize(date.and_hms_opt(0, 0, 0)?);
        }
    }
    None
}

// Day-first general parse. Offset-carrying inputs are converted to the
// reference timezone, everything else is interpreted in it.
fn parse_day_first(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&reference_offset()));
    }
    try_formats(raw, DAY_FIRST_FORMATS, DAY_FIRST_DATE_FORMATS)
}

fn parse_day_month_year(raw: &str) -> Option<DateTime<FixedOffset>> {
    NaiveDateTime::parse_from_str(raw, "%d/%m/%Y %H:%M:%S")
        .ok()
        .and_then(localize)
}

fn parse_month_day_year(raw: &str) -> Option<DateTime<FixedOffset>> {
    NaiveDateTime::parse_from_str(raw, "%m/%d/%Y %H:%M:%S")
        .ok()
        .and_then(localize)
}

fn parse_permissive(raw: &str) -> Option<DateTime<FixedOffset>> {
    try_formats(raw, PERMISSIVE_FORMATS, PERMISSIVE_DATE_FORMATS)
}

/// Parses a free-text timestamp, trying the four parser stages in
/// order. The first stage that yields a valid instant wins.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    parse_day_first(raw)
        .or_else(|| parse_day_month_year(raw))
        .or_else(|| parse_month_day_year(raw))
        .or_else(|| parse_permissive(raw))
}

/// A record whose timestamp parsed successfully.
#[derive(Debug, Clone)]
pub struct TimedRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub record: RawEventRecord,
}

/// Parses every record's timestamp and retains those inside the rolling
/// window `[now - window_hours, now]`. Records that fail all four
/// parser stages are dropped and counted in the diagnostics.
pub fn parse_and_filter(
    records: Vec<RawEventRecord>,
    window_hours: i64,
    now: DateTime<FixedOffset>,
    diagnostics: &mut Vec<String>,
) -> Vec<TimedRecord> {
    let total = records.len();
    let mut timed = Vec::with_capacity(total);
    let mut dropped = 0usize;

    for record in records {
        match parse_timestamp(&record.timestamp_raw) {
            Some(timestamp) => timed.push(TimedRecord { timestamp, record }),
            None => {
                log::debug!("unparseable timestamp: {:?}", record.timestamp_raw);
                dropped += 1;
            }
        }
    }

    diagnostics.push(format!("valid timestamps: {}/{}", timed.len(), total));
    if dropped > 0 {
        diagnostics.push(format!("dropped (unparseable timestamp): {dropped}"));
    }

    let window_start = now - Duration::hours(window_hours);
    diagnostics.push(format!(
        "window start: {}",
        window_start.format("%d/%m/%Y %H:%M:%S %z")
    ));
    diagnostics.push(format!("window end: {}", now.format("%d/%m/%Y %H:%M:%S %z")));

    let parsed = timed.len();
    timed.retain(|t| t.timestamp >= window_start);
    diagnostics.push(format!("records in window: {}/{}", timed.len(), parsed));

    timed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(timestamp_raw: &str) -> RawEventRecord {
        RawEventRecord {
            timestamp_raw: timestamp_raw.to_string(),
            area: "FLOTA ATUNERA (BARCO MILENA A)".to_string(),
            equipment: None,
            alert_type: None,
        }
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<FixedOffset> {
        reference_offset()
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .expect("valid datetime")
    }

    #[test]
    fn test_day_first_wins_for_ambiguous_dates() {
        // 03/02 must read as February 3rd, not March 2nd
        let parsed = parse_timestamp("03/02/2025 12:00:00").expect("should parse");
        assert_eq!(parsed, at(2025, 2, 3, 12, 0, 0));
    }

    #[test]
    fn test_month_day_year_fallback() {
        // Day-first cannot produce a month of 13, stage three catches it
        let parsed = parse_timestamp("02/13/2025 08:30:00").expect("should parse");
        assert_eq!(parsed, at(2025, 2, 13, 8, 30, 0));
    }

    #[test]
    fn test_rfc3339_converted_to_reference_zone() {
        let parsed = parse_timestamp("2025-02-03T12:00:00Z").expect("should parse");
        assert_eq!(parsed, at(2025, 2, 3, 7, 0, 0));
    }

    #[test]
    fn test_permissive_iso_and_date_only() {
        assert_eq!(
            parse_timestamp("2025-02-03 12:00:00"),
            Some(at(2025, 2, 3, 12, 0, 0))
        );
        assert_eq!(parse_timestamp("2025-02-03"), Some(at(2025, 2, 3, 0, 0, 0)));
        assert_eq!(parse_timestamp("03/02/2025"), Some(at(2025, 2, 3, 0, 0, 0)));
    }

    #[test]
    fn test_unparseable_returns_none() {
        assert_eq!(parse_timestamp("no es una fecha"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("99/99/9999 99:99:99"), None);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let now = at(2025, 2, 10, 12, 0, 0);
        let records = vec![
            record("09/02/2025 12:00:00"), // exactly now - 24h, included
            record("09/02/2025 11:59:59"), // one second earlier, excluded
            record("10/02/2025 11:00:00"),
        ];

        let mut diagnostics = Vec::new();
        let in_window = parse_and_filter(records, 24, now, &mut diagnostics);
        assert_eq!(in_window.len(), 2);
        assert!(in_window.iter().all(|t| t.timestamp >= now - Duration::hours(24)));
    }

    #[test]
    fn test_unparseable_records_dropped_and_counted() {
        let now = at(2025, 2, 10, 12, 0, 0);
        let records = vec![record("10/02/2025 11:00:00"), record("garbage")];

        let mut diagnostics = Vec::new();
        let in_window = parse_and_filter(records, 24, now, &mut diagnostics);
        assert_eq!(in_window.len(), 1);
        assert!(
            diagnostics.iter().any(|line| line.contains("dropped") && line.contains('1')),
            "{:?}",
            diagnostics
        );
        assert!(diagnostics.iter().any(|line| line.contains("valid timestamps: 1/2")));
    }

    #[test]
    fn test_diagnostics_record_window_bounds() {
        let now = at(2025, 2, 10, 12, 0, 0);
        let mut diagnostics = Vec::new();
        parse_and_filter(Vec::new(), 24, now, &mut diagnostics);
        assert!(diagnostics.iter().any(|line| line.starts_with("window start")));
        assert!(diagnostics.iter().any(|line| line.starts_with("window end")));
    }
}
