//! Lenient reading of the free-form date strings carried on grades,
//! assignments and students.
//!
//! A value that is missing, blank, unparsable, or lands exactly on the Unix
//! epoch is treated as "no date" and comes back as `None`. `Option`'s
//! ordering puts `None` before every date, so sorting on these keys files
//! undated records as the earliest ones without a sentinel timestamp.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

pub fn parse_lenient(raw: Option<&str>) -> Option<NaiveDateTime> {
    let t = raw?.trim();
    if t.is_empty() {
        return None;
    }

    let parsed = if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        Some(d.and_time(NaiveTime::MIN))
    } else if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        Some(dt.naive_utc())
    } else {
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(t, fmt).ok())
    }?;

    if parsed.and_utc().timestamp_millis() == 0 {
        return None;
    }
    Some(parsed)
}

pub fn parse_day(raw: Option<&str>) -> Option<NaiveDate> {
    parse_lenient(raw).map(|dt| dt.date())
}

/// Short chart label (`"Mar 04"`), or `"Invalid Date"` when the value has no
/// usable date.
pub fn chart_label(raw: Option<&str>) -> String {
    match parse_lenient(raw) {
        Some(dt) => dt.format("%b %d").to_string(),
        None => "Invalid Date".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_day_and_timestamp_forms() {
        let d = parse_lenient(Some("2024-03-04")).expect("date only");
        assert_eq!(d.to_string(), "2024-03-04 00:00:00");

        let d = parse_lenient(Some("2024-03-04T10:15:00Z")).expect("rfc3339");
        assert_eq!(d.to_string(), "2024-03-04 10:15:00");

        let d = parse_lenient(Some("2024-03-04T10:15:30.250")).expect("naive");
        assert_eq!(d.date(), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[test]
    fn garbage_blank_and_epoch_are_absent() {
        assert_eq!(parse_lenient(None), None);
        assert_eq!(parse_lenient(Some("")), None);
        assert_eq!(parse_lenient(Some("   ")), None);
        assert_eq!(parse_lenient(Some("not a date")), None);
        assert_eq!(parse_lenient(Some("2024-13-40")), None);
        assert_eq!(parse_lenient(Some("1970-01-01")), None);
        assert_eq!(parse_lenient(Some("1970-01-01T00:00:00Z")), None);
        assert!(parse_lenient(Some("1970-01-01T00:00:01Z")).is_some());
    }

    #[test]
    fn absent_dates_sort_first() {
        let mut keys = vec![
            parse_lenient(Some("2024-02-01")),
            parse_lenient(Some("bogus")),
            parse_lenient(Some("2023-12-31")),
        ];
        keys.sort();
        assert_eq!(keys[0], None);
        assert_eq!(keys[1].map(|d| d.date().to_string()).as_deref(), Some("2023-12-31"));
    }

    #[test]
    fn chart_label_formats_or_flags_invalid() {
        assert_eq!(chart_label(Some("2024-03-04")), "Mar 04");
        assert_eq!(chart_label(Some("yesterday")), "Invalid Date");
        assert_eq!(chart_label(None), "Invalid Date");
    }
}
