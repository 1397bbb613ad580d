//! Timestamp resolution: heterogeneous source dates → one UTC instant.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::normalize::clean_text;

/// Fixed-width persisted form. Lexicographic order equals chronological order.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const ISO_OFFSET_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const ISO_NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const BARE_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Parses ISO-8601, then RFC-822, then bare dates. `None` means "no valid time".
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let raw = clean_text(text);
    if raw.is_empty() {
        return None;
    }
    parse_iso(&raw)
        .or_else(|| parse_rfc2822(&raw))
        .or_else(|| parse_bare_date(&raw))
}

fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    let iso = match raw.strip_suffix(&['Z', 'z'][..]) {
        Some(head) => format!("{head}+00:00"),
        None => raw.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&iso) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ISO_OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&iso, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ISO_NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&iso, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn parse_rfc2822(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_bare_date(raw: &str) -> Option<DateTime<Utc>> {
    BARE_DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(raw, fmt)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    })
}

/// Renders the canonical `YYYY-MM-DDTHH:MM:SSZ` form, dropping sub-seconds.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format(CANONICAL_FORMAT).to_string()
}

/// True iff `instant` is present and no older than `max_age_hours` at `now`.
///
/// Future instants count as recent; callers rely on that behavior staying put.
pub fn is_recent(instant: Option<DateTime<Utc>>, max_age_hours: i64, now: DateTime<Utc>) -> bool {
    let Some(instant) = instant else {
        return false;
    };
    let window = Duration::try_hours(max_age_hours).unwrap_or(Duration::MAX);
    now.signed_duration_since(instant) <= window
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single().unwrap()
    }

    #[test]
    fn parses_iso_with_z_suffix() {
        let parsed = parse_instant("2026-02-24T12:34:56Z").unwrap();
        assert_eq!(parsed, utc(2026, 2, 24, 12, 34, 56));
        assert_eq!(format_instant(parsed), "2026-02-24T12:34:56Z");
    }

    #[test]
    fn parses_iso_with_offset_into_utc() {
        let parsed = parse_instant("2026-02-24T15:34:56+03:00").unwrap();
        assert_eq!(format_instant(parsed), "2026-02-24T12:34:56Z");

        let compact = parse_instant("2026-02-24T07:34:56-0500").unwrap();
        assert_eq!(format_instant(compact), "2026-02-24T12:34:56Z");
    }

    #[test]
    fn naive_iso_is_assumed_utc() {
        assert_eq!(
            parse_instant("2026-02-24T12:34:56").unwrap(),
            utc(2026, 2, 24, 12, 34, 56)
        );
        assert_eq!(
            parse_instant("2026-02-24 12:34:56.789123").map(format_instant).as_deref(),
            Some("2026-02-24T12:34:56Z")
        );
        assert_eq!(
            parse_instant("2026-02-24T12:34").unwrap(),
            utc(2026, 2, 24, 12, 34, 0)
        );
    }

    #[test]
    fn parses_rfc822_feed_dates() {
        let parsed = parse_instant("Tue, 24 Feb 2026 12:34:56 +0000").unwrap();
        assert_eq!(format_instant(parsed), "2026-02-24T12:34:56Z");

        let gmt = parse_instant("Tue, 24 Feb 2026 14:34:56 +0200").unwrap();
        assert_eq!(format_instant(gmt), "2026-02-24T12:34:56Z");
    }

    #[test]
    fn parses_bare_dates_as_midnight() {
        assert_eq!(parse_instant("2026-02-24").unwrap(), utc(2026, 2, 24, 0, 0, 0));
        assert_eq!(parse_instant("2026/02/24").unwrap(), utc(2026, 2, 24, 0, 0, 0));
    }

    #[test]
    fn unparseable_is_none_not_error() {
        assert!(parse_instant("").is_none());
        assert!(parse_instant("   ").is_none());
        assert!(parse_instant("yesterday").is_none());
        assert!(parse_instant("24/02/2026").is_none());
        assert!(parse_instant("2026-13-45").is_none());
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(
            parse_instant("  2026-02-24T12:34:56Z \n").unwrap(),
            utc(2026, 2, 24, 12, 34, 56)
        );
    }

    #[test]
    fn recency_boundary_is_inclusive() {
        let now = utc(2026, 2, 24, 12, 0, 0);
        let cutoff = now - Duration::hours(24);
        assert!(is_recent(Some(cutoff), 24, now));
        assert!(!is_recent(Some(cutoff - Duration::microseconds(1)), 24, now));
        assert!(is_recent(Some(now - Duration::hours(1)), 24, now));
    }

    #[test]
    fn missing_instant_is_never_recent() {
        assert!(!is_recent(None, 24, utc(2026, 2, 24, 12, 0, 0)));
    }

    #[test]
    fn future_instants_count_as_recent() {
        // Observed behavior: there is no upper bound on posted dates.
        let now = utc(2026, 2, 24, 12, 0, 0);
        assert!(is_recent(Some(now + Duration::days(365)), 24, now));
    }
}
