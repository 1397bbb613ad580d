//! Raw record → canonical `JobRecord` coercion and identity hashing.

use chrono::{DateTime, Utc};
use url::Url;

use crate::temporal::format_instant;
use crate::{JobRecord, RawRecord};

/// Length of the hex identity key.
pub const ID_LEN: usize = 12;

/// Collapses every whitespace run to one space and trims both ends.
pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic identity for a posting. Any two records with the same
/// `(title, company, url)` share an id, whatever their source.
pub fn id_for(title: &str, company: &str, url: &str) -> String {
    let digest = md5::compute(format!("{title}|{company}|{url}").as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(ID_LEN);
    hex
}

pub fn is_absolute_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

fn cleaned(value: Option<&str>) -> String {
    value.map(clean_text).unwrap_or_default()
}

fn required(value: Option<&str>) -> Option<String> {
    let text = cleaned(value);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Coerces a producer record into the canonical schema, or rejects it.
///
/// Rejection is silent: a record without title, company or an absolute
/// http(s) url is simply not a posting.
pub fn normalize(raw: &RawRecord, now: DateTime<Utc>) -> Option<JobRecord> {
    let title = required(raw.title.as_deref())?;
    let company = required(raw.company.as_deref())?;
    let url = required(raw.url.as_deref())?;
    if !is_absolute_http_url(&url) {
        return None;
    }

    let scraped_at = match required(raw.scraped_at.as_deref()) {
        Some(value) => value,
        None => format_instant(now),
    };

    Some(JobRecord {
        id: id_for(&title, &company, &url),
        location: cleaned(raw.location.as_deref()),
        salary: cleaned(raw.salary.as_deref()),
        source: clean_text(&raw.source),
        posted_date: cleaned(raw.posted_date.as_deref()),
        scraped_at,
        title,
        company,
        url,
    })
}
