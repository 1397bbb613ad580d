//! Core domain model for jobfeed: canonical job records plus the pure
//! normalization, classification and temporal helpers the pipeline shares.

use serde::{Deserialize, Serialize};

pub mod classify;
pub mod normalize;
pub mod temporal;

pub use classify::{ClassifierError, KeywordRules, TextClassifier};
pub use normalize::{clean_text, id_for, is_absolute_http_url, normalize};
pub use temporal::{format_instant, is_recent, parse_instant, CANONICAL_FORMAT};

pub const CRATE_NAME: &str = "jobfeed-core";

/// Persisted column order. Every dataset file carries exactly these columns.
pub const OUTPUT_COLUMNS: [&str; 9] = [
    "id",
    "title",
    "company",
    "location",
    "salary",
    "url",
    "source",
    "posted_date",
    "scraped_at",
];

/// Loosely-shaped candidate emitted by a source producer before normalization.
///
/// Missing and empty values are equivalent; the normalizer decides what survives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawRecord {
    pub source: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub url: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub posted_date: Option<String>,
    pub scraped_at: Option<String>,
}

impl RawRecord {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, value: impl Into<String>) -> Self {
        self.title = Some(value.into());
        self
    }

    pub fn company(mut self, value: impl Into<String>) -> Self {
        self.company = Some(value.into());
        self
    }

    pub fn url(mut self, value: impl Into<String>) -> Self {
        self.url = Some(value.into());
        self
    }

    pub fn location(mut self, value: impl Into<String>) -> Self {
        self.location = Some(value.into());
        self
    }

    pub fn salary(mut self, value: impl Into<String>) -> Self {
        self.salary = Some(value.into());
        self
    }

    pub fn posted_date(mut self, value: impl Into<String>) -> Self {
        self.posted_date = Some(value.into());
        self
    }
}

/// Canonical job posting. Empty string is the "absent" value for every field.
///
/// `#[serde(default)]` lets legacy dataset files with missing columns load;
/// unknown columns are ignored, so a load always yields the canonical field set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub url: String,
    pub source: String,
    pub posted_date: String,
    pub scraped_at: String,
}

impl JobRecord {
    /// Field values in `OUTPUT_COLUMNS` order.
    pub fn as_row(&self) -> [&str; 9] {
        [
            &self.id,
            &self.title,
            &self.company,
            &self.location,
            &self.salary,
            &self.url,
            &self.source,
            &self.posted_date,
            &self.scraped_at,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_order_matches_output_columns() {
        let record = JobRecord {
            id: "id".into(),
            title: "title".into(),
            company: "company".into(),
            location: "location".into(),
            salary: "salary".into(),
            url: "url".into(),
            source: "source".into(),
            posted_date: "posted_date".into(),
            scraped_at: "scraped_at".into(),
        };
        assert_eq!(record.as_row(), OUTPUT_COLUMNS);
    }

    #[test]
    fn missing_fields_deserialize_as_empty_strings() {
        let record: JobRecord =
            serde_json::from_str(r#"{"id":"abc","title":"Data Engineer","legacy":"x"}"#)
                .expect("legacy json");
        assert_eq!(record.id, "abc");
        assert_eq!(record.salary, "");
        assert_eq!(record.scraped_at, "");
    }
}
