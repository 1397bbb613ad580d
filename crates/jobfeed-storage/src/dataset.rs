//! The persisted dataset: `jobs.csv` (authoritative, read back on merge) and
//! `jobs.json` (a mirror with run metadata).

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use jobfeed_core::{JobRecord, OUTPUT_COLUMNS};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::write_atomic;

pub const CSV_FILE_NAME: &str = "jobs.csv";
pub const JSON_FILE_NAME: &str = "jobs.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDocument {
    pub last_updated: String,
    pub total_jobs: usize,
    pub jobs: Vec<JobRecord>,
}

#[derive(Debug, Clone)]
pub struct DatasetStore {
    dir: PathBuf,
}

impl DatasetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn csv_path(&self) -> PathBuf {
        self.dir.join(CSV_FILE_NAME)
    }

    pub fn json_path(&self) -> PathBuf {
        self.dir.join(JSON_FILE_NAME)
    }

    pub async fn prior_exists(&self) -> bool {
        fs::try_exists(self.csv_path()).await.unwrap_or(false)
    }

    /// Reads the prior dataset. `Ok(None)` when there is no file yet; any read
    /// or decode problem is an error the caller may choose to swallow.
    pub async fn load_prior(&self) -> Result<Option<Vec<JobRecord>>> {
        let path = self.csv_path();
        if !self.prior_exists().await {
            return Ok(None);
        }
        let bytes = fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let records = decode_csv(&bytes).with_context(|| format!("decoding {}", path.display()))?;
        Ok(Some(records))
    }

    /// Writes both files atomically. Failure here is the one fatal error of a run.
    pub async fn save(&self, records: &[JobRecord], last_updated: DateTime<Utc>) -> Result<()> {
        let csv = encode_csv(records)?;
        write_atomic(&self.csv_path(), &csv).await?;

        let document = DatasetDocument {
            last_updated: last_updated.to_rfc3339_opts(SecondsFormat::Secs, true),
            total_jobs: records.len(),
            jobs: records.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&document).context("serializing jobs.json")?;
        write_atomic(&self.json_path(), &json).await?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Header row plus one row per record, every field quoted.
pub fn encode_csv(records: &[JobRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer
        .write_record(OUTPUT_COLUMNS)
        .context("writing csv header")?;
    for record in records {
        writer
            .write_record(record.as_row())
            .with_context(|| format!("writing csv row {}", record.id))?;
    }
    writer
        .into_inner()
        .map_err(|err| anyhow!("finishing csv buffer: {}", err.error()))
}

/// Columns are matched by header name: unknown legacy columns are ignored and
/// missing ones come back as empty strings.
pub fn decode_csv(bytes: &[u8]) -> Result<Vec<JobRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);
    reader
        .deserialize::<JobRecord>()
        .collect::<Result<Vec<_>, _>>()
        .context("deserializing csv rows")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn record(id: &str, title: &str) -> JobRecord {
        JobRecord {
            id: id.into(),
            title: title.into(),
            company: "Acme".into(),
            location: "Remote".into(),
            salary: String::new(),
            url: format!("https://acme.com/jobs/{id}"),
            source: "Remotive".into(),
            posted_date: "2026-02-24T10:00:00Z".into(),
            scraped_at: "2026-02-24T11:00:00Z".into(),
        }
    }

    #[test]
    fn csv_quotes_every_value_including_empty() {
        let bytes = encode_csv(&[record("abc123def456", "Data, Engineer")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(r#""id","title","company","location","salary","url","source","posted_date","scraped_at""#)
        );
        assert_eq!(
            lines.next(),
            Some(r#""abc123def456","Data, Engineer","Acme","Remote","","https://acme.com/jobs/abc123def456","Remotive","2026-02-24T10:00:00Z","2026-02-24T11:00:00Z""#)
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_dataset_still_has_header() {
        let text = String::from_utf8(encode_csv(&[]).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn legacy_columns_are_dropped_and_missing_ones_filled() {
        let legacy = "\"id\",\"title\",\"company\",\"url\",\"description\"\n\
                      \"a1\",\"Data Engineer\",\"Acme\",\"https://acme.com/jobs/1\",\"long text\"\n";
        let records = decode_csv(legacy.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "a1");
        assert_eq!(records[0].salary, "");
        assert_eq!(records[0].posted_date, "");
    }

    #[test]
    fn ragged_csv_is_an_error() {
        let broken = "id,title\n\"a1\",\"x\",\"extra\"\n";
        assert!(decode_csv(broken.as_bytes()).is_err());
    }

    #[tokio::test]
    async fn save_then_load_roundtrips_and_mirrors_json() {
        let dir = tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        assert!(store.load_prior().await.unwrap().is_none());

        let records = vec![record("b2", "Backend Engineer"), record("a1", "Data Engineer")];
        let at = Utc.with_ymd_and_hms(2026, 2, 24, 12, 0, 0).single().unwrap();
        store.save(&records, at).await.unwrap();

        let loaded = store.load_prior().await.unwrap().unwrap();
        assert_eq!(loaded, records);

        let doc: DatasetDocument =
            serde_json::from_slice(&std::fs::read(store.json_path()).unwrap()).unwrap();
        assert_eq!(doc.total_jobs, 2);
        assert_eq!(doc.last_updated, "2026-02-24T12:00:00Z");
        assert_eq!(doc.jobs, records);
    }
}
