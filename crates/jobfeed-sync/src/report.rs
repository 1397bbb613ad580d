//! Optional per-run report: a markdown brief, the run summary as JSON, and a
//! parquet snapshot of the persisted dataset with a checksum manifest.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{ArrayRef, RecordBatch, StringArray};
use arrow_schema::{DataType, Field as ArrowField, Schema};
use jobfeed_core::{JobRecord, OUTPUT_COLUMNS};
use parquet::arrow::ArrowWriter;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::SyncRunSummary;

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotManifest {
    pub schema_version: u32,
    pub files: Vec<SnapshotManifestFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotManifestFile {
    pub name: String,
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

/// Writes `reports/<run_id>/` under `workspace_root` and returns that directory.
pub async fn write_run_report(
    workspace_root: &Path,
    summary: &SyncRunSummary,
    records: &[JobRecord],
) -> Result<PathBuf> {
    let reports_dir = workspace_root.join("reports").join(summary.run_id.to_string());
    fs::create_dir_all(&reports_dir)
        .await
        .with_context(|| format!("creating {}", reports_dir.display()))?;

    fs::write(reports_dir.join("daily_brief.md"), daily_brief_markdown(summary))
        .await
        .context("writing daily_brief.md")?;

    let summary_json = serde_json::to_vec_pretty(summary).context("serializing run summary")?;
    fs::write(reports_dir.join("run_summary.json"), summary_json)
        .await
        .context("writing run_summary.json")?;

    export_parquet_snapshot(&reports_dir, records).await?;
    Ok(reports_dir)
}

pub fn daily_brief_markdown(summary: &SyncRunSummary) -> String {
    let mut out = format!(
        "# Job Feed Daily Brief\n\n\
         - Run ID: `{}`\n\
         - Mode: {}\n\
         - Started: {}\n\
         - Finished: {}\n\
         - Enabled sources: {}\n\
         - Scraped: {} ({} unique)\n\
         - Prior records merged: {}\n\
         - Dropped as stale: {}\n\
         - Dropped as closed: {}\n\
         - Kept: {}\n\
         - Persisted: {}\n\n\
         ## Sources\n\n\
         | source | produced | normalized | status |\n\
         |---|---|---|---|\n",
        summary.run_id,
        summary.mode.as_str(),
        summary.started_at,
        summary.finished_at,
        summary.enabled_sources,
        summary.total_scraped,
        summary.unique_scraped,
        summary.prior_records,
        summary.dropped_stale,
        summary.dropped_closed,
        summary.kept,
        if summary.persisted { "yes" } else { "no" },
    );
    for (source_id, count) in &summary.per_source {
        let status = if count.failed { "failed" } else { "ok" };
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            source_id, count.produced, count.normalized, status
        ));
    }
    out
}

async fn export_parquet_snapshot(reports_dir: &Path, records: &[JobRecord]) -> Result<PathBuf> {
    let snapshot_dir = reports_dir.join("snapshots");
    fs::create_dir_all(&snapshot_dir)
        .await
        .with_context(|| format!("creating {}", snapshot_dir.display()))?;

    let jobs_path = snapshot_dir.join("jobs.parquet");
    write_jobs_parquet(&jobs_path, records)?;

    let manifest = SnapshotManifest {
        schema_version: 1,
        files: vec![manifest_entry("jobs", reports_dir, &jobs_path)?],
    };
    let manifest_path = snapshot_dir.join("manifest.json");
    let bytes = serde_json::to_vec_pretty(&manifest).context("serializing snapshot manifest")?;
    fs::write(&manifest_path, bytes)
        .await
        .with_context(|| format!("writing {}", manifest_path.display()))?;
    Ok(manifest_path)
}

fn write_jobs_parquet(path: &Path, records: &[JobRecord]) -> Result<()> {
    let schema = Arc::new(Schema::new(
        OUTPUT_COLUMNS
            .iter()
            .map(|name| ArrowField::new(*name, DataType::Utf8, false))
            .collect::<Vec<_>>(),
    ));

    let columns = (0..OUTPUT_COLUMNS.len())
        .map(|i| {
            let values = records.iter().map(|r| r.as_row()[i]).collect::<Vec<_>>();
            Arc::new(StringArray::from(values)) as ArrayRef
        })
        .collect::<Vec<ArrayRef>>();

    let batch = RecordBatch::try_new(schema, columns).context("building jobs record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .with_context(|| format!("opening parquet writer {}", path.display()))?;
    writer
        .write(&batch)
        .with_context(|| format!("writing record batch {}", path.display()))?;
    writer
        .close()
        .with_context(|| format!("closing parquet writer {}", path.display()))?;
    Ok(())
}

fn manifest_entry(name: &str, reports_dir: &Path, path: &Path) -> Result<SnapshotManifestFile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let sha256 = hex::encode(Sha256::digest(&bytes));
    let rel = path
        .strip_prefix(reports_dir)
        .unwrap_or(path)
        .display()
        .to_string();
    Ok(SnapshotManifestFile {
        name: name.to_string(),
        path: rel,
        sha256,
        bytes: bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MergeMode, SourceRunCount};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn summary() -> SyncRunSummary {
        let at = Utc.with_ymd_and_hms(2026, 2, 24, 12, 0, 0).single().unwrap();
        let mut per_source = BTreeMap::new();
        per_source.insert(
            "remotive".to_string(),
            SourceRunCount { produced: 3, normalized: 3, failed: false },
        );
        per_source.insert(
            "seek".to_string(),
            SourceRunCount { produced: 0, normalized: 0, failed: true },
        );
        SyncRunSummary {
            run_id: Uuid::nil(),
            mode: MergeMode::Merge,
            started_at: at,
            finished_at: at,
            enabled_sources: 2,
            total_scraped: 3,
            unique_scraped: 3,
            prior_records: 1,
            dropped_stale: 1,
            dropped_closed: 0,
            kept: 3,
            per_source,
            persisted: true,
            output_csv: "jobs.csv".into(),
            reports_dir: None,
        }
    }

    fn record(id: &str) -> JobRecord {
        JobRecord {
            id: id.into(),
            title: "Data Engineer".into(),
            company: "Acme".into(),
            url: format!("https://acme.com/jobs/{id}"),
            source: "Remotive".into(),
            posted_date: "2026-02-24T10:00:00Z".into(),
            scraped_at: "2026-02-24T11:00:00Z".into(),
            ..Default::default()
        }
    }

    #[test]
    fn brief_lists_every_source_with_status() {
        let md = daily_brief_markdown(&summary());
        assert!(md.contains("- Mode: merge"));
        assert!(md.contains("| remotive | 3 | 3 | ok |"));
        assert!(md.contains("| seek | 0 | 0 | failed |"));
    }

    #[tokio::test]
    async fn report_writes_brief_summary_and_checksummed_snapshot() {
        let dir = tempdir().unwrap();
        let reports_dir = write_run_report(dir.path(), &summary(), &[record("a1"), record("b2")])
            .await
            .unwrap();

        assert!(reports_dir.join("daily_brief.md").exists());
        assert!(reports_dir.join("run_summary.json").exists());

        let parquet_bytes = std::fs::read(reports_dir.join("snapshots/jobs.parquet")).unwrap();
        assert_eq!(&parquet_bytes[..4], b"PAR1");

        let manifest: serde_json::Value = serde_json::from_slice(
            &std::fs::read(reports_dir.join("snapshots/manifest.json")).unwrap(),
        )
        .unwrap();
        let entry = &manifest["files"][0];
        assert_eq!(entry["path"], "snapshots/jobs.parquet");
        assert_eq!(entry["bytes"], parquet_bytes.len() as u64);
        assert_eq!(entry["sha256"], hex::encode(Sha256::digest(&parquet_bytes)));
    }
}
