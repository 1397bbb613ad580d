//! Aggregation and merge engine: collect from every enabled producer,
//! normalize, dedup, merge with the prior dataset, filter, persist.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jobfeed_adapters::{
    default_producers, producer_for_source, Crawlability, ProducerContext, ProducerCredentials,
    SourceProducer,
};
use jobfeed_core::{
    format_instant, is_recent, normalize, parse_instant, JobRecord, KeywordRules, TextClassifier,
};
use jobfeed_storage::{
    ArtifactStore, DatasetStore, HttpClientConfig, HttpFetcher, LivenessCheck, LivenessProber,
};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

mod probe_cache;
pub mod report;

pub use probe_cache::ProbeCache;

pub const CRATE_NAME: &str = "jobfeed-sync";

pub const DEFAULT_MAX_JOB_AGE_HOURS: i64 = 24;
pub const DEFAULT_OPEN_CHECK_TIMEOUT_SECS: u64 = 6;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Deserialize)]
pub struct SourceRegistry {
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub source_id: String,
    pub display_name: String,
    pub enabled: bool,
    pub crawlability: Crawlability,
}

impl SourceRegistry {
    /// Every built-in producer, enabled, in default order.
    pub fn builtin() -> Self {
        let sources = default_producers()
            .iter()
            .map(|p| SourceConfig {
                source_id: p.source_id().to_string(),
                display_name: p.source_id().to_string(),
                enabled: true,
                crawlability: p.crawlability(),
            })
            .collect();
        Self { sources }
    }

    /// Reads `sources.yaml` under `workspace_root`, falling back to
    /// [`SourceRegistry::builtin`] when the file does not exist.
    pub async fn load(workspace_root: &Path) -> Result<Self> {
        let path = workspace_root.join("sources.yaml");
        if !fs::try_exists(&path).await.unwrap_or(false) {
            debug!(path = %path.display(), "no source registry file; using built-in sources");
            return Ok(Self::builtin());
        }
        let text = fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Like [`SourceRegistry::load`], but an unreadable or malformed file is
    /// logged and replaced by the built-in registry.
    pub async fn load_or_builtin(workspace_root: &Path) -> Self {
        match Self::load(workspace_root).await {
            Ok(registry) => registry,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "invalid source registry; using built-in sources");
                Self::builtin()
            }
        }
    }

    /// Producers for the enabled entries, in file order. Unknown ids are skipped.
    pub fn producers(&self) -> Vec<Box<dyn SourceProducer>> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .filter_map(|s| {
                let Some(producer) = producer_for_source(&s.source_id) else {
                    warn!(source_id = %s.source_id, "no producer registered for source; skipping");
                    return None;
                };
                if producer.crawlability() != s.crawlability {
                    warn!(
                        source_id = %s.source_id,
                        configured = ?s.crawlability,
                        actual = ?producer.crawlability(),
                        "registry crawlability does not match producer"
                    );
                }
                debug!(source_id = %s.source_id, display_name = %s.display_name, "source enabled");
                Some(producer)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub max_job_age_hours: i64,
    pub open_check_enabled: bool,
    pub open_check_timeout_secs: u64,
    pub output_dir: PathBuf,
    pub workspace_root: PathBuf,
    pub rules_path: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub http_timeout_secs: u64,
    pub archive_dir: Option<PathBuf>,
    pub reports_enabled: bool,
    pub credentials: ProducerCredentials,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            max_job_age_hours: non_empty("MAX_JOB_AGE_HOURS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_MAX_JOB_AGE_HOURS),
            open_check_enabled: lookup("OPEN_CHECK_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            open_check_timeout_secs: non_empty("OPEN_CHECK_TIMEOUT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_OPEN_CHECK_TIMEOUT_SECS),
            output_dir: non_empty("JOBFEED_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            workspace_root: non_empty("JOBFEED_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            rules_path: non_empty("JOBFEED_RULES_PATH").map(PathBuf::from),
            user_agent: non_empty("JOBFEED_USER_AGENT"),
            http_timeout_secs: non_empty("JOBFEED_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            archive_dir: non_empty("JOBFEED_ARCHIVE_DIR").map(PathBuf::from),
            reports_enabled: lookup("JOBFEED_REPORTS_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            credentials: ProducerCredentials {
                adzuna_app_id: non_empty("ADZUNA_APP_ID"),
                adzuna_app_key: non_empty("ADZUNA_APP_KEY"),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// This run's records replace the dataset.
    Replace,
    /// This run's records are unioned with the prior dataset; this run wins on id.
    Merge,
}

impl MergeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Merge => "merge",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceRunCount {
    pub produced: usize,
    pub normalized: usize,
    pub failed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncRunSummary {
    pub run_id: Uuid,
    pub mode: MergeMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub enabled_sources: usize,
    pub total_scraped: usize,
    pub unique_scraped: usize,
    pub prior_records: usize,
    pub dropped_stale: usize,
    pub dropped_closed: usize,
    pub kept: usize,
    pub per_source: BTreeMap<String, SourceRunCount>,
    pub persisted: bool,
    pub output_csv: String,
    pub reports_dir: Option<String>,
}

/// Keeps the first record for each id, preserving order.
pub fn dedup_by_id(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}

/// Stable descending sort. The canonical timestamp format is fixed-width, so
/// string order is chronological order.
fn sort_desc_by<F>(records: &mut [JobRecord], key: F)
where
    F: Fn(&JobRecord) -> &str,
{
    records.sort_by(|a, b| key(b).cmp(key(a)));
}

#[derive(Debug, Default)]
struct FilterOutcome {
    kept: Vec<JobRecord>,
    dropped_stale: usize,
    dropped_closed: usize,
}

pub struct SyncPipeline {
    config: SyncConfig,
    classifier: TextClassifier,
    http: HttpFetcher,
    archive: Option<ArtifactStore>,
    dataset: DatasetStore,
    liveness: Box<dyn LivenessCheck>,
    producers: Option<Vec<Box<dyn SourceProducer>>>,
}

impl SyncPipeline {
    pub fn new(config: SyncConfig) -> Result<Self> {
        let rules = match &config.rules_path {
            Some(path) => KeywordRules::from_path(path)?,
            None => KeywordRules::embedded()?,
        };
        let classifier = TextClassifier::new(&rules)?;

        let http = HttpFetcher::new(HttpClientConfig {
            timeout: Duration::from_secs(config.http_timeout_secs),
            user_agent: config.user_agent.clone(),
            ..Default::default()
        })?;
        let liveness = LivenessProber::new(
            Duration::from_secs(config.open_check_timeout_secs),
            config.user_agent.as_deref(),
            classifier.closed_url_markers().to_vec(),
        )?;

        Ok(Self {
            archive: config.archive_dir.clone().map(ArtifactStore::new),
            dataset: DatasetStore::new(config.output_dir.clone()),
            liveness: Box::new(liveness),
            producers: None,
            classifier,
            http,
            config,
        })
    }

    /// Replaces the registry-driven producer list.
    pub fn with_producers(mut self, producers: Vec<Box<dyn SourceProducer>>) -> Self {
        self.producers = Some(producers);
        self
    }

    pub fn with_liveness(mut self, liveness: Box<dyn LivenessCheck>) -> Self {
        self.liveness = liveness;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub async fn run_once(&self, mode: MergeMode) -> Result<SyncRunSummary> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let span = info_span!("sync_run", %run_id, mode = mode.as_str());
        self.run_inner(run_id, started_at, mode).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        now: DateTime<Utc>,
        mode: MergeMode,
    ) -> Result<SyncRunSummary> {
        let registry_producers;
        let producers: &[Box<dyn SourceProducer>] = match &self.producers {
            Some(p) => p,
            None => {
                let registry = SourceRegistry::load_or_builtin(&self.config.workspace_root).await;
                registry_producers = registry.producers();
                &registry_producers
            }
        };
        info!(
            enabled_sources = producers.len(),
            max_job_age_hours = self.config.max_job_age_hours,
            open_check = self.config.open_check_enabled,
            "starting sync run"
        );

        let (scraped, per_source) = self.collect(run_id, now, producers).await;
        let total_scraped = scraped.len();

        let mut records = dedup_by_id(scraped);
        let unique_scraped = records.len();
        sort_desc_by(&mut records, |r| r.scraped_at.as_str());

        let prior_available = mode == MergeMode::Merge && self.dataset.prior_exists().await;
        if total_scraped == 0 && !prior_available {
            warn!("no jobs scraped and no prior dataset to merge; leaving output untouched");
            return Ok(SyncRunSummary {
                run_id,
                mode,
                started_at: now,
                finished_at: Utc::now(),
                enabled_sources: producers.len(),
                total_scraped,
                unique_scraped,
                prior_records: 0,
                dropped_stale: 0,
                dropped_closed: 0,
                kept: 0,
                per_source,
                persisted: false,
                output_csv: self.dataset.csv_path().display().to_string(),
                reports_dir: None,
            });
        }

        let mut prior_records = 0;
        if mode == MergeMode::Merge {
            match self.dataset.load_prior().await {
                Ok(Some(prior)) => {
                    prior_records = prior.len();
                    records.extend(prior);
                    records = dedup_by_id(records);
                    info!(prior_records, merged = records.len(), "merged with prior dataset");
                }
                Ok(None) => {}
                Err(err) => warn!(error = %format!("{err:#}"), "prior dataset unreadable; treating as empty"),
            }
        }

        records.retain(|r| !r.id.is_empty());
        let records = dedup_by_id(records);

        let filtered = self.filter(records, now).await;
        let mut kept = filtered.kept;
        sort_desc_by(&mut kept, |r| r.posted_date.as_str());
        let kept = dedup_by_id(kept);
        info!(
            start = unique_scraped,
            dropped_old = filtered.dropped_stale,
            dropped_closed = filtered.dropped_closed,
            kept = kept.len(),
            "filtering summary"
        );

        self.dataset
            .save(&kept, Utc::now())
            .await
            .with_context(|| format!("persisting dataset to {}", self.dataset.dir().display()))?;
        info!(path = %self.dataset.csv_path().display(), jobs = kept.len(), "saved dataset");

        let mut summary = SyncRunSummary {
            run_id,
            mode,
            started_at: now,
            finished_at: Utc::now(),
            enabled_sources: producers.len(),
            total_scraped,
            unique_scraped,
            prior_records,
            dropped_stale: filtered.dropped_stale,
            dropped_closed: filtered.dropped_closed,
            kept: kept.len(),
            per_source,
            persisted: true,
            output_csv: self.dataset.csv_path().display().to_string(),
            reports_dir: None,
        };

        if self.config.reports_enabled {
            match report::write_run_report(&self.config.workspace_root, &summary, &kept).await {
                Ok(dir) => summary.reports_dir = Some(dir.display().to_string()),
                Err(err) => warn!(error = %format!("{err:#}"), "run report failed"),
            }
        }
        Ok(summary)
    }

    /// Runs every producer in order. A failing producer contributes nothing.
    async fn collect(
        &self,
        run_id: Uuid,
        now: DateTime<Utc>,
        producers: &[Box<dyn SourceProducer>],
    ) -> (Vec<JobRecord>, BTreeMap<String, SourceRunCount>) {
        let ctx = ProducerContext {
            run_id,
            fetched_at: now,
            http: &self.http,
            classifier: &self.classifier,
            credentials: &self.config.credentials,
            archive: self.archive.as_ref(),
        };

        let mut scraped = Vec::new();
        let mut per_source = BTreeMap::new();
        for producer in producers {
            let source_id = producer.source_id();
            let span = info_span!("produce", source_id);
            let count = match producer.produce(&ctx).instrument(span).await {
                Ok(raws) => {
                    let before = scraped.len();
                    scraped.extend(raws.iter().filter_map(|raw| normalize(raw, now)));
                    let normalized = scraped.len() - before;
                    info!(source_id, produced = raws.len(), normalized, "source collected");
                    SourceRunCount {
                        produced: raws.len(),
                        normalized,
                        failed: false,
                    }
                }
                Err(err) => {
                    warn!(source_id, error = %err, "source failed; continuing without it");
                    SourceRunCount {
                        failed: true,
                        ..Default::default()
                    }
                }
            };
            per_source.insert(source_id.to_string(), count);
        }
        (scraped, per_source)
    }

    async fn filter(&self, records: Vec<JobRecord>, now: DateTime<Utc>) -> FilterOutcome {
        let cache = ProbeCache::new();
        let mut outcome = FilterOutcome::default();

        for mut record in records {
            let posted = parse_instant(&record.posted_date).or_else(|| parse_instant(&record.scraped_at));
            let posted = match posted {
                Some(p) if is_recent(Some(p), self.config.max_job_age_hours, now) => p,
                _ => {
                    debug!(id = %record.id, posted_date = %record.posted_date, "dropping stale record");
                    outcome.dropped_stale += 1;
                    continue;
                }
            };

            if self.config.open_check_enabled && !cache.is_open(&record.url, &*self.liveness).await {
                debug!(id = %record.id, url = %record.url, "dropping closed record");
                outcome.dropped_closed += 1;
                continue;
            }

            let scraped = parse_instant(&record.scraped_at).unwrap_or(now);
            record.posted_date = format_instant(posted);
            record.scraped_at = format_instant(scraped);
            outcome.kept.push(record);
        }
        outcome
    }
}

pub async fn run_sync_once_from_env(mode: MergeMode) -> Result<SyncRunSummary> {
    let pipeline = SyncPipeline::new(SyncConfig::from_env())?;
    pipeline.run_once(mode).await
}
