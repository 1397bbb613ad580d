//! Source producer contract, registry, and the built-in producers.
//!
//! A producer fetches one provider and yields raw candidates. Fetching and
//! parsing are split: every `parse_*` function is pure over the fetched text
//! so it can be exercised against captured fixtures.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobfeed_core::{RawRecord, TextClassifier};
use jobfeed_storage::{
    extension_for_content_type, without_query, ArtifactStore, FetchError, HttpFetcher,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

mod html;
pub mod sources;

pub use sources::adzuna::{parse_adzuna, AdzunaProducer};
pub use sources::github_ausjobs::{parse_github_ausjobs, GithubAusJobsProducer};
pub use sources::gradconnection::{parse_gradconnection, GradConnectionProducer};
pub use sources::linkedin::{parse_linkedin, LinkedInProducer};
pub use sources::remoteok::{parse_remoteok, RemoteOkProducer};
pub use sources::remotive::{parse_remotive, RemotiveProducer};
pub use sources::seek::{parse_seek, SeekProducer};
pub use sources::weworkremotely::{parse_weworkremotely, WeWorkRemotelyProducer};

pub const CRATE_NAME: &str = "jobfeed-adapters";

/// Registry order. Earlier sources win identity-key ties within a run.
pub const DEFAULT_SOURCE_IDS: [&str; 8] = [
    "github-ausjobs",
    "seek",
    "adzuna",
    "linkedin",
    "gradconnection",
    "remoteok",
    "remotive",
    "weworkremotely",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crawlability {
    PublicHtml,
    Api,
    Rss,
    Markdown,
}

#[derive(Debug, Clone, Default)]
pub struct ProducerCredentials {
    pub adzuna_app_id: Option<String>,
    pub adzuna_app_key: Option<String>,
}

/// Everything a producer may use during one run.
pub struct ProducerContext<'a> {
    pub run_id: Uuid,
    pub fetched_at: DateTime<Utc>,
    pub http: &'a HttpFetcher,
    pub classifier: &'a TextClassifier,
    pub credentials: &'a ProducerCredentials,
    pub archive: Option<&'a ArtifactStore>,
}

impl ProducerContext<'_> {
    /// GETs `url` and archives the payload when an archive is configured.
    /// Archive failures are logged and never fail the fetch.
    pub async fn fetch_text(&self, source_id: &str, url: &str) -> Result<String, ProducerError> {
        let resp = self.http.fetch_bytes(self.run_id, source_id, url).await?;
        if let Some(archive) = self.archive {
            let ext = extension_for_content_type(resp.content_type.as_deref());
            if let Err(err) = archive
                .archive_payload(self.fetched_at, source_id, ext, &resp.body)
                .await
            {
                warn!(source_id, url = %without_query(url), error = %err, "failed to archive payload");
            }
        }
        Ok(resp.text())
    }
}

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("parsing {source_id} payload: {message}")]
    Parse {
        source_id: &'static str,
        message: String,
    },
}

impl ProducerError {
    pub fn parse(source_id: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            source_id,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait SourceProducer: Send + Sync {
    fn source_id(&self) -> &'static str;
    fn crawlability(&self) -> Crawlability;

    /// Yields this source's candidates. An `Err` means the whole source is
    /// unavailable for this run; callers treat it as zero records.
    async fn produce(&self, ctx: &ProducerContext<'_>) -> Result<Vec<RawRecord>, ProducerError>;
}

pub fn default_source_ids() -> &'static [&'static str] {
    &DEFAULT_SOURCE_IDS
}

pub fn producer_for_source(source_id: &str) -> Option<Box<dyn SourceProducer>> {
    match source_id {
        "github-ausjobs" => Some(Box::new(GithubAusJobsProducer)),
        "seek" => Some(Box::new(SeekProducer)),
        "adzuna" => Some(Box::new(AdzunaProducer)),
        "linkedin" => Some(Box::new(LinkedInProducer)),
        "gradconnection" => Some(Box::new(GradConnectionProducer)),
        "remoteok" => Some(Box::new(RemoteOkProducer)),
        "remotive" => Some(Box::new(RemotiveProducer)),
        "weworkremotely" => Some(Box::new(WeWorkRemotelyProducer)),
        _ => None,
    }
}

pub fn default_producers() -> Vec<Box<dyn SourceProducer>> {
    default_source_ids()
        .iter()
        .filter_map(|id| producer_for_source(id))
        .collect()
}

/// Reads a captured payload from `fixtures/<source_id>/<file_name>` under
/// `workspace_root`.
pub fn load_fixture_text(
    workspace_root: impl AsRef<Path>,
    source_id: &str,
    file_name: &str,
) -> anyhow::Result<String> {
    use anyhow::Context;
    let path = workspace_root
        .as_ref()
        .join("fixtures")
        .join(source_id)
        .join(file_name);
    std::fs::read_to_string(&path).with_context(|| format!("reading fixture {}", path.display()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_default_source_has_a_producer_with_matching_id() {
        for id in DEFAULT_SOURCE_IDS {
            let producer = producer_for_source(id).expect("registered producer");
            assert_eq!(producer.source_id(), id);
        }
        assert_eq!(default_producers().len(), DEFAULT_SOURCE_IDS.len());
    }

    #[test]
    fn unknown_source_is_not_registered() {
        assert!(producer_for_source("monster").is_none());
    }
}
