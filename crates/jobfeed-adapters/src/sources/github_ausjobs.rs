use std::sync::LazyLock;

use async_trait::async_trait;
use jobfeed_core::{clean_text, RawRecord};
use regex::Regex;

use crate::{Crawlability, ProducerContext, ProducerError, SourceProducer};

const SOURCE_ID: &str = "github-ausjobs";
const SOURCE_LABEL: &str = "GitHub-AusJobs";
const README_URL: &str =
    "https://raw.githubusercontent.com/AusJobs/Australia-Tech-Internship/main/README.md";

/// `| [Role](URL) | Company | Location |`
static TABLE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\|\s*\[([^\]]+)\]\(([^)]+)\)\s*\|\s*([^|]+)\|\s*([^|]+)\|")
        .expect("table row regex is valid")
});

pub struct GithubAusJobsProducer;

#[async_trait]
impl SourceProducer for GithubAusJobsProducer {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn crawlability(&self) -> Crawlability {
        Crawlability::Markdown
    }

    async fn produce(&self, ctx: &ProducerContext<'_>) -> Result<Vec<RawRecord>, ProducerError> {
        let markdown = ctx.fetch_text(SOURCE_ID, README_URL).await?;
        Ok(parse_github_ausjobs(&markdown))
    }
}

/// The list is curated, so no title or location gate applies.
pub fn parse_github_ausjobs(markdown: &str) -> Vec<RawRecord> {
    TABLE_ROW
        .captures_iter(markdown)
        .filter_map(|caps| {
            let title = clean_text(&caps[1]);
            let url = caps[2].trim().to_string();
            let company = clean_text(&caps[3]);
            let location = clean_text(&caps[4]);

            let lowered = title.to_lowercase();
            if matches!(lowered.as_str(), "role" | "company" | "position") || title.contains("---") {
                return None;
            }
            if !url.starts_with("http") {
                return None;
            }

            let location = if location.is_empty() {
                "Australia".to_string()
            } else {
                location
            };
            Some(
                RawRecord::new(SOURCE_LABEL)
                    .title(title)
                    .company(company)
                    .url(url)
                    .location(location),
            )
        })
        .collect()
}
