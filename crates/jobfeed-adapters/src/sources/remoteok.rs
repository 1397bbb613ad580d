use async_trait::async_trait;
use jobfeed_core::{RawRecord, TextClassifier};
use serde_json::Value as JsonValue;

use super::{json_str, json_truthy};
use crate::{Crawlability, ProducerContext, ProducerError, SourceProducer};

const SOURCE_ID: &str = "remoteok";
const SOURCE_LABEL: &str = "RemoteOK";
const API_URL: &str = "https://remoteok.io/api";

pub struct RemoteOkProducer;

#[async_trait]
impl SourceProducer for RemoteOkProducer {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn crawlability(&self) -> Crawlability {
        Crawlability::Api
    }

    async fn produce(&self, ctx: &ProducerContext<'_>) -> Result<Vec<RawRecord>, ProducerError> {
        let body = ctx.fetch_text(SOURCE_ID, API_URL).await?;
        parse_remoteok(&body, ctx.classifier)
    }
}

/// The feed's first element is a legal notice rather than a posting.
pub fn parse_remoteok(body: &str, classifier: &TextClassifier) -> Result<Vec<RawRecord>, ProducerError> {
    let doc: JsonValue = serde_json::from_str(body)
        .map_err(|e| ProducerError::parse(SOURCE_ID, e.to_string()))?;
    let items = doc
        .as_array()
        .ok_or_else(|| ProducerError::parse(SOURCE_ID, "expected a top-level array"))?;

    let mut out = Vec::new();
    for item in items.iter().filter(|item| item.is_object()) {
        if json_truthy(item.get("legal")) {
            continue;
        }
        let title = json_str(item, "position");
        let company = json_str(item, "company");
        let link = [item.get("url"), item.get("apply_url")]
            .into_iter()
            .flatten()
            .filter_map(JsonValue::as_str)
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();
        let location = match json_str(item, "location") {
            l if l.is_empty() => "Remote".to_string(),
            l => l,
        };

        if title.is_empty() || company.is_empty() || link.is_empty() {
            continue;
        }
        if !classifier.is_valid_job_title(&title) {
            continue;
        }
        if !classifier.is_acceptable_location(&location, &title, &link) {
            continue;
        }

        let mut record = RawRecord::new(SOURCE_LABEL)
            .title(title)
            .company(company)
            .url(link)
            .location(location);
        if let Some(date) = item.get("date").and_then(JsonValue::as_str).filter(|s| !s.is_empty()) {
            record = record.posted_date(date);
        }
        out.push(record);
    }
    Ok(out)
}
