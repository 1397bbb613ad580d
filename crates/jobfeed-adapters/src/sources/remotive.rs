use async_trait::async_trait;
use jobfeed_core::{RawRecord, TextClassifier};
use serde_json::Value as JsonValue;

use super::json_str;
use crate::{Crawlability, ProducerContext, ProducerError, SourceProducer};

const SOURCE_ID: &str = "remotive";
const SOURCE_LABEL: &str = "Remotive";
const API_URL: &str = "https://remotive.com/api/remote-jobs";

pub struct RemotiveProducer;

#[async_trait]
impl SourceProducer for RemotiveProducer {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn crawlability(&self) -> Crawlability {
        Crawlability::Api
    }

    async fn produce(&self, ctx: &ProducerContext<'_>) -> Result<Vec<RawRecord>, ProducerError> {
        let body = ctx.fetch_text(SOURCE_ID, API_URL).await?;
        parse_remotive(&body, ctx.classifier)
    }
}

pub fn parse_remotive(body: &str, classifier: &TextClassifier) -> Result<Vec<RawRecord>, ProducerError> {
    let doc: JsonValue = serde_json::from_str(body)
        .map_err(|e| ProducerError::parse(SOURCE_ID, e.to_string()))?;

    let mut out = Vec::new();
    let jobs = doc.get("jobs").and_then(JsonValue::as_array);
    for item in jobs.into_iter().flatten() {
        let title = json_str(item, "title");
        let company = json_str(item, "company_name");
        let link = item.get("url").and_then(JsonValue::as_str).unwrap_or_default().to_string();
        let location = match json_str(item, "candidate_required_location") {
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
        if let Some(date) = item
            .get("publication_date")
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
        {
            record = record.posted_date(date);
        }
        out.push(record);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{classifier, fixture};

    #[test]
    fn parses_jobs_array() {
        let records = parse_remotive(&fixture(SOURCE_ID, "remote-jobs.json"), &classifier()).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].title.as_deref(), Some("Machine Learning Engineer"));
        assert_eq!(records[0].company.as_deref(), Some("Hugging Face"));
        assert_eq!(records[0].location.as_deref(), Some("Worldwide"));
        assert_eq!(records[0].posted_date.as_deref(), Some("2026-02-24T08:31:02"));

        assert_eq!(records[1].location.as_deref(), Some("Remote"));
        // "remote-jobs" in every listing url satisfies the location gate.
        assert_eq!(records[2].location.as_deref(), Some("USA Only"));
        assert!(records.iter().all(|r| r.source == "Remotive"));
    }

    #[test]
    fn body_without_jobs_yields_nothing() {
        assert!(parse_remotive(r#"{"job-count":0}"#, &classifier()).unwrap().is_empty());
    }
}
