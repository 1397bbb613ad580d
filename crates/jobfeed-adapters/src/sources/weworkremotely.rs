use async_trait::async_trait;
use jobfeed_core::{clean_text, format_instant, RawRecord, TextClassifier};

use crate::{Crawlability, ProducerContext, ProducerError, SourceProducer};

const SOURCE_ID: &str = "weworkremotely";
const SOURCE_LABEL: &str = "WeWorkRemotely";
const FEED_URL: &str = "https://weworkremotely.com/categories/remote-programming-jobs.rss";

pub struct WeWorkRemotelyProducer;

#[async_trait]
impl SourceProducer for WeWorkRemotelyProducer {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn crawlability(&self) -> Crawlability {
        Crawlability::Rss
    }

    async fn produce(&self, ctx: &ProducerContext<'_>) -> Result<Vec<RawRecord>, ProducerError> {
        let xml = ctx.fetch_text(SOURCE_ID, FEED_URL).await?;
        parse_weworkremotely(&xml, ctx.classifier)
    }
}

/// Item titles read `Company: Role`; only the first colon splits.
fn split_title(title: &str) -> (String, String) {
    match title.split_once(':') {
        Some((company, role)) => (clean_text(company), clean_text(role)),
        None => (String::new(), title.to_string()),
    }
}

pub fn parse_weworkremotely(xml: &str, classifier: &TextClassifier) -> Result<Vec<RawRecord>, ProducerError> {
    let feed = feed_rs::parser::parse(xml.as_bytes())
        .map_err(|e| ProducerError::parse(SOURCE_ID, e.to_string()))?;

    let mut out = Vec::new();
    for entry in feed.entries {
        let title = entry
            .title
            .as_ref()
            .map(|t| clean_text(&t.content))
            .unwrap_or_default();
        let link = entry
            .links
            .first()
            .map(|l| clean_text(&l.href))
            .unwrap_or_default();
        let (company, role) = split_title(&title);

        if role.is_empty() || link.is_empty() {
            continue;
        }
        if !classifier.is_valid_job_title(&role) {
            continue;
        }
        if !classifier.is_acceptable_location("Remote", &role, &link) {
            continue;
        }

        let company = if company.is_empty() {
            SOURCE_LABEL.to_string()
        } else {
            company
        };
        let mut record = RawRecord::new(SOURCE_LABEL)
            .title(role)
            .company(company)
            .url(link)
            .location("Remote");
        if let Some(published) = entry.published {
            record = record.posted_date(format_instant(published));
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
    fn parses_feed_items_and_splits_company() {
        let records =
            parse_weworkremotely(&fixture(SOURCE_ID, "remote-programming-jobs.rss"), &classifier()).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.company.as_deref(), Some("Basecamp"));
        assert_eq!(first.title.as_deref(), Some("Senior Backend Developer: Ruby"));
        assert_eq!(first.location.as_deref(), Some("Remote"));
        assert_eq!(first.posted_date.as_deref(), Some("2026-02-24T09:30:00Z"));
        assert_eq!(
            first.url.as_deref(),
            Some("https://weworkremotely.com/remote-jobs/basecamp-senior-backend-developer-ruby")
        );

        assert_eq!(records[1].company.as_deref(), Some("WeWorkRemotely"));
        assert_eq!(records[1].title.as_deref(), Some("Python Developer"));
    }

    #[test]
    fn split_uses_first_colon_only() {
        assert_eq!(
            split_title("Acme: Engineer: Platform"),
            ("Acme".to_string(), "Engineer: Platform".to_string())
        );
        assert_eq!(split_title("Data Engineer"), (String::new(), "Data Engineer".to_string()));
    }

    #[test]
    fn non_feed_body_is_a_parse_error() {
        assert!(parse_weworkremotely("<html>maintenance</html>", &classifier()).is_err());
    }
}
