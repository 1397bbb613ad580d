use async_trait::async_trait;
use jobfeed_core::{clean_text, RawRecord, TextClassifier};
use scraper::Html;
use tracing::warn;

use crate::html::{cards, first_attr, first_text, selector};
use crate::{Crawlability, ProducerContext, ProducerError, SourceProducer};

const SOURCE_ID: &str = "linkedin";
const SOURCE_LABEL: &str = "LinkedIn";
const CARDS_PER_PAGE: usize = 10;

/// Pre-encoded (keywords, location) pairs; postings from the last 7 days.
const SEARCHES: [(&str, &str); 10] = [
    ("data%20engineer", "Australia"),
    ("data%20analyst", "Kenya"),
    ("software%20engineer", "United%20Arab%20Emirates"),
    ("python%20developer", "United%20Kingdom"),
    ("graduate%20software", "United%20States"),
    ("quant%20engineer", "Canada"),
    ("quant%20developer", "United%20Kingdom"),
    ("quantitative%20analyst", "United%20States"),
    ("machine%20learning%20engineer", "Kenya"),
    ("mle", "United%20Arab%20Emirates"),
];

pub struct LinkedInProducer;

#[async_trait]
impl SourceProducer for LinkedInProducer {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn crawlability(&self) -> Crawlability {
        Crawlability::PublicHtml
    }

    async fn produce(&self, ctx: &ProducerContext<'_>) -> Result<Vec<RawRecord>, ProducerError> {
        let mut out = Vec::new();
        for (keywords, location) in SEARCHES {
            let url = format!(
                "https://www.linkedin.com/jobs/search?keywords={keywords}&location={location}&f_TPR=r604800"
            );
            match ctx.fetch_text(SOURCE_ID, &url).await {
                Ok(html) => out.extend(parse_linkedin(&html, ctx.classifier)?),
                Err(err) => warn!(source_id = SOURCE_ID, %url, error = %err, "search page skipped"),
            }
        }
        Ok(out)
    }
}

pub fn parse_linkedin(html: &str, classifier: &TextClassifier) -> Result<Vec<RawRecord>, ProducerError> {
    let document = Html::parse_document(html);
    let card_sel = selector(SOURCE_ID, "div.base-card")?;
    let title_sel = selector(SOURCE_ID, "h3.base-search-card__title")?;
    let company_sel = selector(SOURCE_ID, "h4.base-search-card__subtitle")?;
    let location_sel = selector(SOURCE_ID, "span.job-search-card__location")?;
    let link_sel = selector(SOURCE_ID, "a.base-card__full-link")?;

    let mut out = Vec::new();
    for card in cards(&document, &card_sel, CARDS_PER_PAGE) {
        let (Some(title), Some(company), Some(link)) = (
            first_text(card, &title_sel),
            first_text(card, &company_sel),
            first_attr(card, &link_sel, "href"),
        ) else {
            continue;
        };
        let title = clean_text(&title);
        let company = clean_text(&company);
        let location = first_text(card, &location_sel).map(|t| clean_text(&t)).unwrap_or_default();

        if !link.contains("/jobs/view/") {
            continue;
        }
        if !classifier.is_acceptable_location(&location, &title, &link) {
            continue;
        }
        if !classifier.is_valid_job_title(&title) {
            continue;
        }

        // Tracking parameters differ per impression; the bare path is stable.
        // Ids hash the bare posting url, so they differ from rows keyed on the tracked href.
        let url = link.split('?').next().unwrap_or_default().to_string();
        out.push(
            RawRecord::new(SOURCE_LABEL)
                .title(title)
                .company(company)
                .url(url)
                .location(location),
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{classifier, fixture};

    #[test]
    fn parses_public_cards_and_strips_tracking_query() {
        let records = parse_linkedin(&fixture(SOURCE_ID, "search.html"), &classifier()).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].title.as_deref(), Some("Senior Data Engineer (Remote)"));
        assert_eq!(records[0].company.as_deref(), Some("Canva"));
        assert_eq!(
            records[0].url.as_deref(),
            Some("https://au.linkedin.com/jobs/view/senior-data-engineer-remote-at-canva-3812345678")
        );
        assert_eq!(records[1].company.as_deref(), Some("Safaricom PLC"));
        assert_eq!(records[1].location.as_deref(), Some("Nairobi County, Kenya"));
        assert!(records.iter().all(|r| r.source == "LinkedIn"));
    }

    #[test]
    fn title_gate_applies_after_location_gate() {
        let html = r#"<div class="base-card">
            <h3 class="base-search-card__title">Remote Marketing Manager</h3>
            <h4 class="base-search-card__subtitle">Acme</h4>
            <a class="base-card__full-link" href="https://www.linkedin.com/jobs/view/1"></a>
        </div>"#;
        assert!(parse_linkedin(html, &classifier()).unwrap().is_empty());
    }
}
