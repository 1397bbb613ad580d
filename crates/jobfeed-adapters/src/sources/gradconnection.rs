use async_trait::async_trait;
use jobfeed_core::{clean_text, RawRecord, TextClassifier};
use scraper::Html;

use crate::html::{absolutize, cards, first_attr, first_text, selector};
use crate::{Crawlability, ProducerContext, ProducerError, SourceProducer};

const SOURCE_ID: &str = "gradconnection";
const SOURCE_LABEL: &str = "GradConnection";
const ORIGIN: &str = "https://au.gradconnection.com";
const LISTING_URL: &str = "https://au.gradconnection.com/graduate-jobs/information-technology/";
const CARDS_PER_PAGE: usize = 30;

pub struct GradConnectionProducer;

#[async_trait]
impl SourceProducer for GradConnectionProducer {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn crawlability(&self) -> Crawlability {
        Crawlability::PublicHtml
    }

    async fn produce(&self, ctx: &ProducerContext<'_>) -> Result<Vec<RawRecord>, ProducerError> {
        let html = ctx.fetch_text(SOURCE_ID, LISTING_URL).await?;
        parse_gradconnection(&html, ctx.classifier)
    }
}

/// Cards without an employer name are still emitted; normalization rejects them.
pub fn parse_gradconnection(
    html: &str,
    classifier: &TextClassifier,
) -> Result<Vec<RawRecord>, ProducerError> {
    let document = Html::parse_document(html);
    let card_sel = selector(SOURCE_ID, "div.job-card")?;
    let title_sel = selector(SOURCE_ID, "a.job-title")?;
    let company_sel = selector(SOURCE_ID, "span.company-name")?;
    let location_sel = selector(SOURCE_ID, "span.location")?;

    let mut out = Vec::new();
    for card in cards(&document, &card_sel, CARDS_PER_PAGE) {
        let Some(title) = first_text(card, &title_sel).map(|t| clean_text(&t)) else {
            continue;
        };
        let href = first_attr(card, &title_sel, "href").unwrap_or_default();
        let link = absolutize(ORIGIN, &href);
        let company = first_text(card, &company_sel).map(|t| clean_text(&t)).unwrap_or_default();
        let location = first_text(card, &location_sel)
            .map(|t| clean_text(&t))
            .unwrap_or_else(|| "Australia".to_string());

        if !classifier.is_direct_job_url(&link) && !link.contains("/graduate-jobs/") {
            continue;
        }
        if !classifier.is_acceptable_location(&location, &title, &link) {
            continue;
        }

        out.push(
            RawRecord::new(SOURCE_LABEL)
                .title(title)
                .company(company)
                .url(link)
                .location(location),
        );
    }
    Ok(out)
}
