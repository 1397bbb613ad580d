use async_trait::async_trait;
use jobfeed_core::{clean_text, RawRecord, TextClassifier};
use scraper::Html;
use tracing::warn;

use crate::html::{absolutize, cards, first_attr, first_text, selector};
use crate::{Crawlability, ProducerContext, ProducerError, SourceProducer};

const SOURCE_ID: &str = "seek";
const SOURCE_LABEL: &str = "SEEK";
const ORIGIN: &str = "https://www.seek.com.au";
const CARDS_PER_PAGE: usize = 15;

const SEARCH_SLUGS: [&str; 21] = [
    "data-engineer",
    "data-analyst",
    "data-scientist",
    "software-engineer",
    "software-developer",
    "backend-developer",
    "frontend-developer",
    "full-stack-developer",
    "devops-engineer",
    "machine-learning-engineer",
    "python-developer",
    "graduate-software",
    "junior-developer",
    "intern-software",
    "bi-developer",
    "analytics-engineer",
    "quantitative-analyst",
    "quant-developer",
    "quant-engineer",
    "machine-learning-engineer",
    "mle",
];

pub struct SeekProducer;

#[async_trait]
impl SourceProducer for SeekProducer {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn crawlability(&self) -> Crawlability {
        Crawlability::PublicHtml
    }

    async fn produce(&self, ctx: &ProducerContext<'_>) -> Result<Vec<RawRecord>, ProducerError> {
        let mut out = Vec::new();
        for slug in SEARCH_SLUGS {
            let url = format!("{ORIGIN}/{slug}-jobs/in-All-Australia");
            match ctx.fetch_text(SOURCE_ID, &url).await {
                Ok(html) => out.extend(parse_seek(&html, ctx.classifier)?),
                Err(err) => warn!(source_id = SOURCE_ID, %url, error = %err, "search page skipped"),
            }
        }
        Ok(out)
    }
}

pub fn parse_seek(html: &str, classifier: &TextClassifier) -> Result<Vec<RawRecord>, ProducerError> {
    let document = Html::parse_document(html);
    let card_sel = selector(SOURCE_ID, r#"article[data-card-type="JobCard"]"#)?;
    let title_sel = selector(SOURCE_ID, r#"a[data-automation="jobTitle"]"#)?;
    let company_sel = selector(SOURCE_ID, r#"a[data-automation="jobCompany"]"#)?;
    let location_sel = selector(SOURCE_ID, r#"a[data-automation="jobLocation"]"#)?;
    let salary_sel = selector(SOURCE_ID, r#"span[data-automation="jobSalary"]"#)?;

    let mut out = Vec::new();
    for card in cards(&document, &card_sel, CARDS_PER_PAGE) {
        let Some(title) = first_text(card, &title_sel).map(|t| clean_text(&t)) else {
            continue;
        };
        let href = first_attr(card, &title_sel, "href").unwrap_or_default();
        let link = absolutize(ORIGIN, &href);
        if !link.contains("/job/") {
            continue;
        }

        let company = first_text(card, &company_sel).map(|t| clean_text(&t)).unwrap_or_default();
        if company.is_empty() {
            continue;
        }
        let location = first_text(card, &location_sel).map(|t| clean_text(&t)).unwrap_or_default();
        let salary = first_text(card, &salary_sel).map(|t| clean_text(&t)).unwrap_or_default();

        if !classifier.is_acceptable_location(&location, &title, &link) {
            continue;
        }

        out.push(
            RawRecord::new(SOURCE_LABEL)
                .title(title)
                .company(company)
                .url(link)
                .location(location)
                .salary(salary),
        );
    }
    Ok(out)
}
