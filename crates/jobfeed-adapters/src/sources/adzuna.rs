use async_trait::async_trait;
use jobfeed_core::{RawRecord, TextClassifier};
use serde_json::Value as JsonValue;
use tracing::{info, warn};
use url::Url;

use super::json_str;
use crate::{Crawlability, ProducerContext, ProducerError, SourceProducer};

const SOURCE_ID: &str = "adzuna";
const RESULTS_PER_PAGE: &str = "25";
const MAX_DAYS_OLD: &str = "14";

const COUNTRIES: [(&str, &str); 4] = [
    ("au", "Australia"),
    ("gb", "United Kingdom"),
    ("us", "United States"),
    ("ca", "Canada"),
];

const SEARCHES: [&str; 15] = [
    "data engineer",
    "data analyst",
    "data scientist",
    "software engineer",
    "software developer",
    "devops engineer",
    "machine learning",
    "python developer",
    "graduate developer",
    "junior developer",
    "quant engineer",
    "quant developer",
    "quantitative analyst",
    "machine learning engineer",
    "mle",
];

pub struct AdzunaProducer;

fn search_url(
    country_code: &str,
    country_name: &str,
    what: &str,
    app_id: &str,
    app_key: &str,
) -> Result<Url, ProducerError> {
    let base = format!("https://api.adzuna.com/v1/api/jobs/{country_code}/search/1");
    Url::parse_with_params(
        &base,
        &[
            ("app_id", app_id),
            ("app_key", app_key),
            ("results_per_page", RESULTS_PER_PAGE),
            ("what", what),
            ("where", country_name),
            ("sort_by", "date"),
            ("max_days_old", MAX_DAYS_OLD),
        ],
    )
    .map_err(|e| ProducerError::parse(SOURCE_ID, format!("building search url: {e}")))
}

#[async_trait]
impl SourceProducer for AdzunaProducer {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn crawlability(&self) -> Crawlability {
        Crawlability::Api
    }

    async fn produce(&self, ctx: &ProducerContext<'_>) -> Result<Vec<RawRecord>, ProducerError> {
        let (Some(app_id), Some(app_key)) = (
            ctx.credentials.adzuna_app_id.as_deref().filter(|s| !s.is_empty()),
            ctx.credentials.adzuna_app_key.as_deref().filter(|s| !s.is_empty()),
        ) else {
            info!(source_id = SOURCE_ID, "no api credentials configured; skipping");
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for (code, name) in COUNTRIES {
            for what in SEARCHES {
                let url = search_url(code, name, what, app_id, app_key)?;
                let body = match ctx.fetch_text(SOURCE_ID, url.as_str()).await {
                    Ok(body) => body,
                    Err(err) => {
                        warn!(source_id = SOURCE_ID, country = code, what, error = %err, "search skipped");
                        continue;
                    }
                };
                match parse_adzuna(&body, code, ctx.classifier) {
                    Ok(records) => out.extend(records),
                    Err(err) => warn!(source_id = SOURCE_ID, country = code, what, error = %err, "search skipped"),
                }
            }
        }
        Ok(out)
    }
}

/// One search response. `country_code` becomes the `Adzuna-<CC>` source label.
pub fn parse_adzuna(
    body: &str,
    country_code: &str,
    classifier: &TextClassifier,
) -> Result<Vec<RawRecord>, ProducerError> {
    let doc: JsonValue = serde_json::from_str(body)
        .map_err(|e| ProducerError::parse(SOURCE_ID, e.to_string()))?;
    let label = format!("Adzuna-{}", country_code.to_uppercase());

    let mut out = Vec::new();
    let results = doc.get("results").and_then(JsonValue::as_array);
    for result in results.into_iter().flatten() {
        let title = json_str(result, "title");
        let company = result.get("company").map(|c| json_str(c, "display_name")).unwrap_or_default();
        let location = result.get("location").map(|l| json_str(l, "display_name")).unwrap_or_default();
        let link = result
            .get("redirect_url")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        if title.is_empty() || company.is_empty() || link.is_empty() {
            continue;
        }
        if !classifier.is_valid_job_title(&title) {
            continue;
        }
        if !classifier.is_acceptable_location(&location, &title, &link) {
            continue;
        }

        let mut record = RawRecord::new(label.clone())
            .title(title)
            .company(company)
            .url(link)
            .location(location)
            .salary(salary_range(result.get("salary_min"), result.get("salary_max")));
        if let Some(created) = result.get("created").and_then(JsonValue::as_str).filter(|s| !s.is_empty()) {
            record = record.posted_date(created);
        }
        out.push(record);
    }
    Ok(out)
}

/// Whole dollars; zero counts as "not given".
fn salary_amount(value: Option<&JsonValue>) -> Option<i64> {
    let amount = value?.as_f64()?.trunc() as i64;
    (amount != 0).then_some(amount)
}

fn salary_range(min: Option<&JsonValue>, max: Option<&JsonValue>) -> String {
    match (salary_amount(min), salary_amount(max)) {
        (Some(lo), Some(hi)) => format!("${} - ${}", group_thousands(lo), group_thousands(hi)),
        (Some(lo), None) => format!("${}+", group_thousands(lo)),
        _ => String::new(),
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
