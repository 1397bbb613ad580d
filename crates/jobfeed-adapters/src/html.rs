use scraper::{ElementRef, Html, Selector};

use crate::ProducerError;

pub(crate) fn selector(source_id: &'static str, css: &str) -> Result<Selector, ProducerError> {
    Selector::parse(css).map_err(|e| ProducerError::parse(source_id, format!("selector {css}: {e}")))
}

fn text_or_none(value: String) -> Option<String> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

pub(crate) fn first_text(card: ElementRef<'_>, sel: &Selector) -> Option<String> {
    card.select(sel)
        .next()
        .and_then(|n| text_or_none(n.text().collect::<String>()))
}

pub(crate) fn first_attr(card: ElementRef<'_>, sel: &Selector, attr: &str) -> Option<String> {
    card.select(sel)
        .next()
        .and_then(|n| n.value().attr(attr))
        .and_then(|s| text_or_none(s.to_string()))
}

/// The first `limit` elements matching `sel`, in document order.
pub(crate) fn cards<'a>(document: &'a Html, sel: &'a Selector, limit: usize) -> Vec<ElementRef<'a>> {
    document.select(sel).take(limit).collect()
}

/// Site-relative hrefs get `origin` prepended; absolute ones pass through.
pub(crate) fn absolutize(origin: &str, href: &str) -> String {
    if href.starts_with('/') {
        format!("{origin}{href}")
    } else {
        href.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_text_trims_and_skips_empty() {
        let doc = Html::parse_fragment(r#"<div><h3>  Data  Engineer </h3><span> </span></div>"#);
        let root = doc.root_element();
        let h3 = selector("test", "h3").unwrap();
        let span = selector("test", "span").unwrap();
        assert_eq!(first_text(root, &h3).as_deref(), Some("Data  Engineer"));
        assert_eq!(first_text(root, &span), None);
    }

    #[test]
    fn absolutize_only_touches_site_relative_links() {
        assert_eq!(absolutize("https://x.io", "/job/1"), "https://x.io/job/1");
        assert_eq!(absolutize("https://x.io", "https://y.io/job/1"), "https://y.io/job/1");
    }

    #[test]
    fn bad_selector_is_a_parse_error() {
        assert!(matches!(selector("test", "div[["), Err(ProducerError::Parse { .. })));
    }
}
