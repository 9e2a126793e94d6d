//! Title, meta-tag, Open Graph, and link/image collection.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[name], meta[property]").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());

/// Extract the `<title>` text, trimmed, or `None` if absent/empty.
pub fn extract_title(doc: &Html) -> Option<String> {
    doc.select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Extract `<meta name=...>` / `<meta property=...>` pairs plus Open Graph
/// (`og:*`) and Twitter Card (`twitter:*`) tags into a single flat map,
/// keyed by their lowercased `name`/`property` attribute.
pub fn extract_meta(doc: &Html) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for el in doc.select(&META_SELECTOR) {
        let name = el
            .value()
            .attr("name")
            .or_else(|| el.value().attr("property"))
            .unwrap_or("");
        let content = el.value().attr("content").unwrap_or("");
        if name.is_empty() || content.is_empty() {
            continue;
        }
        out.insert(name.to_lowercase(), content.to_string());
    }
    out
}

/// Resolve every `<a href>` to an absolute http(s) URL relative to `base`.
/// Non-http(s) schemes (javascript:, data:, mailto:, #fragment-only) are
/// silently skipped — `PipelineContext::add_link` also enforces this, but
/// filtering here avoids constructing useless `Url` values.
pub fn extract_links(doc: &Html, base: &Url) -> Vec<Url> {
    doc.select(&LINK_SELECTOR)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| !is_inert_href(href))
        .filter_map(|href| base.join(href).ok())
        .filter(|u| u.scheme() == "http" || u.scheme() == "https")
        .collect()
}

fn is_inert_href(href: &str) -> bool {
    let h = href.trim();
    h.is_empty()
        || h.starts_with('#')
        || h.starts_with("javascript:")
        || h.starts_with("data:")
        || h.starts_with("mailto:")
        || h.starts_with("tel:")
}

/// Resolve every `<img src>` to an absolute URL relative to `base`.
pub fn extract_images(doc: &Html, base: &Url) -> Vec<String> {
    doc.select(&IMG_SELECTOR)
        .filter_map(|el| el.value().attr("src"))
        .filter(|src| !src.trim().is_empty() && !src.starts_with("data:"))
        .filter_map(|src| base.join(src).ok())
        .map(|u| u.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_description() {
        let html = r#"<html><head><title> Example Domain </title>
        <meta name="description" content="An example page."></head><body></body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(extract_title(&doc), Some("Example Domain".to_string()));
        let meta = extract_meta(&doc);
        assert_eq!(meta.get("description").unwrap(), "An example page.");
    }

    #[test]
    fn links_are_resolved_and_filtered() {
        let html = r#"<html><body>
            <a href="/domains/example">rel</a>
            <a href="https://www.iana.org/domains/example">abs</a>
            <a href="javascript:void(0)">js</a>
            <a href="#top">frag</a>
            <a href="mailto:a@b.com">mail</a>
        </body></html>"#;
        let doc = Html::parse_document(html);
        let base = Url::parse("https://example.com/").unwrap();
        let links = extract_links(&doc, &base);
        assert_eq!(links.len(), 2);
        assert!(links.iter().any(|l| l.as_str() == "https://example.com/domains/example"));
        assert!(links
            .iter()
            .any(|l| l.as_str() == "https://www.iana.org/domains/example"));
    }
}
