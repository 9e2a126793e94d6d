//! Auto-extract heuristics (SPEC_FULL.md §F): lexical/structural extractors
//! invoked when `extract` names a schema without supplying CSS selectors.
//! Each returns into `PipelineContext.extracted_fields` under its schema
//! name; a miss is a warning, never an error.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};

static PRICE_CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)price|cost|amount").unwrap());
static PRICE_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[$€£¥]\s?\d[\d,]*(?:\.\d{2})?").unwrap());
static MAILTO_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"a[href^="mailto:"]"#).unwrap());
static TEL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"a[href^="tel:"]"#).unwrap());
static CONTACT_CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)address|contact").unwrap());
static ALL_ELEMENTS_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("*").unwrap());
static OPENAPI_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"link[rel*="openapi"], link[rel*="swagger"]"#).unwrap());
static SCRIPT_JSON_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/json"]"#).unwrap());

fn class_or_id(el: &ElementRef) -> String {
    let class = el.value().attr("class").unwrap_or("");
    let id = el.value().attr("id").unwrap_or("");
    format!("{class} {id}")
}

/// **pricing** — regex over currency-symbol + digit groups near
/// price-indicating class names.
pub fn extract_pricing(doc: &Html) -> Option<Value> {
    let mut prices = Vec::new();
    for el in doc.select(&ALL_ELEMENTS_SELECTOR) {
        if !PRICE_CLASS_RE.is_match(&class_or_id(&el)) {
            continue;
        }
        let text = el.text().collect::<String>();
        for m in PRICE_TEXT_RE.find_iter(&text) {
            prices.push(m.as_str().to_string());
        }
    }
    prices.dedup();
    if prices.is_empty() {
        None
    } else {
        Some(json!({ "prices": prices }))
    }
}

/// **products** — repeated sibling blocks sharing a class name, each
/// yielding `{name, price?, image?}`.
pub fn extract_products(doc: &Html) -> Option<Value> {
    let mut by_class: HashMap<String, Vec<ElementRef>> = HashMap::new();
    for el in doc.select(&ALL_ELEMENTS_SELECTOR) {
        let Some(class) = el.value().attr("class") else {
            continue;
        };
        for token in class.split_whitespace() {
            if token.to_lowercase().contains("product")
                || token.to_lowercase().contains("item")
                || token.to_lowercase().contains("card")
            {
                by_class.entry(token.to_string()).or_default().push(el);
            }
        }
    }

    let (_, candidates) = by_class
        .into_iter()
        .filter(|(_, els)| els.len() >= 2)
        .max_by_key(|(_, els)| els.len())?;

    let mut products = Vec::new();
    for el in candidates {
        let name = el
            .select(&Selector::parse("h1,h2,h3,h4,a").unwrap())
            .next()
            .map(|n| n.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());
        let price = PRICE_TEXT_RE
            .find(&el.text().collect::<String>())
            .map(|m| m.as_str().to_string());
        let image = el
            .select(&Selector::parse("img[src]").unwrap())
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string);
        if name.is_none() && price.is_none() && image.is_none() {
            continue;
        }
        products.push(json!({ "name": name, "price": price, "image": image }));
    }

    if products.is_empty() {
        None
    } else {
        Some(json!({ "products": products }))
    }
}

/// **contact** — `mailto:`/`tel:` link harvesting plus address-like text
/// near `address`/`contact` class names.
pub fn extract_contact(doc: &Html) -> Option<Value> {
    let emails: Vec<String> = doc
        .select(&MAILTO_SELECTOR)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| href.trim_start_matches("mailto:").to_string())
        .collect();
    let phones: Vec<String> = doc
        .select(&TEL_SELECTOR)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| href.trim_start_matches("tel:").to_string())
        .collect();

    let address = doc
        .select(&ALL_ELEMENTS_SELECTOR)
        .find(|el| CONTACT_CLASS_RE.is_match(&class_or_id(el)))
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty() && s.len() < 500);

    if emails.is_empty() && phones.is_empty() && address.is_none() {
        None
    } else {
        Some(json!({ "emails": emails, "phones": phones, "address": address }))
    }
}

/// **article** — delegates to the readability extractor and adds
/// `byline`/`published` from standard meta tags.
pub fn extract_article(doc: &Html, title: Option<String>) -> Option<Value> {
    let result = webpeel_html::readability::extract(doc, title)?;
    Some(json!({
        "title": result.title,
        "byline": result.byline,
        "site_name": result.site_name,
        "published": result.published,
        "content": result.content,
    }))
}

/// **api_docs** — detects OpenAPI/Swagger JSON embedded in the page or
/// linked via `<link rel="...openapi...">` and extracts endpoint summaries.
pub fn extract_api_docs(doc: &Html) -> Option<Value> {
    if let Some(link) = doc.select(&OPENAPI_LINK_SELECTOR).next() {
        if let Some(href) = link.value().attr("href") {
            return Some(json!({ "spec_url": href }));
        }
    }

    for script in doc.select(&SCRIPT_JSON_SELECTOR) {
        let raw = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        let is_openapi = value.get("openapi").is_some() || value.get("swagger").is_some();
        if !is_openapi {
            continue;
        }
        let paths = value
            .get("paths")
            .and_then(|p| p.as_object())
            .map(|obj| {
                obj.iter()
                    .flat_map(|(path, methods)| {
                        methods
                            .as_object()
                            .into_iter()
                            .flat_map(|m| m.keys().cloned())
                            .map(move |method| format!("{} {}", method.to_uppercase(), path))
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        return Some(json!({
            "title": value.get("info").and_then(|i| i.get("title")),
            "endpoints": paths,
        }));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_finds_currency_near_price_class() {
        let html = r#"<div class="product-price">$19.99</div>"#;
        let doc = Html::parse_fragment(html);
        let value = extract_pricing(&doc).expect("should find price");
        assert_eq!(value["prices"][0], "$19.99");
    }

    #[test]
    fn contact_harvests_mailto_and_tel() {
        let html = r#"<a href="mailto:hi@example.com">Email</a><a href="tel:+15551234">Call</a>"#;
        let doc = Html::parse_fragment(html);
        let value = extract_contact(&doc).expect("should find contact info");
        assert_eq!(value["emails"][0], "hi@example.com");
        assert_eq!(value["phones"][0], "+15551234");
    }

    #[test]
    fn api_docs_detects_openapi_link() {
        let html = r#"<link rel="openapi-spec" href="/openapi.json">"#;
        let doc = Html::parse_fragment(html);
        let value = extract_api_docs(&doc).expect("should find spec link");
        assert_eq!(value["spec_url"], "/openapi.json");
    }

    #[test]
    fn pricing_returns_none_without_signal() {
        let html = "<div class=\"description\">Nothing here.</div>";
        let doc = Html::parse_fragment(html);
        assert!(extract_pricing(&doc).is_none());
    }
}
