//! Readability-style extraction (spec.md §4.5): score paragraph-bearing
//! elements by sentence density and promote the best-scoring ancestor,
//! separately from [`crate::main_content`]'s coarser block-level heuristic.
//! Also recovers title/byline/site-name/published-date metadata the way a
//! reader-mode browser feature would.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use webpeel_types::ReadabilityResult;

static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p, pre").unwrap());
static BLOCK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div, article, section, main, td").unwrap());
static COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(",").unwrap());
static BYLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)byline|author|by-line|writer").unwrap());
static UNLIKELY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)comment|sidebar|footer|header|nav|menu|ad-|advert|popup|social|share")
        .unwrap()
});

const MIN_PARAGRAPH_CHARS: usize = 25;

/// Score one paragraph-like node the way Mozilla's Readability does: a base
/// point plus one per comma, plus a length bonus capped at 3, minus nothing
/// (class penalties are applied at the ancestor level via [`is_unlikely`]).
fn paragraph_score(el: &ElementRef) -> f64 {
    let text = el.text().collect::<String>();
    let len = text.trim().chars().count();
    if len < MIN_PARAGRAPH_CHARS {
        return 0.0;
    }
    let commas = COMMA_RE.find_iter(&text).count() as f64;
    let length_bonus = ((len / 100) as f64).min(3.0);
    1.0 + commas + length_bonus
}

fn is_unlikely(el: &ElementRef) -> bool {
    let class_and_id = format!(
        "{} {}",
        el.value().attr("class").unwrap_or(""),
        el.value().attr("id").unwrap_or("")
    );
    UNLIKELY_RE.is_match(&class_and_id)
}

fn node_id(el: &ElementRef) -> ego_tree::NodeId {
    el.id()
}

/// Walk every paragraph, award its score to its parent block (and half to
/// the grandparent, as Readability's scorer does), then pick the
/// highest-scoring block overall.
fn score_candidates(doc: &Html) -> Option<ElementRef> {
    use std::collections::HashMap;

    let mut scores: HashMap<ego_tree::NodeId, f64> = HashMap::new();

    for p in doc.select(&PARAGRAPH_SELECTOR) {
        let base = paragraph_score(&p);
        if base == 0.0 {
            continue;
        }
        if let Some(parent) = p.parent().and_then(ElementRef::wrap) {
            if !is_unlikely(&parent) {
                *scores.entry(node_id(&parent)).or_insert(0.0) += base;
            }
            if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
                if !is_unlikely(&grandparent) {
                    *scores.entry(node_id(&grandparent)).or_insert(0.0) += base / 2.0;
                }
            }
        }
    }

    doc.select(&BLOCK_SELECTOR)
        .filter_map(|el| scores.get(&node_id(&el)).map(|s| (*s, el)))
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap())
        .map(|(_, el)| el)
}

fn extract_byline(doc: &Html) -> Option<String> {
    static META_AUTHOR: Lazy<Selector> =
        Lazy::new(|| Selector::parse(r#"meta[name="author"]"#).unwrap());
    if let Some(meta) = doc.select(&META_AUTHOR).next() {
        if let Some(content) = meta.value().attr("content") {
            if !content.trim().is_empty() {
                return Some(content.trim().to_string());
            }
        }
    }
    static CANDIDATE_SELECTOR: Lazy<Selector> =
        Lazy::new(|| Selector::parse("[class], [id]").unwrap());
    doc.select(&CANDIDATE_SELECTOR)
        .find(|el| BYLINE_RE.is_match(&format!(
            "{} {}",
            el.value().attr("class").unwrap_or(""),
            el.value().attr("id").unwrap_or("")
        )))
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty() && s.chars().count() < 200)
}

fn extract_site_name(doc: &Html) -> Option<String> {
    static OG_SITE: Lazy<Selector> =
        Lazy::new(|| Selector::parse(r#"meta[property="og:site_name"]"#).unwrap());
    doc.select(&OG_SITE)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_published(doc: &Html) -> Option<String> {
    const SELECTORS: &[&str] = &[
        r#"meta[property="article:published_time"]"#,
        r#"meta[name="date"]"#,
        r#"meta[name="publish-date"]"#,
        "time[datetime]",
    ];
    for sel in SELECTORS {
        let Ok(selector) = Selector::parse(sel) else {
            continue;
        };
        if let Some(el) = doc.select(&selector).next() {
            let value = el
                .value()
                .attr("content")
                .or_else(|| el.value().attr("datetime"))
                .map(str::to_string);
            if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                return Some(v);
            }
        }
    }
    None
}

/// Run the full readability extraction over a parsed document.
pub fn extract(doc: &Html, title: Option<String>) -> Option<ReadabilityResult> {
    let best = score_candidates(doc)?;
    let content = crate::markdown::html_to_markdown(&best.html(), &crate::markdown::ConvertOptions::default());
    if content.trim().is_empty() {
        return None;
    }
    Some(ReadabilityResult {
        title,
        byline: extract_byline(doc),
        site_name: extract_site_name(doc),
        published: extract_published(doc),
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::extract_title;

    #[test]
    fn extracts_article_body_and_byline() {
        let html = r#"<html><head>
            <meta name="author" content="Jane Doe">
            <meta property="og:site_name" content="Daily Gazette">
            <meta property="article:published_time" content="2026-01-05T12:00:00Z">
            <title>Big Story</title>
        </head><body>
            <nav class="site-nav"><p>skip, this, nav, paragraph, has, commas, too</p></nav>
            <article>
                <p>This is the first paragraph of a long, detailed story describing events in depth, with commas.</p>
                <p>This is the second paragraph continuing the narrative, with more substantive, comma-laden prose.</p>
            </article>
        </body></html>"#;
        let doc = Html::parse_document(html);
        let title = extract_title(&doc);
        let result = extract(&doc, title).expect("should extract readability content");
        assert_eq!(result.byline.as_deref(), Some("Jane Doe"));
        assert_eq!(result.site_name.as_deref(), Some("Daily Gazette"));
        assert!(result.published.is_some());
        assert!(result.content.contains("first paragraph"));
    }

    #[test]
    fn returns_none_for_sparse_page() {
        let html = "<html><body><div>short</div></body></html>";
        let doc = Html::parse_document(html);
        assert!(extract(&doc, None).is_none());
    }
}
