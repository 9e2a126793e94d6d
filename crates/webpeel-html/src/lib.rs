//! HTML to structured-content processing (spec.md §4.5): main-content
//! detection, density pruning, markdown conversion, JSON-LD and readability
//! extraction, plus the title/meta/link/image metadata collectors Stage 5
//! and Stage 8 both depend on.

pub mod density_pruner;
pub mod json_ld;
pub mod main_content;
pub mod markdown;
pub mod metadata;
pub mod readability;

use scraper::Html;
use url::Url;

pub use density_pruner::prune;
pub use json_ld::{extract_json_ld, normalized_content, primary_entry, JsonLdEntry};
pub use main_content::detect_main_content;
pub use markdown::{html_to_markdown, ConvertOptions};
pub use metadata::{extract_images, extract_links, extract_meta, extract_title};

/// Everything Stage 5 (ProcessContent) needs from a single HTML parse pass,
/// bundled so callers don't re-parse the document per concern.
pub struct ProcessedHtml {
    pub title: Option<String>,
    pub meta: std::collections::HashMap<String, String>,
    pub links: Vec<Url>,
    pub images: Vec<String>,
    pub json_ld: Vec<JsonLdEntry>,
    pub main_content_html: Option<String>,
}

/// Parse `html` once and run title/meta/link/image/JSON-LD/main-content
/// extraction over it.
pub fn process(html: &str, base: &Url) -> ProcessedHtml {
    let doc = Html::parse_document(html);
    ProcessedHtml {
        title: extract_title(&doc),
        meta: extract_meta(&doc),
        links: extract_links(&doc, base),
        images: extract_images(&doc, base),
        json_ld: extract_json_ld(&doc),
        main_content_html: detect_main_content(&doc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_bundles_every_concern() {
        let html = r#"<html><head><title>T</title>
        <script type="application/ld+json">{"@type":"Article","name":"T"}</script>
        </head><body>
            <article><p>Enough substantive article content to dominate the page body share comfortably for this test.</p></article>
            <a href="/rel">rel</a>
        </body></html>"#;
        let base = Url::parse("https://example.com/").unwrap();
        let out = process(html, &base);
        assert_eq!(out.title.as_deref(), Some("T"));
        assert_eq!(out.links.len(), 1);
        assert_eq!(out.json_ld.len(), 1);
        assert!(out.main_content_html.is_some());
    }
}
