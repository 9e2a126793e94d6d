//! Stage 5 — ParseContent (spec.md §4.2, §4.5): dispatches on the content
//! type assigned by Stage 4 — document decoding, HTML processing (with a
//! lite-mode shortcut and a JSON-LD-first shortcut), pretty-printed JSON,
//! feed-aware XML, or passthrough text.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::instrument;
use webpeel_extraction::document::{decode_document, DocumentKind};
use webpeel_html::{extract_title, html_to_markdown, json_ld, process, prune, ConvertOptions};
use webpeel_types::context::ContentType;
use webpeel_types::{Format, PipelineContext};

/// Density-pruning only pays off on large documents; small pages are cheap
/// enough to convert as-is (spec.md §4.2 Stage 5).
const PRUNE_MIN_HTML_LEN: usize = 20_000;
const JSON_LD_MIN_CONTENT_CHARS: usize = 100;
const JSON_LD_PREFERRED_OVER_MAIN_CONTENT_CHARS: usize = 200;

/// Approximate chars-per-token used to turn a `budget` (tokens) into an HTML
/// pre-truncation length (spec.md §4.2 Stage 5).
const BUDGET_CHARS_PER_TOKEN: usize = 12;
/// If pre-truncation collapses output below this floor, and the untruncated
/// body was substantial, retry on the full body rather than ship a stub.
const SAFETY_RETRY_MIN_CONTENT_CHARS: usize = 200;
const SAFETY_RETRY_HTML_LEN_FLOOR: usize = 20_000;

const BLOCK_BOUNDARY_TAGS: [&str; 4] = ["</p>", "</div>", "</li>", "</tr>"];

/// Fixed quality scores from spec.md §3's table.
const DOCUMENT_QUALITY: f64 = 1.0;
const JSON_LD_QUALITY: f64 = 0.95;
const MAIN_CONTENT_QUALITY: f64 = 0.85;
const FALLBACK_HTML_QUALITY: f64 = 0.55;
const LITE_QUALITY: f64 = 0.5;
const JSON_QUALITY: f64 = 1.0;
const XML_FEED_QUALITY: f64 = 0.9;
const TEXT_QUALITY: f64 = 1.0;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s"'<>\)\]]+"#).unwrap());
static FEED_TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("channel > title, feed > title").unwrap());
static FEED_ITEM_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("item, entry").unwrap());
static ITEM_TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static ITEM_LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("link").unwrap());
static ITEM_DESC_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("description, summary, content").unwrap());

fn sniff_document_kind(content_type: &str, raw: &[u8]) -> DocumentKind {
    if content_type.contains("pdf") || raw.starts_with(b"%PDF-") {
        DocumentKind::Pdf
    } else {
        DocumentKind::Docx
    }
}

/// Pull every http(s) URL out of a plain-text or JSON body via regex, the
/// way spec.md §4.2 Stage 5 requires for those two content types (no DOM to
/// walk, so no `webpeel_html::extract_links`).
fn harvest_urls(ctx: &mut PipelineContext, text: &str) {
    for m in URL_RE.find_iter(text) {
        let candidate = m.as_str().trim_end_matches(|c: char| ".,;:!?)]}'\"".contains(c));
        if let Ok(url) = url::Url::parse(candidate) {
            ctx.add_link(&url);
        }
    }
}

/// Truncate `html` to at most `max_chars` characters, preferring to cut
/// right after the last block-level closing tag inside that window so the
/// markdown converter never sees a half-open element.
fn truncate_at_block_boundary(html: &str, max_chars: usize) -> String {
    if html.chars().count() <= max_chars {
        return html.to_string();
    }
    let cut_byte = html.char_indices().nth(max_chars).map(|(i, _)| i).unwrap_or(html.len());
    let window = &html[..cut_byte];
    let boundary = BLOCK_BOUNDARY_TAGS
        .iter()
        .filter_map(|tag| window.rfind(tag).map(|pos| pos + tag.len()))
        .max();
    match boundary {
        Some(pos) => window[..pos].to_string(),
        None => window.to_string(),
    }
}

fn parse_document(ctx: &mut PipelineContext) {
    let Some(fetch_result) = ctx.fetch_result.clone() else {
        ctx.warn("document content type with no fetch result");
        return;
    };
    let Some(raw) = &fetch_result.raw else {
        ctx.warn("document content type with no raw bytes captured");
        return;
    };
    let kind = sniff_document_kind(&fetch_result.content_type, raw);

    match decode_document(raw, kind) {
        Ok(doc) => {
            if ctx.title.is_none() {
                ctx.title = doc.metadata.get("title").cloned();
            }
            for (k, v) in doc.metadata {
                ctx.metadata.insert(k, v);
            }
            ctx.content = html_to_markdown(&doc.html, &ConvertOptions::default());
            ctx.quality = DOCUMENT_QUALITY;
        }
        Err(e) => {
            ctx.warn(format!("document decode failed: {e}"));
            ctx.quality = 0.0;
        }
    }
}

/// Lite path (spec.md §4.2 Stage 5): skip main-content detection, density
/// pruning, and JSON-LD, apply the caller's CSS selector if any, convert
/// straight to markdown, and keep only the `<title>`.
fn parse_html_lite(ctx: &mut PipelineContext, html: &str) {
    let doc = Html::parse_document(html);
    if ctx.title.is_none() {
        ctx.title = extract_title(&doc);
    }

    let selected_html = match &ctx.options.selector {
        Some(raw_selector) => match Selector::parse(raw_selector) {
            Ok(selector) => {
                let joined: String = doc.select(&selector).map(|el| el.html()).collect::<Vec<_>>().join("\n");
                if joined.is_empty() {
                    html.to_string()
                } else {
                    joined
                }
            }
            Err(_) => {
                ctx.warn(format!("invalid selector '{raw_selector}', ignoring"));
                html.to_string()
            }
        },
        None => html.to_string(),
    };

    ctx.content = html_to_markdown(&selected_html, &ConvertOptions::default());
    ctx.quality = LITE_QUALITY;
}

fn parse_html(ctx: &mut PipelineContext) {
    let Some(fetch_result) = ctx.fetch_result.clone() else {
        ctx.warn("html content type with no fetch result");
        return;
    };
    let html = &fetch_result.html;

    if ctx.options.lite {
        parse_html_lite(ctx, html);
        return;
    }

    let processed = process(html, &ctx.url);

    if ctx.title.is_none() {
        ctx.title = processed.title.clone();
    }
    for (k, v) in processed.meta {
        ctx.metadata.entry(k).or_insert(v);
    }
    for link in &processed.links {
        ctx.add_link(link);
    }
    if ctx.options.images {
        ctx.images = processed.images.clone();
    }

    let body_html = processed.main_content_html.clone().unwrap_or_else(|| html.clone());
    let should_prune =
        body_html.len() >= PRUNE_MIN_HTML_LEN && !ctx.options.full_page && ctx.options.format == Format::Markdown;
    let (body_html, pruned_percent) = if should_prune { prune(&body_html) } else { (body_html, 0.0) };
    if pruned_percent > 0.0 {
        ctx.pruned_percent = Some(pruned_percent);
    }

    // Budget pre-truncation: trims the HTML fed to the converter rather than
    // the markdown output, so block structure survives the cut. Skipped
    // when a question is set — question-answering needs the full body to
    // search for the answer in.
    let untruncated_len = body_html.len();
    let html_to_convert = match (ctx.options.budget, &ctx.options.question) {
        (Some(budget), None) => truncate_at_block_boundary(&body_html, budget as usize * BUDGET_CHARS_PER_TOKEN),
        _ => body_html.clone(),
    };

    let convert_opts = ConvertOptions {
        include_images: ctx.options.images,
        include_iframes: ctx.options.include_iframes,
        render_forms: false,
    };
    ctx.content = html_to_markdown(&html_to_convert, &convert_opts);

    if ctx.content.trim().chars().count() < SAFETY_RETRY_MIN_CONTENT_CHARS && untruncated_len > SAFETY_RETRY_HTML_LEN_FLOOR
    {
        ctx.warn("budget pre-truncation produced too little content, retrying on the full body");
        ctx.content = html_to_markdown(&body_html, &convert_opts);
    }

    // HTML, JSON-LD first: a sufficiently rich JSON-LD block wins over a
    // thin main-content extraction (spec.md §4.5).
    let mut used_json_ld = false;
    if let Some(primary) = json_ld::primary_entry(&processed.json_ld, JSON_LD_MIN_CONTENT_CHARS) {
        ctx.json_ld_type = primary.type_name();
        if ctx.content.trim().chars().count() < JSON_LD_PREFERRED_OVER_MAIN_CONTENT_CHARS {
            ctx.content = json_ld::normalized_content(&primary.value);
            used_json_ld = true;
        }
    }

    ctx.quality = if used_json_ld {
        JSON_LD_QUALITY
    } else if processed.main_content_html.is_some() {
        MAIN_CONTENT_QUALITY
    } else {
        FALLBACK_HTML_QUALITY
    };
}

fn parse_json(ctx: &mut PipelineContext) {
    let Some(fetch_result) = ctx.fetch_result.clone() else {
        return;
    };
    let pretty = serde_json::from_str::<serde_json::Value>(&fetch_result.html)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| fetch_result.html.clone());
    harvest_urls(ctx, &fetch_result.html);
    ctx.content = format!("```json\n{pretty}\n```");
    ctx.quality = JSON_QUALITY;
}

/// Extract the first `limit` chars of `text`, collapsing internal
/// whitespace runs so a feed description reads as one line.
fn truncate_description(text: &str, limit: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(limit).collect()
}

fn feed_item_link(item: scraper::ElementRef) -> Option<String> {
    item.select(&ITEM_LINK_SELECTOR).next().and_then(|el| {
        if let Some(href) = el.value().attr("href") {
            return Some(href.to_string());
        }
        let text = el.text().collect::<String>();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// RSS/Atom feed-item extraction (spec.md §4.2 Stage 5): emit a channel
/// heading followed by one `##` section per item, and surface every item
/// link into `ctx.links`.
fn parse_xml(ctx: &mut PipelineContext) {
    let Some(fetch_result) = ctx.fetch_result.clone() else {
        return;
    };
    let raw = fetch_result.html.trim();
    let doc = Html::parse_document(raw);

    let channel_title = doc
        .select(&FEED_TITLE_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let mut out = String::new();
    if let Some(title) = &channel_title {
        out.push_str(&format!("# {title}\n\n"));
    }

    for item in doc.select(&FEED_ITEM_SELECTOR) {
        let title = item
            .select(&ITEM_TITLE_SELECTOR)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let link = feed_item_link(item).unwrap_or_default();
        let description = item
            .select(&ITEM_DESC_SELECTOR)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default();

        out.push_str(&format!("## {title}\n{link}\n{}\n\n", truncate_description(&description, 200)));

        if !link.is_empty() {
            if let Ok(url) = url::Url::parse(&link) {
                ctx.add_link(&url);
            }
        }
    }

    ctx.content = out.trim_end().to_string();
    ctx.quality = XML_FEED_QUALITY;
}

fn parse_text(ctx: &mut PipelineContext) {
    if ctx.domain_api_handled {
        // Already final content from Stage 2/3; nothing left to parse.
        return;
    }
    if let Some(fetch_result) = ctx.fetch_result.clone() {
        harvest_urls(ctx, &fetch_result.html);
        ctx.content = fetch_result.html;
        ctx.quality = TEXT_QUALITY;
    }
}

/// Run stage 5 in place.
#[instrument(skip(ctx), fields(url = %ctx.url))]
pub fn parse(ctx: &mut PipelineContext) {
    match ctx.content_type {
        Some(ContentType::Document) => parse_document(ctx),
        Some(ContentType::Html) => parse_html(ctx),
        Some(ContentType::Json) => parse_json(ctx),
        Some(ContentType::Xml) => parse_xml(ctx),
        Some(ContentType::Text) | None => parse_text(ctx),
    }
    ctx.mark("parse_content");
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpeel_types::{FetchMethod, FetchResult, PeelOptions};

    fn ctx_with(content_type: ContentType, html: &str) -> PipelineContext {
        let mut ctx = PipelineContext::new(url::Url::parse("https://example.com/page").unwrap(), PeelOptions::default());
        ctx.content_type = Some(content_type);
        ctx.fetch_result = Some(FetchResult {
            html: html.to_string(),
            raw: None,
            final_url: ctx.url.clone(),
            status: 200,
            content_type: "text/html".to_string(),
            method: FetchMethod::Simple,
            screenshot: None,
            headers: Default::default(),
            challenge_detected: false,
        });
        ctx
    }

    #[test]
    fn parses_article_html_into_markdown() {
        let html = r#"<html><head><title>Story</title></head><body>
            <article><h1>Story</h1><p>A long enough paragraph of substantive article content to dominate the page for this test to pass reliably.</p></article>
        </body></html>"#;
        let mut ctx = ctx_with(ContentType::Html, html);
        parse(&mut ctx);
        assert_eq!(ctx.title.as_deref(), Some("Story"));
        assert!(ctx.content.contains("substantive article content"));
        assert_eq!(ctx.quality, MAIN_CONTENT_QUALITY);
    }

    #[test]
    fn json_ld_quality_is_not_clobbered_by_main_content_score() {
        let html = r#"<html><head><title>Recipe</title>
            <script type="application/ld+json">{"@type":"Recipe","name":"Soup","description":"A hearty soup recipe with a rich broth, tender vegetables, and a generous handful of fresh herbs stirred in at the very end.","recipeIngredient":["salt","water"]}</script>
        </head><body><article><p>short</p></article></body></html>"#;
        let mut ctx = ctx_with(ContentType::Html, html);
        parse(&mut ctx);
        assert_eq!(ctx.quality, JSON_LD_QUALITY);
    }

    #[test]
    fn pretty_prints_json() {
        let mut ctx = ctx_with(ContentType::Json, r#"{"a":1,"link":"https://example.com/a"}"#);
        parse(&mut ctx);
        assert!(ctx.content.starts_with("```json"));
        assert!(ctx.content.contains("\"a\": 1"));
        assert_eq!(ctx.quality, JSON_QUALITY);
        assert_eq!(ctx.links().len(), 1);
    }

    #[test]
    fn domain_api_handled_text_is_left_untouched() {
        let mut ctx = ctx_with(ContentType::Text, "ignored");
        ctx.domain_api_handled = true;
        ctx.content = "already final".to_string();
        parse(&mut ctx);
        assert_eq!(ctx.content, "already final");
    }

    #[test]
    fn text_harvests_urls_and_gets_full_quality() {
        let mut ctx = ctx_with(ContentType::Text, "see https://example.com/report (and https://example.com/appendix).");
        parse(&mut ctx);
        assert_eq!(ctx.quality, TEXT_QUALITY);
        assert_eq!(ctx.links().len(), 2);
    }

    #[test]
    fn parses_rss_feed_items() {
        let rss = r#"<rss><channel><title>Example Feed</title>
            <item><title>First Post</title><link>https://example.com/first</link><description>Summary of the first post.</description></item>
            <item><title>Second Post</title><link>https://example.com/second</link><description>Summary of the second post.</description></item>
        </channel></rss>"#;
        let mut ctx = ctx_with(ContentType::Xml, rss);
        parse(&mut ctx);
        assert_eq!(ctx.quality, XML_FEED_QUALITY);
        assert!(ctx.content.starts_with("# Example Feed"));
        assert!(ctx.content.contains("## First Post"));
        assert!(ctx.content.contains("## Second Post"));
        assert_eq!(ctx.links().len(), 2);
    }

    #[test]
    fn lite_mode_skips_main_content_and_caps_quality() {
        let html = r#"<html><head><title>Story</title></head><body>
            <nav>Home</nav>
            <article><p>A long enough paragraph of substantive article content to dominate the page for this test to pass reliably.</p></article>
        </body></html>"#;
        let mut ctx = ctx_with(ContentType::Html, html);
        ctx.options.lite = true;
        parse(&mut ctx);
        assert_eq!(ctx.title.as_deref(), Some("Story"));
        assert_eq!(ctx.quality, LITE_QUALITY);
        assert!(ctx.content.contains("substantive article content"));
        assert!(ctx.content.contains("Home"));
    }

    #[test]
    fn lite_mode_applies_caller_selector() {
        let html = r#"<html><head><title>Story</title></head><body>
            <nav>Home</nav>
            <article id="body"><p>Only this paragraph should show up in the output.</p></article>
        </body></html>"#;
        let mut ctx = ctx_with(ContentType::Html, html);
        ctx.options.lite = true;
        ctx.options.selector = Some("#body".to_string());
        parse(&mut ctx);
        assert!(ctx.content.contains("Only this paragraph"));
        assert!(!ctx.content.contains("Home"));
    }

    #[test]
    fn budget_pre_truncation_cuts_at_block_boundary() {
        let html = "<p>keep</p><div>drop-me-entirely-past-the-boundary</div>";
        let truncated = truncate_at_block_boundary(html, 15);
        assert_eq!(truncated, "<p>keep</p>");
    }

    #[test]
    fn budget_pre_truncation_is_noop_under_budget() {
        let html = "<p>short</p>";
        let truncated = truncate_at_block_boundary(html, 100);
        assert_eq!(truncated, html);
    }
}
