//! Stage 6 — PostProcess (spec.md §4.2, §4.6, SPEC_FULL.md §F): structured
//! extraction, readability, quick-answer, budget distillation, the
//! `maxTokens` hard cap, and a last-resort zero-content safety net.

use std::collections::HashMap;
use std::sync::Arc;

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{instrument, warn};
use webpeel_challenge::visible_text;
use webpeel_extraction::distill::{derive_query, distill, estimate_tokens_pub, head_truncate_at_word_boundary};
use webpeel_extraction::quick_answer::extract_quick_answer;
use webpeel_extraction::auto_extract;
use webpeel_html::{json_ld, readability};
use webpeel_search::{search_proxy, SearchChain};
use webpeel_types::context::ContentType;
use webpeel_types::options::ExtractSchema;
use webpeel_types::{FetchMethod, FetchResult, PipelineContext};

use crate::registry::DomainExtractorRegistry;

/// Stage 6 point 8's challenge-re-detection lexicon (spec.md §4.2, Stage 6
/// item 8) — deliberately distinct wording from
/// `webpeel_challenge::signals::GENERIC_BLOCK_PHRASES`, since this check
/// runs against already-converted markdown content rather than raw HTML.
const CHALLENGE_REDETECTION_LEXICON: &[&str] = &[
    "verify you are human",
    "cloudflare",
    "ray id",
    "captcha",
    "just a moment",
    "access denied",
    "403",
    "404",
    "bot protection",
];

const META_DESCRIPTION_RESCUE_QUALITY: f64 = 0.3;
const RAW_TEXT_RESCUE_QUALITY: f64 = 0.2;
const RAW_TEXT_RESCUE_CAP_CHARS: usize = 10_000;
const SEARCH_FALLBACK_QUALITY: f64 = 0.4;

/// Known auto-extract schema names (SPEC_FULL.md §F). A caller names one of
/// these via `extract: {"$schema": "pricing"}` style LLM-schema payloads
/// when they have no structured LLM provider configured — a deliberate
/// simplification over true BYOK LLM extraction (see DESIGN.md).
const AUTO_EXTRACT_SCHEMAS: &[&str] = &["pricing", "products", "contact", "article", "api_docs"];

/// Below this many visible characters, final content is treated as
/// suspiciously thin regardless of how it got that way (spec.md §4.2 Stage
/// 6's "challenge re-detection" note). Chosen once, applied everywhere in
/// this stage rather than spec.md's two candidate values (2000 vs 100).
const SUSPICIOUSLY_SMALL_CONTENT_CHARS: usize = 200;

fn parsed_original_html(ctx: &PipelineContext) -> Option<Html> {
    let fetch_result = ctx.fetch_result.as_ref()?;
    if fetch_result.html.trim().is_empty() {
        return None;
    }
    Some(Html::parse_document(&fetch_result.html))
}

fn run_selector_extraction(doc: &Html, selectors: &HashMap<String, String>) -> Value {
    let mut out = serde_json::Map::new();
    for (field, selector_str) in selectors {
        let value = Selector::parse(selector_str)
            .ok()
            .and_then(|sel| doc.select(&sel).next())
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());
        out.insert(field.clone(), value.map(Value::String).unwrap_or(Value::Null));
    }
    Value::Object(out)
}

fn run_auto_extract_schema(doc: &Html, schema: &str, title: Option<String>) -> Option<Value> {
    match schema {
        "pricing" => auto_extract::extract_pricing(doc),
        "products" => auto_extract::extract_products(doc),
        "contact" => auto_extract::extract_contact(doc),
        "article" => auto_extract::extract_article(doc, title),
        "api_docs" => auto_extract::extract_api_docs(doc),
        _ => None,
    }
}

fn run_structured_extraction(ctx: &mut PipelineContext) {
    let Some(schema) = ctx.options.extract.clone() else {
        return;
    };
    let Some(doc) = parsed_original_html(ctx) else {
        ctx.warn("extract requested but no HTML was available to select against");
        return;
    };

    match schema {
        ExtractSchema::Selectors(selectors) if !selectors.is_empty() => {
            let value = run_selector_extraction(&doc, &selectors);
            ctx.extracted_fields.insert("selectors".to_string(), value);
        }
        ExtractSchema::LlmSchema(Value::String(name)) if AUTO_EXTRACT_SCHEMAS.contains(&name.as_str()) => {
            match run_auto_extract_schema(&doc, &name, ctx.title.clone()) {
                Some(value) => {
                    ctx.extracted_fields.insert(name, value);
                }
                None => ctx.warn(format!("auto-extract schema '{name}' found nothing on this page")),
            }
        }
        ExtractSchema::LlmSchema(_) => {
            ctx.warn("LLM-schema extraction requires a configured LLM provider; skipped (downstream-optional)");
        }
        ExtractSchema::Selectors(_) => {
            ctx.warn("extract selectors map was empty");
        }
    }
}

fn run_readability(ctx: &mut PipelineContext) {
    if !ctx.options.readable {
        return;
    }
    let Some(doc) = parsed_original_html(ctx) else {
        return;
    };
    ctx.readability = readability::extract(&doc, ctx.title.clone());
}

fn run_quick_answer(ctx: &mut PipelineContext) {
    let Some(question) = ctx.options.question.clone() else {
        return;
    };
    let raw_text = ctx
        .fetch_result
        .as_ref()
        .filter(|_| matches!(ctx.content_type, Some(ContentType::Html)))
        .map(|r| visible_text(&r.html));
    ctx.quick_answer = extract_quick_answer(&ctx.content, &question, raw_text.as_deref());
}

fn run_budget_distillation(ctx: &mut PipelineContext) {
    let Some(budget) = ctx.options.budget else {
        return;
    };
    let query = ctx
        .options
        .question
        .clone()
        .unwrap_or_else(|| derive_query(ctx.title.as_deref(), &ctx.content));
    let outcome = distill(&ctx.content, budget, &query);
    ctx.content = outcome.content;
    ctx.budget_fallback = Some(outcome.budget_fallback);
    if let Some(warning) = outcome.warning {
        ctx.warn(warning);
    }
}

/// `maxTokens` is a hard ceiling applied after budget distillation, whether
/// or not a budget ran — it is the caller's absolute cap, distinct from
/// `budget`'s soft target (spec.md Open Question: ordering between the two
/// resolved as budget-then-maxTokens).
fn apply_max_tokens_cap(ctx: &mut PipelineContext) {
    let Some(max_tokens) = ctx.options.max_tokens else {
        return;
    };
    if estimate_tokens_pub(&ctx.content) > max_tokens {
        ctx.content = head_truncate_at_word_boundary(&ctx.content, max_tokens);
        ctx.warn("content truncated to maxTokens");
    }
}

/// Pure lexicon match used by Stage 6 item 8's challenge re-detection —
/// split out from `redetect_suspiciously_small_content` so it is testable
/// without driving the search-as-proxy fallback it gates.
fn content_matches_challenge_lexicon(content: &str) -> bool {
    let lower = content.to_lowercase();
    CHALLENGE_REDETECTION_LEXICON.iter().any(|needle| lower.contains(needle))
}

/// Re-examine final content for signs the fetch was actually blocked even
/// though the post-fetch challenge classifier didn't catch it (e.g. a
/// generic block page with too little text to trip the lexical gate).
/// Spec.md §4.2 Stage 6 item 8: below the suspiciously-small threshold AND
/// containing challenge-lexicon terms, mark `blocked` and retry via
/// search-as-proxy; otherwise just note the content is thin.
async fn redetect_suspiciously_small_content(search_chain: &SearchChain, ctx: &mut PipelineContext) {
    if ctx.domain_api_handled || ctx.blocked {
        return;
    }
    if ctx.content.trim().chars().count() >= SUSPICIOUSLY_SMALL_CONTENT_CHARS {
        return;
    }

    let matched = content_matches_challenge_lexicon(&ctx.content);
    if !matched {
        ctx.warn("final content is suspiciously small; page may have been partially blocked");
        ctx.quality = ctx.quality.min(0.3);
        return;
    }

    ctx.blocked = true;
    ctx.warn("parsed content matches challenge lexicon after the fact; attempting search-as-proxy fallback");
    if let Some(proxy) = search_proxy(search_chain, &ctx.url).await {
        ctx.title = Some(proxy.title);
        ctx.content = proxy.cached_content;
        ctx.metadata.insert("source".to_string(), proxy.source);
        ctx.quality = SEARCH_FALLBACK_QUALITY;
        ctx.warn("recovered content via search-as-proxy fallback after late challenge detection");
    } else {
        ctx.quality = ctx.quality.min(0.3);
        ctx.warn("search-as-proxy fallback found nothing for late-detected challenge page");
    }
}

/// Last-resort recovery when Stage 5 produced nothing at all (spec.md §4.2
/// Stage 6 item 9, "Zero-token safety net"). Order: retry the domain
/// extractor registry once more (a host may apply but have missed the
/// pre-fetch min-length floor only because the ordinary fetch also
/// failed — a reinterpretation of the source's "domain extractor post-fetch
/// variant", recorded in DESIGN.md) → JSON-LD rescue → meta-description +
/// title → raw-HTML-to-text capped at 10k chars → search-as-proxy. Every
/// path records which fallback fired, per spec.md §7's propagation policy.
async fn zero_content_safety_net(registry: &DomainExtractorRegistry, search_chain: &SearchChain, ctx: &mut PipelineContext) {
    if estimate_tokens_pub(&ctx.content) > 0 {
        return;
    }

    if !ctx.domain_api_handled {
        if let Some(extractor) = registry.find(&ctx.url) {
            if let Ok(content) = extractor.fetch(&ctx.url).await {
                if !content.content.trim().is_empty() {
                    ctx.title = ctx.title.clone().or(content.title);
                    ctx.content = content.content;
                    ctx.domain_data = Some(content.raw);
                    ctx.quality = ctx.quality.max(0.6);
                    ctx.warn("recovered content via domain extractor after empty primary extraction");
                    return;
                }
            }
        }
    }

    if let Some(doc) = parsed_original_html(ctx) {
        let entries = json_ld::extract_json_ld(&doc);
        if let Some(entry) = entries.first() {
            let rescued = json_ld::normalized_content(&entry.value);
            if !rescued.trim().is_empty() {
                ctx.content = rescued;
                ctx.warn("recovered content via JSON-LD rescue after empty primary extraction");
                return;
            }
        }
    }

    let meta_description = ctx.metadata.get("description").cloned();
    if meta_description.as_deref().is_some_and(|d| !d.trim().is_empty()) || ctx.title.is_some() {
        let mut rescued = String::new();
        if let Some(title) = &ctx.title {
            rescued.push_str(&format!("# {title}\n\n"));
        }
        if let Some(description) = &meta_description {
            rescued.push_str(description.trim());
        }
        if !rescued.trim().is_empty() {
            ctx.content = rescued;
            ctx.quality = META_DESCRIPTION_RESCUE_QUALITY;
            ctx.warn("recovered content via meta-description and title after empty primary extraction");
            return;
        }
    }

    if let Some(fetch_result) = ctx.fetch_result.clone() {
        if !fetch_result.html.trim().is_empty() {
            let text = visible_text(&fetch_result.html);
            let capped: String = text.chars().take(RAW_TEXT_RESCUE_CAP_CHARS).collect();
            if !capped.trim().is_empty() {
                ctx.content = capped;
                ctx.quality = RAW_TEXT_RESCUE_QUALITY;
                ctx.warn("recovered content via raw HTML text extraction after empty primary extraction");
                return;
            }
        }
    }

    if let Some(proxy) = search_proxy(search_chain, &ctx.url).await {
        ctx.title = ctx.title.clone().or(Some(proxy.title));
        ctx.content = proxy.cached_content;
        ctx.metadata.insert("source".to_string(), proxy.source);
        ctx.quality = SEARCH_FALLBACK_QUALITY;
        ctx.fetch_result = ctx.fetch_result.clone().or(Some(FetchResult {
            html: String::new(),
            raw: None,
            final_url: ctx.url.clone(),
            status: 200,
            content_type: "text/markdown".to_string(),
            method: FetchMethod::SearchFallback,
            screenshot: None,
            headers: Default::default(),
            challenge_detected: true,
        }));
        ctx.warn("recovered content via search-as-proxy fallback after every other rescue found nothing");
        return;
    }

    warn!(url = %ctx.url, "no extractable content found after every recovery path");
    ctx.warn("no extractable content found on this page; try render: true, stealth: true, or check for an auth requirement");
}

/// Run stage 6 in place.
#[instrument(skip(registry, search_chain, ctx), fields(url = %ctx.url))]
pub async fn process(registry: &DomainExtractorRegistry, search_chain: &Arc<SearchChain>, ctx: &mut PipelineContext) {
    run_structured_extraction(ctx);
    run_readability(ctx);
    run_quick_answer(ctx);
    run_budget_distillation(ctx);
    apply_max_tokens_cap(ctx);
    redetect_suspiciously_small_content(search_chain, ctx).await;
    zero_content_safety_net(registry, search_chain, ctx).await;
    ctx.mark("post_process");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DomainExtractorRegistry;
    use webpeel_types::PeelOptions;

    fn no_network_search_chain() -> Arc<SearchChain> {
        Arc::new(SearchChain::new(None, None, None))
    }

    fn ctx_with_content(content: &str) -> PipelineContext {
        let mut ctx = PipelineContext::new(url::Url::parse("https://example.com/page").unwrap(), PeelOptions::default());
        ctx.content = content.to_string();
        ctx.content_type = Some(ContentType::Html);
        ctx.fetch_result = Some(FetchResult {
            html: format!("<html><body><p>{content}</p></body></html>"),
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

    #[tokio::test]
    async fn budget_distillation_shrinks_long_content() {
        let mut long = String::new();
        for i in 0..80 {
            long.push_str(&format!("Paragraph {i} has some filler words about nothing in particular today.\n\n"));
        }
        let mut ctx = ctx_with_content(&long);
        ctx.options.budget = Some(50);
        let registry = DomainExtractorRegistry::new(Vec::new());
        let search_chain = no_network_search_chain();
        process(&registry, &search_chain, &mut ctx).await;
        assert!(estimate_tokens_pub(&ctx.content) <= 60);
    }

    #[tokio::test]
    async fn max_tokens_caps_even_without_budget() {
        let long = "word ".repeat(2000);
        let mut ctx = ctx_with_content(&long);
        ctx.options.max_tokens = Some(20);
        let registry = DomainExtractorRegistry::new(Vec::new());
        let search_chain = no_network_search_chain();
        process(&registry, &search_chain, &mut ctx).await;
        assert!(estimate_tokens_pub(&ctx.content) <= 21);
    }

    #[tokio::test]
    async fn quick_answer_populated_when_question_set() {
        let mut ctx = ctx_with_content("# Doc\n\nThe capital of France is Paris.\n\nMore filler text here.");
        ctx.options.question = Some("What is the capital of France?".to_string());
        let registry = DomainExtractorRegistry::new(Vec::new());
        let search_chain = no_network_search_chain();
        process(&registry, &search_chain, &mut ctx).await;
        assert!(ctx.quick_answer.is_some());
    }

    #[tokio::test]
    async fn small_content_lowers_quality() {
        let mut ctx = ctx_with_content("short");
        let registry = DomainExtractorRegistry::new(Vec::new());
        let search_chain = no_network_search_chain();
        ctx.quality = 0.9;
        process(&registry, &search_chain, &mut ctx).await;
        assert!(ctx.quality <= 0.3);
    }

    #[test]
    fn challenge_lexicon_matches_known_phrases_only() {
        assert!(content_matches_challenge_lexicon("Please verify you are human to continue."));
        assert!(content_matches_challenge_lexicon("Checking your browser — Ray ID: 1234"));
        assert!(!content_matches_challenge_lexicon("A normal article about gardening and tomatoes."));
    }

    #[tokio::test]
    async fn meta_description_rescues_empty_content() {
        let mut ctx = ctx_with_content("");
        ctx.content = String::new();
        ctx.fetch_result.as_mut().unwrap().html = String::new();
        ctx.title = Some("Example Page".to_string());
        ctx.metadata.insert("description".to_string(), "A page about examples.".to_string());
        let registry = DomainExtractorRegistry::new(Vec::new());
        let search_chain = no_network_search_chain();
        process(&registry, &search_chain, &mut ctx).await;
        assert!(ctx.content.contains("Example Page"));
        assert!(ctx.content.contains("A page about examples."));
        assert_eq!(ctx.quality, META_DESCRIPTION_RESCUE_QUALITY);
    }

    #[tokio::test]
    async fn raw_text_rescues_empty_content_when_no_metadata() {
        let mut ctx = ctx_with_content("");
        ctx.content = String::new();
        ctx.fetch_result.as_mut().unwrap().html =
            "<html><body><p>Rendered client-side content that the parser missed.</p></body></html>".to_string();
        let registry = DomainExtractorRegistry::new(Vec::new());
        let search_chain = no_network_search_chain();
        process(&registry, &search_chain, &mut ctx).await;
        assert!(ctx.content.contains("Rendered client-side content"));
        assert_eq!(ctx.quality, RAW_TEXT_RESCUE_QUALITY);
    }
}
