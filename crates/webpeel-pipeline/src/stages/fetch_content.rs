//! Stage 3 — FetchContent (spec.md §4.2): domain extractor first, then the
//! Fetch Strategy Engine, then Search-as-Proxy Fallback when the result
//! comes back challenge-blocked.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use webpeel_fetch::browser::PageHandle;
use webpeel_fetch::{FetchEngine, FetchError};
use webpeel_search::{search_proxy, SearchChain};
use webpeel_types::{ErrorKind, FetchMethod, FetchRequest, FetchResult, PeelError, PipelineContext};

use crate::registry::DomainExtractorRegistry;

const DOMAIN_CONTENT_MIN_CHARS: usize = 50;
const SEARCH_FALLBACK_QUALITY: f64 = 0.4;

fn to_peel_error(e: FetchError) -> PeelError {
    match e {
        FetchError::Blocked { url, reason } => PeelError::Blocked { url, reason },
        FetchError::BadStatus { url, status } => PeelError::BadStatus { url, status },
        FetchError::Timeout { url, elapsed_ms } => PeelError::Timeout { url, elapsed_ms },
        FetchError::Network { url, message, source } => PeelError::Network { url, message, source },
        FetchError::EngineUnavailable { message } => PeelError::Fatal { message },
        FetchError::ActionFailed {
            index,
            action_type,
            message,
        } => PeelError::Fatal {
            message: format!("action {index} ({action_type}) failed: {message}"),
        },
    }
}

fn build_request(ctx: &PipelineContext) -> FetchRequest {
    FetchRequest {
        url: ctx.url.clone(),
        render: ctx.options.render,
        stealth: ctx.options.stealth,
        wait_ms: ctx.options.wait_ms,
        user_agent: ctx.options.user_agent.clone(),
        headers: ctx.options.headers.clone(),
        cookies: ctx.options.cookies.clone(),
        actions: ctx.options.actions.clone(),
        timeout_ms: ctx.options.timeout_ms,
        proxies: ctx.options.proxies.clone(),
        viewport: ctx.options.viewport,
        wait_until: ctx.options.wait_until.unwrap_or_default(),
        wait_selector: ctx.options.wait_selector.clone(),
        block_resources: ctx.options.block_resources,
        cloaked: ctx.options.cloaked,
        screenshot: ctx.options.screenshot,
        full_page: ctx.options.full_page,
    }
}

/// Attempt the registered domain extractor for this host, if any. Returns
/// `true` on a usable hit (content short-circuits the normal fetch path).
async fn try_domain_extractor(registry: &DomainExtractorRegistry, ctx: &mut PipelineContext) -> bool {
    let Some(extractor) = registry.find(&ctx.url) else {
        return false;
    };

    match extractor.fetch(&ctx.url).await {
        Ok(content) if content.content.trim().chars().count() >= DOMAIN_CONTENT_MIN_CHARS => {
            info!(extractor = extractor.name(), "domain extractor hit");
            ctx.title = content.title;
            ctx.content = content.content;
            for (k, v) in content.metadata {
                ctx.metadata.insert(k, v);
            }
            ctx.domain_data = Some(content.raw);
            ctx.domain_api_handled = true;
            ctx.quality = 0.95;
            ctx.fetch_result = Some(FetchResult {
                html: String::new(),
                raw: None,
                final_url: ctx.url.clone(),
                status: 200,
                content_type: "text/markdown".to_string(),
                method: FetchMethod::DomainApi,
                screenshot: None,
                headers: Default::default(),
                challenge_detected: false,
            });
            true
        }
        Ok(_) => {
            ctx.warn(format!(
                "domain extractor {} returned content below the {DOMAIN_CONTENT_MIN_CHARS}-char floor, falling through",
                extractor.name()
            ));
            false
        }
        Err(e) => {
            ctx.warn(format!("domain extractor {} failed: {e}", extractor.name()));
            false
        }
    }
}

/// Search-as-proxy fallback (spec.md §4.7): synthesize a degraded document
/// from cached search snippets when the real page came back challenge-
/// blocked. Always quality <= 0.4; skips normal HTML parsing since there is
/// no HTML to parse.
async fn try_search_proxy_fallback(search_chain: &SearchChain, ctx: &mut PipelineContext) -> bool {
    let Some(proxy) = search_proxy(search_chain, &ctx.url).await else {
        return false;
    };
    ctx.title = Some(proxy.title);
    ctx.content = proxy.cached_content;
    ctx.metadata.insert("source".to_string(), proxy.source);
    ctx.quality = SEARCH_FALLBACK_QUALITY;
    ctx.domain_api_handled = true;
    ctx.fetch_result = Some(FetchResult {
        html: String::new(),
        raw: None,
        final_url: ctx.url.clone(),
        status: 200,
        content_type: "text/markdown".to_string(),
        method: FetchMethod::SearchFallback,
        screenshot: None,
        headers: Default::default(),
        challenge_detected: true,
    });
    true
}

/// Run stage 3 in place. Returns any live page handle that survived the
/// fetch (ownership transferred to the caller; consumed by Stage 7's
/// branding/screenshot work, or closed once the pipeline no longer needs
/// it) — kept as an explicit local rather than stored on `ctx` to avoid a
/// `webpeel-types` -> `webpeel-fetch` dependency cycle (spec.md §9
/// resource-guard note).
#[instrument(skip(engine, registry, search_chain, ctx), fields(url = %ctx.url))]
pub async fn fetch(
    engine: &FetchEngine,
    registry: &DomainExtractorRegistry,
    search_chain: &Arc<SearchChain>,
    ctx: &mut PipelineContext,
) -> Result<Option<Box<dyn PageHandle>>, PeelError> {
    if try_domain_extractor(registry, ctx).await {
        ctx.mark("fetch_content");
        return Ok(None);
    }

    let req = build_request(ctx);
    match engine.fetch(&req).await {
        Ok((result, page)) => {
            if result.challenge_detected {
                ctx.blocked = true;
                ctx.warn("challenge detected after fetch, attempting search-as-proxy fallback");
                if let Some(close) = &page {
                    let _ = close.close().await;
                }
                if try_search_proxy_fallback(search_chain, ctx).await {
                    ctx.mark("fetch_content");
                    return Ok(None);
                }
                ctx.warn("search-as-proxy fallback found nothing; returning degraded content as-is");
                ctx.fetch_result = Some(result);
                ctx.mark("fetch_content");
                return Ok(None);
            }
            ctx.fetch_result = Some(result);
            ctx.mark("fetch_content");
            Ok(page)
        }
        Err(e) => {
            let kind = e.kind();
            if kind.is_surfaced() {
                return Err(to_peel_error(e));
            }
            warn!(error = %e, ?kind, "non-surfaced fetch error, attempting search-as-proxy fallback");
            ctx.blocked = matches!(kind, ErrorKind::Blocked);
            ctx.warn(format!("fetch failed: {e}"));
            if try_search_proxy_fallback(search_chain, ctx).await {
                ctx.mark("fetch_content");
                return Ok(None);
            }
            ctx.mark("fetch_content");
            Ok(None)
        }
    }
}
