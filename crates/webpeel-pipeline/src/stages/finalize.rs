//! Stage 7 — Finalize (spec.md §4.2, §4.8, §E): screenshot encoding,
//! branding extraction from a still-open page, change-tracking fingerprint
//! comparison, and the (LLM-gated, currently stubbed) AI summary.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use tracing::{instrument, warn};
use webpeel_fetch::browser::PageHandle;
use webpeel_types::registry::StoredBaseline;
use webpeel_types::search::normalize_url_key;
use webpeel_types::{BrandingProfile, ChangeTrackingResult, ChangeTrackingStore, PipelineContext};

use crate::fingerprint::fingerprint;

const BRANDING_SCRIPT: &str = r#"(() => {
  const body = getComputedStyle(document.body);
  const logo = document.querySelector('img[class*="logo" i], img[id*="logo" i], header img, a[href="/"] img');
  return {
    primary_color: body.backgroundColor || null,
    secondary_color: body.color || null,
    logo_url: logo ? logo.src : null,
    font_family: body.fontFamily || null,
  };
})()"#;

fn encode_screenshot(ctx: &mut PipelineContext) {
    let Some(bytes) = ctx.fetch_result.as_ref().and_then(|r| r.screenshot.as_ref()) else {
        return;
    };
    ctx.screenshot_base64 = Some(BASE64.encode(bytes));
}

async fn run_branding(page: Option<&dyn PageHandle>, ctx: &mut PipelineContext) {
    if !ctx.options.branding {
        return;
    }
    let Some(page) = page else {
        ctx.warn("branding requested but no live page survived to finalize");
        return;
    };
    match page.evaluate(BRANDING_SCRIPT).await {
        Ok(value) => ctx.branding = Some(parse_branding(value)),
        Err(e) => ctx.warn(format!("branding extraction failed: {e}")),
    }
}

fn parse_branding(value: Value) -> BrandingProfile {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    };
    BrandingProfile {
        primary_color: field("primary_color"),
        secondary_color: field("secondary_color"),
        logo_url: field("logo_url"),
        font_family: field("font_family"),
    }
}

async fn run_change_tracking(store: &Arc<dyn ChangeTrackingStore>, ctx: &mut PipelineContext) {
    if !ctx.options.change_tracking {
        return;
    }
    let key = normalize_url_key(&ctx.url);
    let current = fingerprint(&ctx.content);
    let previous = store.get(&key).await;
    let changed = previous.as_ref().map(|b| b.fingerprint != current).unwrap_or(true);
    let last_checked = previous.as_ref().map(|b| b.timestamp);
    let previous_fingerprint = previous.as_ref().map(|b| b.fingerprint.clone());

    ctx.change_tracking = Some(ChangeTrackingResult {
        changed,
        previous_fingerprint,
        current_fingerprint: current.clone(),
        last_checked,
    });

    store
        .put(
            &key,
            StoredBaseline {
                fingerprint: current,
                timestamp: chrono::Utc::now(),
                last_diff: None,
            },
        )
        .await;
}

/// AI summary requires an LLM provider; none is wired into this core (no
/// Non-goal excludes it, but no HTTP client for a model provider exists in
/// the dependency stack either) — recorded as downstream-optional rather
/// than implemented against a specific vendor (see DESIGN.md).
fn run_summary(ctx: &mut PipelineContext) {
    if !ctx.options.summary {
        return;
    }
    ctx.warn("summary requested but no LLM provider is configured; skipped (downstream-optional)");
}

/// Run stage 7 in place. `page` is the optional live handle threaded
/// through `peel()` from Stage 3 (spec.md §9 resource-guard note); the
/// caller closes it after this stage returns regardless of outcome.
#[instrument(skip(store, page, ctx), fields(url = %ctx.url))]
pub async fn finalize(
    store: &Arc<dyn ChangeTrackingStore>,
    page: Option<&dyn PageHandle>,
    ctx: &mut PipelineContext,
) {
    encode_screenshot(ctx);
    run_branding(page, ctx).await;
    run_change_tracking(store, ctx).await;
    run_summary(ctx);
    if let Some(page) = page {
        if let Err(e) = page.close().await {
            warn!(error = %e, "failed to close page handle during finalize");
        }
    }
    ctx.mark("finalize");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branding_parses_present_fields_and_drops_empty_ones() {
        let value = serde_json::json!({
            "primary_color": "rgb(255, 255, 255)",
            "secondary_color": "",
            "logo_url": "https://example.com/logo.png",
            "font_family": null,
        });
        let profile = parse_branding(value);
        assert_eq!(profile.primary_color.as_deref(), Some("rgb(255, 255, 255)"));
        assert_eq!(profile.secondary_color, None);
        assert_eq!(profile.logo_url.as_deref(), Some("https://example.com/logo.png"));
        assert_eq!(profile.font_family, None);
    }
}
