//! Stage 8 — BuildResult (spec.md §4.2, §6 Outputs): assemble the final
//! `PeelResult`, apply the caller's requested output `Format`, and split
//! into chunks when `chunk=true`.

use tracing::instrument;
use webpeel_extraction::distill::{estimate_tokens_pub, split_passages_pub};
use webpeel_types::options::Format;
use webpeel_types::{PeelResult, PipelineContext, Timing};

use crate::fingerprint::fingerprint;

/// Best-effort markdown -> plain text: drop emphasis/heading markers and
/// collapse link syntax down to its visible label.
fn markdown_to_text(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    for line in markdown.lines() {
        let trimmed = line.trim_start_matches(['#', '>', ' ']).trim_start_matches("- ").trim_start_matches("* ");
        out.push_str(&strip_inline_markdown(trimmed));
        out.push('\n');
    }
    out.trim().to_string()
}

/// Strip `[label](url)` down to `label`, leaving other markdown intact.
fn strip_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '[' {
            let mut label = String::new();
            for next in chars.by_ref() {
                if next == ']' {
                    break;
                }
                label.push(next);
            }
            if chars.peek() == Some(&'(') {
                chars.next();
                for next in chars.by_ref() {
                    if next == ')' {
                        break;
                    }
                }
            }
            out.push_str(&label);
        } else {
            out.push(c);
        }
    }
    out
}

/// `Text` format flattens markdown entirely, dropping emphasis markers too.
fn strip_inline_markdown(text: &str) -> String {
    strip_links(text).replace(['*', '`', '_'], "")
}

fn apply_format(ctx: &PipelineContext) -> String {
    match ctx.format {
        Format::Markdown => ctx.content.clone(),
        Format::Clean => strip_links(&ctx.content),
        Format::Text => markdown_to_text(&ctx.content),
        Format::Html => ctx
            .fetch_result
            .as_ref()
            .map(|r| r.html.clone())
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| wrap_as_html(&ctx.content)),
    }
}

/// No source HTML survived (e.g. domain-extractor or search-proxy content);
/// synthesize a minimal document so `Format::Html` still returns HTML.
fn wrap_as_html(content: &str) -> String {
    let escaped = content.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
    format!("<pre>{escaped}</pre>")
}

fn method_label(ctx: &PipelineContext) -> String {
    ctx.fetch_result
        .as_ref()
        .map(|r| format!("{:?}", r.method))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Run stage 8, consuming `ctx` into the final [`PeelResult`].
#[instrument(skip(ctx), fields(url = %ctx.url))]
pub fn build(mut ctx: PipelineContext) -> PeelResult {
    let method = method_label(&ctx);
    let content_type = ctx
        .fetch_result
        .as_ref()
        .map(|r| r.content_type.clone())
        .unwrap_or_else(|| "text/plain".to_string());
    let status = ctx.fetch_result.as_ref().map(|r| r.status).unwrap_or(200);
    let screenshot = ctx.screenshot_base64.take();
    let link_count = ctx.links().len();
    let links = ctx.links().to_vec();

    let mut content = apply_format(&ctx);
    if status >= 400 && ctx.warnings.is_empty() {
        ctx.warn(format!("upstream responded with status {status}"));
    }

    let chunks = if ctx.options.chunk {
        Some(split_passages_pub(&content))
    } else {
        None
    };

    if let Some(cap) = ctx.options.max_tokens {
        if estimate_tokens_pub(&content) > cap && chunks.is_none() {
            content = content.chars().take(cap as usize * 4).collect();
        }
    }

    let tokens = estimate_tokens_pub(&content);
    let extracted = if ctx.extracted_fields.is_empty() {
        None
    } else {
        Some(serde_json::to_value(&ctx.extracted_fields).unwrap_or(serde_json::Value::Null))
    };

    let timing = Timing {
        marks: ctx.marks().to_vec(),
        total_ms: ctx.elapsed_ms(),
    };

    let warning = ctx.warnings.first().cloned();

    PeelResult {
        url: ctx.url.to_string(),
        title: ctx.title,
        content,
        metadata: ctx.metadata,
        links,
        tokens,
        method,
        elapsed_ms: timing.total_ms,
        screenshot,
        content_type,
        quality: ctx.quality,
        fingerprint: fingerprint(&ctx.content),
        extracted,
        branding: ctx.branding,
        change_tracking: ctx.change_tracking,
        summary: ctx.summary,
        images: ctx.images,
        link_count,
        warning,
        blocked: Some(ctx.blocked),
        pruned_percent: ctx.pruned_percent,
        domain_data: ctx.domain_data,
        readability: ctx.readability,
        quick_answer: ctx.quick_answer,
        timing,
        json_ld_type: ctx.json_ld_type,
        warnings: ctx.warnings,
        chunks,
        budget_fallback: ctx.budget_fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpeel_types::PeelOptions;

    fn ctx_with(content: &str, format: Format) -> PipelineContext {
        let mut opts = PeelOptions::default();
        opts.format = format;
        let mut ctx = PipelineContext::new(url::Url::parse("https://example.com/a").unwrap(), opts);
        ctx.content = content.to_string();
        ctx
    }

    #[test]
    fn markdown_passes_through_unchanged() {
        let ctx = ctx_with("# Title\n\nSome **bold** text.", Format::Markdown);
        let result = build(ctx);
        assert_eq!(result.content, "# Title\n\nSome **bold** text.");
    }

    #[test]
    fn text_format_strips_markdown_syntax() {
        let ctx = ctx_with("# Title\n\nSee [a link](https://x.test) for more.", Format::Text);
        let result = build(ctx);
        assert!(!result.content.contains('#'));
        assert!(!result.content.contains('['));
        assert!(result.content.contains("a link"));
    }

    #[test]
    fn tokens_are_estimated_from_final_content() {
        let ctx = ctx_with("word ".repeat(40).trim(), Format::Markdown);
        let result = build(ctx);
        assert!(result.tokens > 0);
    }

    #[test]
    fn chunking_splits_into_multiple_passages() {
        let mut long = String::new();
        for i in 0..30 {
            long.push_str(&format!("Paragraph {i} with some more filler content for splitting.\n\n"));
        }
        let mut opts = PeelOptions::default();
        opts.chunk = true;
        let mut ctx = PipelineContext::new(url::Url::parse("https://example.com/a").unwrap(), opts);
        ctx.content = long;
        let result = build(ctx);
        assert!(result.chunks.is_some());
    }
}
