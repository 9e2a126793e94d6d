//! Stage 4 — DetectContentType (spec.md §4.2): classify the fetched body so
//! Stage 5 knows which parser to dispatch to.

use webpeel_types::context::ContentType;
use webpeel_types::PipelineContext;

/// Classify `ctx.fetch_result` into a [`ContentType`], in place. Content
/// already synthesized by Stage 2/3 (YouTube, domain extractor, search-proxy
/// fallback) is tagged `Text` since it is already final markdown with
/// nothing left to parse.
pub fn detect(ctx: &mut PipelineContext) {
    if ctx.domain_api_handled {
        ctx.content_type = Some(ContentType::Text);
        ctx.mark("detect_content_type");
        return;
    }

    let Some(fetch_result) = &ctx.fetch_result else {
        ctx.content_type = Some(ContentType::Text);
        ctx.mark("detect_content_type");
        return;
    };

    let content_type = fetch_result.content_type.to_lowercase();
    let detected = if fetch_result.raw.is_some()
        || content_type.contains("pdf")
        || content_type.contains("msword")
        || content_type.contains("officedocument")
    {
        ContentType::Document
    } else if content_type.contains("json") {
        ContentType::Json
    } else if content_type.contains("xml") && !content_type.contains("xhtml") {
        ContentType::Xml
    } else if content_type.contains("text/plain")
        || content_type.contains("markdown")
        || content_type.contains("text/css")
        || content_type.contains("javascript")
    {
        ContentType::Text
    } else if content_type.contains("html") || !fetch_result.html.trim().is_empty() {
        ContentType::Html
    } else {
        ContentType::Text
    };

    ctx.content_type = Some(detected);
    ctx.mark("detect_content_type");
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpeel_types::{FetchMethod, FetchResult, PeelOptions};

    fn ctx_with_result(content_type: &str, html: &str, raw: Option<Vec<u8>>) -> PipelineContext {
        let mut ctx = PipelineContext::new(url::Url::parse("https://example.com").unwrap(), PeelOptions::default());
        ctx.fetch_result = Some(FetchResult {
            html: html.to_string(),
            raw,
            final_url: ctx.url.clone(),
            status: 200,
            content_type: content_type.to_string(),
            method: FetchMethod::Simple,
            screenshot: None,
            headers: Default::default(),
            challenge_detected: false,
        });
        ctx
    }

    #[test]
    fn detects_pdf_by_content_type() {
        let mut ctx = ctx_with_result("application/pdf", "", Some(vec![1, 2, 3]));
        detect(&mut ctx);
        assert!(matches!(ctx.content_type, Some(ContentType::Document)));
    }

    #[test]
    fn detects_html_by_body_when_header_missing() {
        let mut ctx = ctx_with_result("", "<html><body>hi</body></html>", None);
        detect(&mut ctx);
        assert!(matches!(ctx.content_type, Some(ContentType::Html)));
    }

    #[test]
    fn detects_json() {
        let mut ctx = ctx_with_result("application/json", "{}", None);
        detect(&mut ctx);
        assert!(matches!(ctx.content_type, Some(ContentType::Json)));
    }

    #[test]
    fn detects_plain_text_body_instead_of_html() {
        let mut ctx = ctx_with_result("text/plain; charset=utf-8", "hello, no markup here", None);
        detect(&mut ctx);
        assert!(matches!(ctx.content_type, Some(ContentType::Text)));
    }

    #[test]
    fn domain_api_handled_always_text() {
        let mut ctx = ctx_with_result("application/pdf", "", Some(vec![1]));
        ctx.domain_api_handled = true;
        detect(&mut ctx);
        assert!(matches!(ctx.content_type, Some(ContentType::Text)));
    }
}
