//! `PipelineContext`: the single mutable record threaded through the eight
//! pipeline stages (§3, §9 "deeply-nested mutable context passed by
//! reference" — kept as one explicit struct per the redesign note).

use std::collections::HashMap;
use std::time::Instant;

use crate::fetch::FetchResult;
use crate::options::{Format, PeelOptions};
use crate::result::{BrandingProfile, ChangeTrackingResult, QuickAnswer, ReadabilityResult};
use crate::search::normalize_url_key;

/// Content type tag assigned by Stage 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Document,
    Html,
    Json,
    Xml,
    Text,
}

/// Exclusively owned by one running pipeline invocation; never shared
/// across requests (§3 Ownership).
pub struct PipelineContext {
    pub url: url::Url,
    pub options: PeelOptions,
    pub format: Format,

    pub fetch_result: Option<FetchResult>,
    pub content_type: Option<ContentType>,

    pub content: String,
    pub title: Option<String>,
    pub metadata: HashMap<String, String>,
    links: Vec<String>,
    pub images: Vec<String>,

    pub quality: f64,
    pub pruned_percent: Option<f64>,
    pub json_ld_type: Option<String>,

    pub extracted_fields: HashMap<String, serde_json::Value>,
    pub domain_data: Option<serde_json::Value>,
    pub quick_answer: Option<QuickAnswer>,
    pub readability: Option<ReadabilityResult>,
    pub branding: Option<BrandingProfile>,
    pub change_tracking: Option<ChangeTrackingResult>,
    pub summary: Option<String>,
    pub screenshot_base64: Option<String>,

    pub warnings: Vec<String>,
    pub blocked: bool,
    pub budget_fallback: Option<bool>,
    pub domain_api_handled: bool,

    started_at: Instant,
    marks: Vec<(String, u64)>,
}

impl PipelineContext {
    pub fn new(url: url::Url, options: PeelOptions) -> Self {
        let format = options.format;
        Self {
            url,
            options,
            format,
            fetch_result: None,
            content_type: None,
            content: String::new(),
            title: None,
            metadata: HashMap::new(),
            links: Vec::new(),
            images: Vec::new(),
            quality: 0.0,
            pruned_percent: None,
            json_ld_type: None,
            extracted_fields: HashMap::new(),
            domain_data: None,
            quick_answer: None,
            readability: None,
            branding: None,
            change_tracking: None,
            summary: None,
            screenshot_base64: None,
            warnings: Vec::new(),
            blocked: false,
            budget_fallback: None,
            domain_api_handled: false,
            started_at: Instant::now(),
            marks: Vec::new(),
        }
    }

    /// Append-only warning log (§3 invariant).
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record a named timing mark relative to pipeline start.
    pub fn mark(&mut self, stage: impl Into<String>) {
        self.marks
            .push((stage.into(), self.started_at.elapsed().as_millis() as u64));
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    pub fn marks(&self) -> &[(String, u64)] {
        &self.marks
    }

    /// Add an absolute link, deduping by normalized form and rejecting
    /// anything that is not http(s) (§3 invariant: "links never contains
    /// non-http(s) URLs").
    pub fn add_link(&mut self, link: &url::Url) {
        if link.scheme() != "http" && link.scheme() != "https" {
            return;
        }
        let key = normalize_url_key(link);
        if self
            .links
            .iter()
            .filter_map(|l| url::Url::parse(l).ok())
            .any(|existing| normalize_url_key(&existing) == key)
        {
            return;
        }
        self.links.push(link.to_string());
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PipelineContext {
        PipelineContext::new(
            url::Url::parse("https://example.com").unwrap(),
            PeelOptions::default(),
        )
    }

    #[test]
    fn add_link_rejects_non_http() {
        let mut c = ctx();
        c.add_link(&url::Url::parse("javascript:void(0)").unwrap_or_else(|_| {
            // javascript: isn't parseable as a base-less URL in some cases;
            // fall back to a guaranteed non-http scheme for the assertion.
            url::Url::parse("mailto:a@b.com").unwrap()
        }));
        assert!(c.links().is_empty());
    }

    #[test]
    fn add_link_dedupes_by_normalized_form() {
        let mut c = ctx();
        c.add_link(&url::Url::parse("https://www.Example.com/a/").unwrap());
        c.add_link(&url::Url::parse("https://example.com/a").unwrap());
        assert_eq!(c.links().len(), 1);
    }

    #[test]
    fn warnings_are_append_only() {
        let mut c = ctx();
        c.warn("first");
        c.warn("second");
        assert_eq!(c.warnings, vec!["first".to_string(), "second".to_string()]);
    }
}
