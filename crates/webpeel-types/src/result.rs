//! The final `PeelResult` record assembled by Stage 8 (BuildResult).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Computed visual identity of a page, produced only when `branding=true`
/// and a live page handle survived to Stage 7. Always optional downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandingProfile {
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub logo_url: Option<String>,
    pub font_family: Option<String>,
}

/// Outcome of comparing the current fingerprint against a stored baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeTrackingResult {
    pub changed: bool,
    pub previous_fingerprint: Option<String>,
    pub current_fingerprint: String,
    pub last_checked: Option<chrono::DateTime<chrono::Utc>>,
}

/// BM25 lexical answer to `question`, with no LLM involved (§4.6 glossary:
/// Quick answer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickAnswer {
    pub answer: String,
    pub confidence: f64,
    pub source_passage: String,
}

/// Output of the readability extractor (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadabilityResult {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub site_name: Option<String>,
    pub published: Option<String>,
    pub content: String,
}

/// Per-stage elapsed time, recorded by `PipelineContext::mark`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Timing {
    pub marks: Vec<(String, u64)>,
    pub total_ms: u64,
}

/// The structured record returned from `peel` for every request that does
/// not hit a surfaced error (§4.2 Stage 8, §6 Outputs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeelResult {
    pub url: String,
    pub title: Option<String>,
    pub content: String,
    pub metadata: HashMap<String, String>,
    pub links: Vec<String>,
    pub tokens: u32,
    pub method: String,
    pub elapsed_ms: u64,
    pub screenshot: Option<String>,
    pub content_type: String,
    pub quality: f64,
    pub fingerprint: String,
    pub extracted: Option<serde_json::Value>,
    pub branding: Option<BrandingProfile>,
    pub change_tracking: Option<ChangeTrackingResult>,
    pub summary: Option<String>,
    pub images: Vec<String>,
    pub link_count: usize,
    pub warning: Option<String>,
    pub blocked: Option<bool>,
    pub pruned_percent: Option<f64>,
    pub domain_data: Option<serde_json::Value>,
    pub readability: Option<ReadabilityResult>,
    pub quick_answer: Option<QuickAnswer>,
    pub timing: Timing,
    pub json_ld_type: Option<String>,
    pub warnings: Vec<String>,
    pub chunks: Option<Vec<String>>,
    pub budget_fallback: Option<bool>,
}
