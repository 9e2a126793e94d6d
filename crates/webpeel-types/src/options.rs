//! Caller-facing options (`PeelOptions`) and the small structs it nests.
//!
//! This is the "request envelope" of §6. Every field is optional from the
//! caller's perspective; `Default` documents the pipeline's defaults so
//! `NormalizeOptions` (stage 1) has nowhere else to hide behavior.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::fetch::{FetchAction, WaitUntil};

/// Output content format requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Markdown,
    Text,
    Html,
    /// Markdown with link syntax stripped in a post-processing pass.
    Clean,
}

impl Default for Format {
    fn default() -> Self {
        Format::Markdown
    }
}

/// `agentMode` convenience bundle: applying it seeds `budget` and `format`
/// defaults per spec.md Stage 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentModeOptions {
    #[serde(default = "default_agent_budget")]
    pub budget: u32,
    #[serde(default)]
    pub format: Format,
}

fn default_agent_budget() -> u32 {
    4000
}

impl Default for AgentModeOptions {
    fn default() -> Self {
        Self {
            budget: default_agent_budget(),
            format: Format::Markdown,
        }
    }
}

/// A structured-extraction request: either a CSS-selector schema or an
/// LLM-powered inline extraction (BYOK, §4.2 Stage 6 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractSchema {
    /// field name -> CSS selector
    Selectors(HashMap<String, String>),
    /// Free-form JSON schema handed to an LLM for inline extraction.
    LlmSchema(serde_json::Value),
}

/// Inline LLM configuration for `extract` (LLM mode) and `summary`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmOptions {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Caller options, flattened into `PipelineContext` by stage 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeelOptions {
    pub render: bool,
    pub stealth: bool,
    pub wait_ms: Option<u64>,
    pub format: Format,
    pub timeout_ms: u64,
    pub user_agent: Option<String>,
    pub screenshot: bool,
    pub full_page: bool,
    pub selector: Option<String>,
    pub exclude: Vec<String>,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub raw: bool,
    pub actions: Vec<FetchAction>,
    pub extract: Option<ExtractSchema>,
    pub max_tokens: Option<u32>,
    pub images: bool,
    pub include_iframes: bool,
    pub profile_dir: Option<String>,
    pub headed: bool,
    pub storage_state: Option<String>,
    pub proxy: Option<String>,
    pub proxies: Vec<String>,
    pub device: Option<String>,
    pub viewport: Option<(u32, u32)>,
    pub wait_until: Option<WaitUntil>,
    pub wait_selector: Option<String>,
    pub block_resources: bool,
    pub cloaked: bool,
    pub cycle: bool,
    pub agent_mode: Option<AgentModeOptions>,
    pub budget: Option<u32>,
    pub question: Option<String>,
    pub lite: bool,
    pub readable: bool,
    pub chunk: bool,
    pub branding: bool,
    pub change_tracking: bool,
    pub summary: bool,
    pub llm: Option<LlmOptions>,
    pub location: Option<String>,
    pub auto_scroll: bool,
}

impl Default for PeelOptions {
    fn default() -> Self {
        Self {
            render: false,
            stealth: false,
            wait_ms: None,
            format: Format::Markdown,
            timeout_ms: 30_000,
            user_agent: None,
            screenshot: false,
            full_page: false,
            selector: None,
            exclude: Vec::new(),
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            raw: false,
            actions: Vec::new(),
            extract: None,
            max_tokens: None,
            images: false,
            include_iframes: false,
            profile_dir: None,
            headed: false,
            storage_state: None,
            proxy: None,
            proxies: Vec::new(),
            device: None,
            viewport: None,
            wait_until: None,
            wait_selector: None,
            block_resources: false,
            cloaked: false,
            cycle: false,
            agent_mode: None,
            budget: None,
            question: None,
            lite: false,
            readable: false,
            chunk: false,
            branding: false,
            change_tracking: false,
            summary: false,
            llm: None,
            location: None,
            auto_scroll: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_non_rendering() {
        let opts = PeelOptions::default();
        assert!(!opts.render);
        assert!(!opts.stealth);
        assert_eq!(opts.timeout_ms, 30_000);
    }

    #[test]
    fn agent_mode_defaults() {
        let am = AgentModeOptions::default();
        assert_eq!(am.budget, 4000);
        assert!(matches!(am.format, Format::Markdown));
    }
}
