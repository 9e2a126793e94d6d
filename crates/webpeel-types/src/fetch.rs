//! Types shared between the pipeline and the fetch strategy engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `waitUntil` condition for headless navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
    NetworkIdle0,
    NetworkIdle2,
}

impl Default for WaitUntil {
    fn default() -> Self {
        WaitUntil::DomContentLoaded
    }
}

/// One normalized browser action, per the common shape in spec.md §4.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchAction {
    #[serde(rename = "type")]
    pub action_type: FetchActionType,
    pub selector: Option<String>,
    pub value: Option<String>,
    pub ms: Option<u64>,
    pub key: Option<String>,
    pub direction: Option<String>,
    pub amount: Option<u32>,
    /// Per-action timeout override; when set, the action elapsing without
    /// completing is not fatal (spec.md §4.1 Action execution).
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchActionType {
    Click,
    Wait,
    Type,
    Fill,
    Press,
    Scroll,
    Select,
    Hover,
    WaitForSelector,
    Screenshot,
}

/// Per-action default timeout (spec.md §4.1: "Per-action timeout default
/// 5000ms; total action budget 30000ms").
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;
pub const TOTAL_ACTION_BUDGET_MS: u64 = 30_000;
pub const DEFAULT_WAIT_MS: u64 = 1_000;

/// Immutable description of a single fetch, built by stage 3 from
/// `PeelOptions` plus the URL under consideration.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: url::Url,
    pub render: bool,
    pub stealth: bool,
    pub wait_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub actions: Vec<FetchAction>,
    pub timeout_ms: u64,
    pub proxies: Vec<String>,
    pub viewport: Option<(u32, u32)>,
    pub wait_until: WaitUntil,
    pub wait_selector: Option<String>,
    pub block_resources: bool,
    pub cloaked: bool,
    pub screenshot: bool,
    pub full_page: bool,
}

impl FetchRequest {
    /// Enforces the invariant: if any of {stealth, actions present,
    /// branding, auto-scroll, screenshot} is true, render must be true.
    /// `branding`/`auto_scroll` are folded in by the caller before
    /// construction (stage 1); this just asserts the derived flag holds.
    pub fn render_is_forced(&self) -> bool {
        self.stealth || !self.actions.is_empty() || self.screenshot
    }
}

/// Which strategy tier (or shortcut) produced a `FetchResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchMethod {
    Simple,
    Stealth,
    Browser,
    Cached,
    DomainApi,
    DomainApiFallback,
    SearchFallback,
}

/// Result of a fetch, independent of which tier produced it.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub html: String,
    /// Raw bytes, populated instead of/alongside `html` for binary
    /// documents (PDF/DOCX).
    pub raw: Option<Vec<u8>>,
    pub final_url: url::Url,
    pub status: u16,
    pub content_type: String,
    pub method: FetchMethod,
    pub screenshot: Option<Vec<u8>>,
    pub headers: HashMap<String, String>,
    pub challenge_detected: bool,
}

impl FetchResult {
    pub fn body_len(&self) -> usize {
        self.raw.as_ref().map(|b| b.len()).unwrap_or(self.html.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_forced_by_stealth() {
        let req = FetchRequest {
            url: url::Url::parse("https://example.com").unwrap(),
            render: true,
            stealth: true,
            wait_ms: None,
            user_agent: None,
            headers: HashMap::new(),
            cookies: HashMap::new(),
            actions: Vec::new(),
            timeout_ms: 1000,
            proxies: Vec::new(),
            viewport: None,
            wait_until: WaitUntil::DomContentLoaded,
            wait_selector: None,
            block_resources: false,
            cloaked: false,
            screenshot: false,
            full_page: false,
        };
        assert!(req.render_is_forced());
    }
}
