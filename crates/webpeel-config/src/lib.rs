//! Process-level configuration, read from the environment exactly once at
//! startup and then handed down by reference. Replaces the "global
//! environment variables for keys" pattern flagged in spec.md §9: nothing
//! downstream of `WebPeelConfig::from_env` calls `std::env::var` again.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

/// Search-engine credentials, per §4.4's provider chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    pub google_search_key: Option<String>,
    pub google_search_cx: Option<String>,
    pub brave_search_key: Option<String>,
}

impl SearchConfig {
    pub fn google_available(&self) -> bool {
        self.google_search_key.is_some() && self.google_search_cx.is_some()
    }

    pub fn brave_available(&self) -> bool {
        self.brave_search_key.is_some()
    }
}

/// Default LLM provider configuration (BYOK requests may still override
/// per-call via `PeelOptions.llm`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub default_model: Option<String>,
}

/// Tunables with sane production defaults, overridable via env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchTunables {
    pub default_timeout_ms: u64,
    pub max_redirects: u8,
    pub default_user_agent: String,
}

impl Default for FetchTunables {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            max_redirects: 10,
            default_user_agent:
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                    .to_string(),
        }
    }
}

/// Root configuration struct, constructed once at process start and passed
/// by reference into every core crate. The core never reads env directly.
#[derive(Debug, Clone, Default)]
pub struct WebPeelConfig {
    pub search: SearchConfig,
    pub llm: LlmConfig,
    pub fetch: FetchTunablesWrapper,
    pub proxy_pool: Vec<String>,
}

/// Thin wrapper so `FetchTunables::default()` participates in
/// `WebPeelConfig::default()` without requiring `Default` bounds gymnastics
/// on a bare struct field name clash.
#[derive(Debug, Clone)]
pub struct FetchTunablesWrapper(pub FetchTunables);

impl Default for FetchTunablesWrapper {
    fn default() -> Self {
        Self(FetchTunables::default())
    }
}

impl WebPeelConfig {
    /// Load configuration from environment variables. Called once at
    /// process start by the embedding application (HTTP surface, CLI, …).
    pub fn from_env() -> Result<Self, ConfigError> {
        let search = SearchConfig {
            google_search_key: env::var("GOOGLE_SEARCH_KEY").ok(),
            google_search_cx: env::var("GOOGLE_SEARCH_CX").ok(),
            brave_search_key: env::var("BRAVE_SEARCH_KEY").ok(),
        };

        let llm = LlmConfig {
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            google_api_key: env::var("GOOGLE_API_KEY").ok(),
            default_model: env::var("WEBPEEL_DEFAULT_MODEL").ok(),
        };

        let mut fetch = FetchTunables::default();
        if let Ok(raw) = env::var("WEBPEEL_FETCH_TIMEOUT_MS") {
            fetch.default_timeout_ms = raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: "WEBPEEL_FETCH_TIMEOUT_MS".to_string(),
                reason: "not a valid integer".to_string(),
            })?;
        }

        let proxy_pool = env::var("WEBPEEL_PROXY_POOL")
            .ok()
            .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        Ok(Self {
            search,
            llm,
            fetch: FetchTunablesWrapper(fetch),
            proxy_pool,
        })
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch.0.default_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_no_search_providers_available() {
        let cfg = WebPeelConfig::default();
        assert!(!cfg.search.google_available());
        assert!(!cfg.search.brave_available());
    }

    #[test]
    fn fetch_tunables_default_timeout() {
        let cfg = WebPeelConfig::default();
        assert_eq!(cfg.default_timeout(), Duration::from_millis(30_000));
    }
}
