//! The Fetch Strategy Engine itself (spec.md §4.1): ties the simple/headless/
//! stealth/cloaked tiers together with post-fetch challenge classification
//! and one level of escalation.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use webpeel_challenge::detect;
use webpeel_config::WebPeelConfig;
use webpeel_stealth::StealthConfig;
use webpeel_types::search::ChallengeType;
use webpeel_types::{FetchMethod, FetchRequest, FetchResult};

use crate::actions::run_actions;
use crate::browser::{BrowserEngine, PageHandle};
use crate::errors::FetchError;
use crate::simple;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Which tier produced a result, ordered so escalation can compare tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Simple,
    Headless,
    Stealth,
    Cloaked,
}

impl Tier {
    fn from_request(req: &FetchRequest) -> Self {
        if req.cloaked {
            Tier::Cloaked
        } else if req.stealth {
            Tier::Stealth
        } else if req.render {
            Tier::Headless
        } else {
            Tier::Simple
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            Tier::Simple => Some(Tier::Headless),
            Tier::Headless => Some(Tier::Stealth),
            Tier::Stealth => Some(Tier::Cloaked),
            Tier::Cloaked => None,
        }
    }

    fn method(self) -> FetchMethod {
        match self {
            Tier::Simple => FetchMethod::Simple,
            Tier::Headless => FetchMethod::Browser,
            Tier::Stealth | Tier::Cloaked => FetchMethod::Stealth,
        }
    }
}

/// The engine a pipeline invocation holds for its lifetime: owns the
/// optional browser engine used by every rendering tier. Cheap to clone
/// (Arc-wrapped), so one engine can back unboundedly many concurrent fetches
/// (§5: "concurrent-safe across many simultaneous pipeline invocations").
#[derive(Clone)]
pub struct FetchEngine {
    browser: Option<Arc<dyn BrowserEngine>>,
    config: Arc<WebPeelConfig>,
}

impl FetchEngine {
    pub fn new(config: Arc<WebPeelConfig>, browser: Option<Arc<dyn BrowserEngine>>) -> Self {
        Self { browser, config }
    }

    /// Build an engine with no browser backend available; every rendering
    /// tier will fail with `EngineUnavailable`. Used by tests and by
    /// deployments that only need the simple-HTTP tier.
    pub fn simple_only(config: Arc<WebPeelConfig>) -> Self {
        Self {
            browser: None,
            config,
        }
    }

    /// Run a fetch to completion, including post-fetch challenge
    /// classification and one level of tier escalation, per spec.md §4.1
    /// "Post-fetch classification".
    ///
    /// Returns the `FetchResult` plus any live page handle that survived
    /// (owned by the caller from here; branding/auto-scroll may consume it,
    /// otherwise the caller must close it).
    #[instrument(skip(self, req), fields(url = %req.url))]
    pub async fn fetch(
        &self,
        req: &FetchRequest,
    ) -> Result<(FetchResult, Option<Box<dyn PageHandle>>), FetchError> {
        let starting_tier = Tier::from_request(req);
        self.fetch_at_tier(req, starting_tier, 0).await
    }

    async fn fetch_at_tier(
        &self,
        req: &FetchRequest,
        tier: Tier,
        escalations: u8,
    ) -> Result<(FetchResult, Option<Box<dyn PageHandle>>), FetchError> {
        let (mut result, page) = match tier {
            Tier::Simple => (simple::fetch(req).await?, None),
            Tier::Headless | Tier::Stealth | Tier::Cloaked => {
                self.fetch_rendered(req, tier).await?
            }
        };

        let verdict = detect(&result.html, result.status);
        if verdict.is_challenge {
            debug!(
                tier = ?tier,
                challenge_type = ?verdict.challenge_type,
                confidence = verdict.confidence,
                "challenge detected after fetch"
            );
            if tier < Tier::Stealth && escalations == 0 {
                if let Some(close) = &page {
                    let _ = close.close().await;
                }
                if let Some(next) = tier.next() {
                    info!(from = ?tier, to = ?next, "escalating fetch tier after challenge detection");
                    return Box::pin(self.fetch_at_tier(req, next, escalations + 1)).await;
                }
            }
            result.challenge_detected = true;
            if matches!(verdict.challenge_type, ChallengeType::None) {
                // Shouldn't happen given is_challenge, but keep the field honest.
            } else if tier >= Tier::Stealth {
                warn!(challenge_type = ?verdict.challenge_type, "top-tier fetch still blocked, returning bytes anyway");
            }
        }

        Ok((result, page))
    }

    async fn fetch_rendered(
        &self,
        req: &FetchRequest,
        tier: Tier,
    ) -> Result<(FetchResult, Option<Box<dyn PageHandle>>), FetchError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| FetchError::EngineUnavailable {
                message: "no browser engine configured for rendering tier".to_string(),
            })?;

        let stealth_cfg = if tier == Tier::Cloaked {
            StealthConfig::from_preset(
                webpeel_stealth::StealthPreset::Cloaked,
                self.config.proxy_pool.clone(),
            )
        } else if tier == Tier::Stealth {
            StealthConfig::from_preset(webpeel_stealth::StealthPreset::Stealth, Vec::new())
        } else {
            StealthConfig::default()
        };

        let page = browser.new_page().await?;

        if tier >= Tier::Stealth {
            let _ = page.evaluate(&stealth_cfg.fingerprint.init_script()).await;
        }

        let (width, height) = req.viewport.unwrap_or_else(|| {
            if tier == Tier::Cloaked {
                stealth_cfg.behavior.randomized_viewport()
            } else {
                (1280, 800)
            }
        });
        let _ = page.set_viewport(width, height).await;

        if tier == Tier::Cloaked {
            tokio::time::sleep(stealth_cfg.behavior.jittered_delay()).await;
        }

        page.goto(req.url.as_str()).await?;

        if let Some(wait_ms) = req.wait_ms {
            tokio::time::sleep(std::time::Duration::from_millis(wait_ms)).await;
        } else {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        }

        if let Some(selector) = &req.wait_selector {
            let script = format!(
                "document.querySelector({sel}) !== null",
                sel = serde_json::to_string(selector).unwrap_or_default()
            );
            for _ in 0..50 {
                if let Ok(serde_json::Value::Bool(true)) = page.evaluate(&script).await {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }

        if !req.actions.is_empty() {
            run_actions(page.as_ref(), &req.actions).await?;
        }

        let html = page.content().await?;
        let final_url = page
            .url()
            .await
            .ok()
            .and_then(|u| url::Url::parse(&u).ok())
            .unwrap_or_else(|| req.url.clone());

        let screenshot = if req.screenshot {
            page.screenshot().await.ok()
        } else {
            None
        };

        let result = FetchResult {
            html,
            raw: None,
            final_url,
            status: 200,
            content_type: "text/html".to_string(),
            method: tier.method(),
            screenshot,
            headers: std::collections::HashMap::new(),
            challenge_detected: false,
        };

        // Caller keeps the page open only when branding/auto-scroll will
        // consume it; plain fetches close immediately (ownership transfer
        // happens explicitly, per spec.md §9's resource-guard note).
        if req.actions.is_empty() && !req.screenshot {
            let _ = page.close().await;
            Ok((result, None))
        } else {
            Ok((result, Some(page)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use webpeel_types::WaitUntil;

    fn base_request(url: url::Url) -> FetchRequest {
        FetchRequest {
            url,
            render: false,
            stealth: false,
            wait_ms: None,
            user_agent: None,
            headers: HashMap::new(),
            cookies: HashMap::new(),
            actions: Vec::new(),
            timeout_ms: 5_000,
            proxies: Vec::new(),
            viewport: None,
            wait_until: WaitUntil::DomContentLoaded,
            wait_selector: None,
            block_resources: false,
            cloaked: false,
            screenshot: false,
            full_page: false,
        }
    }

    #[test]
    fn tier_from_request_escalation_order() {
        let mut req = base_request(url::Url::parse("https://example.com").unwrap());
        assert_eq!(Tier::from_request(&req), Tier::Simple);
        req.render = true;
        assert_eq!(Tier::from_request(&req), Tier::Headless);
        req.stealth = true;
        assert_eq!(Tier::from_request(&req), Tier::Stealth);
        req.cloaked = true;
        assert_eq!(Tier::from_request(&req), Tier::Cloaked);
    }

    #[tokio::test]
    async fn simple_tier_fetch_without_browser_succeeds() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<html><body>ok</body></html>"))
            .mount(&server)
            .await;

        let engine = FetchEngine::simple_only(Arc::new(WebPeelConfig::default()));
        let req = base_request(url::Url::parse(&server.uri()).unwrap());
        let (result, page) = engine.fetch(&req).await.unwrap();
        assert_eq!(result.method, FetchMethod::Simple);
        assert!(page.is_none());
    }

    #[tokio::test]
    async fn render_tier_without_browser_engine_errors() {
        let engine = FetchEngine::simple_only(Arc::new(WebPeelConfig::default()));
        let mut req = base_request(url::Url::parse("https://example.com").unwrap());
        req.render = true;
        let err = engine.fetch(&req).await.unwrap_err();
        assert!(matches!(err, FetchError::EngineUnavailable { .. }));
    }
}
