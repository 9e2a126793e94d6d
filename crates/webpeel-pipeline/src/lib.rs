//! The `webpeel-pipeline` crate: wires the eight stages of spec.md §4.2
//! into the single public entry point, [`Pipeline::peel`].
//!
//! `PipelineContext` (from `webpeel-types`) is threaded through every stage
//! by `&mut` rather than rebuilt or nested — spec.md §9's REDESIGN FLAG
//! against "deeply-nested mutable context passed by reference" is honored
//! by keeping it a single flat struct, not by avoiding mutability itself.

pub mod fingerprint;
pub mod registry;
pub mod stages;

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;
use webpeel_config::WebPeelConfig;
use webpeel_extraction::domain::{GithubExtractor, HackerNewsExtractor, RedditExtractor};
use webpeel_fetch::browser::BrowserEngine;
use webpeel_fetch::FetchEngine;
use webpeel_search::SearchChain;
use webpeel_types::{ChangeTrackingStore, DomainExtractor, PeelError, PeelOptions, PeelResult, PipelineContext};

use crate::registry::{DomainExtractorRegistry, InMemoryChangeTrackingStore};

/// Owns every long-lived component a `peel()` call needs: the fetch engine
/// (and whatever browser backend it was built with), the search provider
/// chain, the domain extractor registry, and the change-tracking store.
/// Stateless itself (aside from the registry and config, both already
/// `Arc`-wrapped internally) — share one instance across requests behind
/// an `Arc<Pipeline>` rather than cloning it (spec.md §5: concurrent-safe).
pub struct Pipeline {
    config: Arc<WebPeelConfig>,
    engine: FetchEngine,
    search_chain: Arc<SearchChain>,
    registry: Arc<DomainExtractorRegistry>,
    change_store: Arc<dyn ChangeTrackingStore>,
    client: reqwest::Client,
}

impl Pipeline {
    /// Build a pipeline from a loaded config and an optional browser
    /// backend. With no browser, every render/stealth/cloaked tier fails
    /// over at the fetch layer, but the simple-HTTP tier and every domain
    /// extractor still work.
    pub fn new(config: WebPeelConfig, browser: Option<Arc<dyn BrowserEngine>>) -> Self {
        let config = Arc::new(config);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.fetch.0.default_timeout_ms))
            .user_agent(config.fetch.0.default_user_agent.clone())
            .build()
            .unwrap_or_default();

        let engine = FetchEngine::new(config.clone(), browser.clone());

        let google = if config.search.google_available() {
            Some((
                config.search.google_search_key.clone().unwrap_or_default(),
                config.search.google_search_cx.clone().unwrap_or_default(),
            ))
        } else {
            None
        };
        let brave = config.search.brave_search_key.clone();
        let search_chain = Arc::new(SearchChain::new(google, brave, browser));

        let extractors: Vec<Arc<dyn DomainExtractor>> = vec![
            Arc::new(GithubExtractor::new(client.clone())),
            Arc::new(HackerNewsExtractor::new(client.clone())),
            Arc::new(RedditExtractor::new(client.clone())),
        ];
        let registry = Arc::new(DomainExtractorRegistry::new(extractors));

        Self {
            config,
            engine,
            search_chain,
            registry,
            change_store: Arc::new(InMemoryChangeTrackingStore::default()),
            client,
        }
    }

    /// Build a pipeline with no browser backend and an in-memory change
    /// tracking store — used by the CLI and by tests that don't need a
    /// real rendering tier.
    pub fn simple(config: WebPeelConfig) -> Self {
        Self::new(config, None)
    }

    /// Swap in a different change-tracking backend (e.g. a persistent
    /// key-value store). Only meaningful before the pipeline is shared.
    pub fn with_change_store(mut self, store: Arc<dyn ChangeTrackingStore>) -> Self {
        self.change_store = store;
        self
    }

    pub fn config(&self) -> &WebPeelConfig {
        &self.config
    }

    /// Run all eight stages for a single URL (spec.md §4.2, §7). This is
    /// the crate's one public operation.
    #[instrument(skip(self, options), fields(url = %url))]
    pub async fn peel(&self, url: &str, options: PeelOptions) -> Result<PeelResult, PeelError> {
        let parsed = url::Url::parse(url).map_err(|e| PeelError::InvalidInput {
            message: format!("invalid URL '{url}': {e}"),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(PeelError::InvalidInput {
                message: format!("unsupported URL scheme '{}', only http(s) is accepted", parsed.scheme()),
            });
        }

        let mut ctx = PipelineContext::new(parsed, options);

        stages::normalize_options::normalize(&mut ctx);

        let handled = stages::special_url::try_handle(&self.client, &mut ctx).await;

        let page = if handled {
            None
        } else {
            stages::fetch_content::fetch(&self.engine, &self.registry, &self.search_chain, &mut ctx).await?
        };

        stages::detect_content_type::detect(&mut ctx);
        stages::parse_content::parse(&mut ctx);
        if !ctx.options.lite {
            stages::post_process::process(&self.registry, &self.search_chain, &mut ctx).await;
        }
        stages::finalize::finalize(&self.change_store, page.as_deref(), &mut ctx).await;

        Ok(stages::build_result::build(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pipeline() -> Pipeline {
        Pipeline::simple(WebPeelConfig::default())
    }

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let pipeline = test_pipeline();
        let result = pipeline.peel("ftp://example.com/file", PeelOptions::default()).await;
        assert!(matches!(result, Err(PeelError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn rejects_unparseable_urls() {
        let pipeline = test_pipeline();
        let result = pipeline.peel("not a url", PeelOptions::default()).await;
        assert!(matches!(result, Err(PeelError::InvalidInput { .. })));
    }
}
