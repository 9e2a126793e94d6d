//! The fallback chain itself (spec.md §4.4): `search_web(query, count)`
//! walks providers in order, stopping at the first to return a non-empty
//! result set, then falls into a concurrent "parallel stealth multi-engine"
//! tail if every sequential provider came up empty.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, instrument, warn};
use webpeel_fetch::browser::BrowserEngine;
use webpeel_types::SearchResult;

use crate::cache::SearchCache;
use crate::normalize::dedupe;
use crate::provider::SearchProvider;
use crate::providers::{
    BingStealthProvider, BraveProvider, DdgStealthProvider, DuckDuckGoHtmlProvider,
    DuckDuckGoLiteProvider, EcosiaStealthProvider, FirefoxDdgProvider, GoogleProvider,
    GoogleStealthProvider,
};

/// Engines declared in order; earlier engines dominate ties during dedup
/// (spec.md §5 "Ordering guarantees").
pub struct SearchChain {
    sequential: Vec<Box<dyn SearchProvider>>,
    /// Browser engine backing the Firefox-DDG, Google-stealth, and
    /// parallel-stealth-multi tiers. `None` disables every browser-backed
    /// provider (e.g. in environments with no headless engine available);
    /// the HTTP-only providers still run.
    browser: Option<Arc<dyn BrowserEngine>>,
    cache: SearchCache,
}

impl SearchChain {
    /// Build the chain per spec.md §4.4's provider list, given whichever
    /// API keys and browser engine the embedding config provides.
    pub fn new(
        google: Option<(String, String)>,
        brave_key: Option<String>,
        browser: Option<Arc<dyn BrowserEngine>>,
    ) -> Self {
        let mut sequential: Vec<Box<dyn SearchProvider>> = Vec::new();

        let has_google = google.is_some();
        if let Some((key, cx)) = google {
            sequential.push(Box::new(GoogleProvider::new(key, cx)));
        }
        if let Some(key) = brave_key {
            sequential.push(Box::new(BraveProvider::new(key)));
        }
        // "Google stealth scraping is an additional first-choice when no
        // API keys exist" (spec.md §4.4).
        if !has_google {
            if let Some(b) = &browser {
                sequential.push(Box::new(GoogleStealthProvider::new(b.clone())));
            }
        }
        sequential.push(Box::new(DuckDuckGoHtmlProvider::new()));
        sequential.push(Box::new(DuckDuckGoLiteProvider::new()));
        if let Some(b) = &browser {
            sequential.push(Box::new(FirefoxDdgProvider::new(b.clone())));
        }

        Self {
            sequential,
            browser,
            cache: SearchCache::default(),
        }
    }

    /// `searchWeb(query, count) -> list<SearchResult>` (spec.md §4.4).
    /// Never throws on a single-engine failure; returns an empty list only
    /// if every engine in the chain, including the parallel-stealth tail,
    /// comes up empty.
    #[instrument(skip(self), fields(query = %query, count))]
    pub async fn search_web(&self, query: &str, count: u32) -> Vec<SearchResult> {
        if let Some(cached) = self.cache.get(query, count) {
            debug!("search cache hit");
            return cached;
        }

        for provider in &self.sequential {
            match provider.search(query, count).await {
                Ok(results) if !results.is_empty() => {
                    let deduped = dedupe(results);
                    self.cache.put(query, count, deduped.clone());
                    return deduped;
                }
                Ok(_) => debug!(provider = provider.name(), "provider returned zero results"),
                Err(e) => warn!(provider = provider.name(), error = %e, "provider failed"),
            }
        }

        let tail = self.parallel_stealth_tail(query, count).await;
        if !tail.is_empty() {
            self.cache.put(query, count, tail.clone());
        }
        tail
    }

    /// Step 6: concurrently scrape DDG-HTML/Bing/Ecosia via stealth
    /// browser, collect all successful outcomes with all-settled semantics,
    /// and deduplicate in engine-declaration order.
    async fn parallel_stealth_tail(&self, query: &str, count: u32) -> Vec<SearchResult> {
        let Some(browser) = &self.browser else {
            return Vec::new();
        };

        let ddg = DdgStealthProvider::new(browser.clone());
        let bing = BingStealthProvider::new(browser.clone());
        let ecosia = EcosiaStealthProvider::new(browser.clone());

        let futures = vec![
            run_with_timeout(&ddg, query, count),
            run_with_timeout(&bing, query, count),
            run_with_timeout(&ecosia, query, count),
        ];
        let outcomes = join_all(futures).await;

        let mut all = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(results) => all.extend(results),
                Err(e) => warn!(error = %e, "parallel stealth engine failed"),
            }
        }
        dedupe(all)
    }
}

async fn run_with_timeout(
    provider: &dyn SearchProvider,
    query: &str,
    count: u32,
) -> Result<Vec<SearchResult>, crate::errors::SearchError> {
    match tokio::time::timeout(Duration::from_secs(15), provider.search(query, count)).await {
        Ok(result) => result,
        Err(_) => Err(crate::errors::SearchError::RequestFailed {
            provider: "parallel-stealth",
            message: "per-engine timeout elapsed".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_chain_without_browser_falls_through_to_http_providers() {
        // With no API keys and no browser, only the two HTTP DDG providers
        // exist; against unreachable hosts they fail gracefully rather than
        // panicking, and the chain returns an empty vec rather than erroring.
        let chain = SearchChain::new(None, None, None);
        assert_eq!(chain.sequential.len(), 2);
    }
}
