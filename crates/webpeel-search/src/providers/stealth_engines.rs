//! The three engines fanned out concurrently in the "parallel stealth
//! multi-engine" tail of the fallback chain (spec.md §4.4 step 6): DDG-HTML,
//! Bing, and Ecosia, each scraped via a stealth browser session. Grouped in
//! one module because all three share the same "load page, parse anchors
//! inside a result container" shape — only the selectors differ.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use webpeel_fetch::browser::BrowserEngine;
use webpeel_types::SearchResult;

use crate::errors::SearchError;
use crate::normalize::{decode_redirect, parse_valid_url};
use crate::provider::SearchProvider;

/// Per-engine budget named in spec.md §4.4 step 6 ("15s per engine").
pub const PER_ENGINE_TIMEOUT: Duration = Duration::from_secs(15);

struct EngineSpec {
    name: &'static str,
    url_template: &'static str,
    result_selector: &'static str,
    link_selector: &'static str,
    snippet_selector: &'static str,
}

async fn scrape(
    browser: &Arc<dyn BrowserEngine>,
    query: &str,
    count: u32,
    spec: &EngineSpec,
) -> Result<Vec<SearchResult>, SearchError> {
    let page = browser.new_page().await.map_err(|e| SearchError::RequestFailed {
        provider: spec.name,
        message: e.to_string(),
    })?;

    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    let url = spec.url_template.replace("{q}", &encoded);

    let outcome = tokio::time::timeout(PER_ENGINE_TIMEOUT, async {
        page.goto(&url).await?;
        page.content().await
    })
    .await;

    let content = match outcome {
        Ok(Ok(html)) => html,
        Ok(Err(e)) => {
            let _ = page.close().await;
            return Err(SearchError::RequestFailed {
                provider: spec.name,
                message: e.to_string(),
            });
        }
        Err(_) => {
            let _ = page.close().await;
            return Err(SearchError::RequestFailed {
                provider: spec.name,
                message: "engine timed out".to_string(),
            });
        }
    };
    let _ = page.close().await;

    let document = scraper::Html::parse_document(&content);
    let Ok(result_sel) = scraper::Selector::parse(spec.result_selector) else {
        return Err(SearchError::ParseFailed {
            provider: spec.name,
            message: "invalid result selector".to_string(),
        });
    };
    let Ok(link_sel) = scraper::Selector::parse(spec.link_selector) else {
        return Err(SearchError::ParseFailed {
            provider: spec.name,
            message: "invalid link selector".to_string(),
        });
    };
    let snippet_sel = scraper::Selector::parse(spec.snippet_selector).ok();

    let mut results = Vec::new();
    for row in document.select(&result_sel) {
        let Some(link) = row.select(&link_sel).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let decoded = decode_redirect(href);
        let Some(url) = parse_valid_url(&decoded) else {
            continue;
        };
        let title: String = link.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }
        let snippet = snippet_sel
            .as_ref()
            .and_then(|sel| row.select(sel).next())
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        results.push(SearchResult::new(title, url, snippet));
    }

    if results.is_empty() {
        return Err(SearchError::NoResults { provider: spec.name });
    }
    Ok(results.into_iter().take(count as usize).collect())
}

macro_rules! stealth_provider {
    ($struct_name:ident, $name:expr, $url:expr, $result_sel:expr, $link_sel:expr, $snippet_sel:expr) => {
        pub struct $struct_name {
            browser: Arc<dyn BrowserEngine>,
        }

        impl $struct_name {
            pub fn new(browser: Arc<dyn BrowserEngine>) -> Self {
                Self { browser }
            }
        }

        #[async_trait]
        impl SearchProvider for $struct_name {
            fn name(&self) -> &'static str {
                $name
            }

            async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchResult>, SearchError> {
                scrape(
                    &self.browser,
                    query,
                    count,
                    &EngineSpec {
                        name: $name,
                        url_template: $url,
                        result_selector: $result_sel,
                        link_selector: $link_sel,
                        snippet_selector: $snippet_sel,
                    },
                )
                .await
            }
        }
    };
}

stealth_provider!(
    DdgStealthProvider,
    "ddg-stealth",
    "https://html.duckduckgo.com/html/?q={q}",
    ".result, .web-result",
    "a.result__a, .result__title a",
    ".result__snippet"
);

stealth_provider!(
    BingStealthProvider,
    "bing-stealth",
    "https://www.bing.com/search?q={q}",
    "li.b_algo",
    "h2 a",
    ".b_caption p"
);

stealth_provider!(
    EcosiaStealthProvider,
    "ecosia-stealth",
    "https://www.ecosia.org/search?q={q}",
    "div.result, div.mainline-result",
    "a.result-title, a.mainline-result-title-link",
    "p.result-snippet"
);
