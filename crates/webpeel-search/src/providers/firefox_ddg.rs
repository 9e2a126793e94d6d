//! Firefox-flavored DuckDuckGo relaunch (spec.md §4.4 step 5): when
//! Chromium-fingerprinted requests get IP-blocked, re-issue the DDG scrape
//! through a browser wearing a Firefox user agent instead.

use std::sync::Arc;

use async_trait::async_trait;
use webpeel_fetch::browser::BrowserEngine;
use webpeel_types::SearchResult;

use crate::errors::SearchError;
use crate::normalize::{decode_redirect, parse_valid_url};
use crate::provider::SearchProvider;

pub const FIREFOX_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0";

/// Scrapes DDG's HTML results page via a real page load (not a bare HTTP
/// GET) so the Firefox user agent is backed by a matching navigator/TLS
/// fingerprint rather than just a header. The caller is expected to have
/// launched `browser` with [`FIREFOX_UA`] (e.g. via
/// `ChromiumoxideEngine::launch(Some(FIREFOX_UA))`).
pub struct FirefoxDdgProvider {
    browser: Arc<dyn BrowserEngine>,
}

impl FirefoxDdgProvider {
    pub fn new(browser: Arc<dyn BrowserEngine>) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl SearchProvider for FirefoxDdgProvider {
    fn name(&self) -> &'static str {
        "firefox-ddg"
    }

    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchResult>, SearchError> {
        let page = self
            .browser
            .new_page()
            .await
            .map_err(|e| SearchError::RequestFailed {
                provider: "firefox-ddg",
                message: e.to_string(),
            })?;

        let url = format!(
            "https://html.duckduckgo.com/html/?q={}",
            urlencoding_query(query)
        );
        if let Err(e) = page.goto(&url).await {
            let _ = page.close().await;
            return Err(SearchError::RequestFailed {
                provider: "firefox-ddg",
                message: e.to_string(),
            });
        }

        let content = page.content().await.map_err(|e| SearchError::RequestFailed {
            provider: "firefox-ddg",
            message: e.to_string(),
        })?;
        let _ = page.close().await;

        let document = scraper::Html::parse_document(&content);
        let Ok(result_sel) = scraper::Selector::parse(".result, .web-result") else {
            return Err(SearchError::ParseFailed {
                provider: "firefox-ddg",
                message: "invalid selector".to_string(),
            });
        };
        let link_sel = scraper::Selector::parse("a.result__a, .result__title a").unwrap();
        let snippet_sel = scraper::Selector::parse(".result__snippet").ok();

        let mut results = Vec::new();
        for row in document.select(&result_sel) {
            let Some(link) = row.select(&link_sel).next() else {
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let decoded = decode_redirect(href);
            let Some(parsed) = parse_valid_url(&decoded) else {
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
            results.push(SearchResult::new(title, parsed, snippet));
        }

        if results.is_empty() {
            return Err(SearchError::NoResults {
                provider: "firefox-ddg",
            });
        }
        Ok(results.into_iter().take(count as usize).collect())
    }
}

fn urlencoding_query(query: &str) -> String {
    url::form_urlencoded::byte_serialize(query.as_bytes()).collect()
}
