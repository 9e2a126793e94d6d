//! Stealth-scrape of Google's own result DOM — the "additional first
//! choice when no API keys exist" provider named in spec.md §4.4. Shares
//! [`FirefoxDdgProvider`](super::FirefoxDdgProvider)'s approach of driving a
//! real page load through a [`BrowserEngine`] rather than a bare HTTP GET,
//! since Google's result page is far more automation-hostile than DDG's.

use std::sync::Arc;

use async_trait::async_trait;
use webpeel_fetch::browser::BrowserEngine;
use webpeel_types::SearchResult;

use crate::errors::SearchError;
use crate::normalize::{decode_redirect, parse_valid_url};
use crate::provider::SearchProvider;

pub struct GoogleStealthProvider {
    browser: Arc<dyn BrowserEngine>,
}

impl GoogleStealthProvider {
    pub fn new(browser: Arc<dyn BrowserEngine>) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl SearchProvider for GoogleStealthProvider {
    fn name(&self) -> &'static str {
        "google-stealth"
    }

    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchResult>, SearchError> {
        let page = self.browser.new_page().await.map_err(|e| SearchError::RequestFailed {
            provider: "google-stealth",
            message: e.to_string(),
        })?;

        let url = format!(
            "https://www.google.com/search?q={}&num={}",
            url::form_urlencoded::byte_serialize(query.as_bytes()).collect::<String>(),
            count.clamp(1, 20),
        );
        if let Err(e) = page.goto(&url).await {
            let _ = page.close().await;
            return Err(SearchError::RequestFailed {
                provider: "google-stealth",
                message: e.to_string(),
            });
        }

        let content = page.content().await.map_err(|e| SearchError::RequestFailed {
            provider: "google-stealth",
            message: e.to_string(),
        })?;
        let _ = page.close().await;

        let results = parse_google_results(&content);
        if results.is_empty() {
            return Err(SearchError::NoResults {
                provider: "google-stealth",
            });
        }
        Ok(results.into_iter().take(count as usize).collect())
    }
}

/// Google's result markup changes constantly; this keys off the one
/// structural invariant that tends to survive redesigns — an `<a>` wrapping
/// an `<h3>` inside a result container.
fn parse_google_results(html: &str) -> Vec<SearchResult> {
    let document = scraper::Html::parse_document(html);
    let Ok(container_sel) = scraper::Selector::parse("div[data-hveid], div.g") else {
        return Vec::new();
    };
    let link_sel = scraper::Selector::parse("a[href]").unwrap();
    let heading_sel = scraper::Selector::parse("h3").unwrap();
    let snippet_sel = scraper::Selector::parse("div[data-sncf], span, div").unwrap();

    let mut results = Vec::new();
    for container in document.select(&container_sel) {
        let Some(heading) = container.select(&heading_sel).next() else {
            continue;
        };
        let title: String = heading.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }
        let Some(link) = container.select(&link_sel).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let decoded = decode_redirect(href);
        let Some(url) = parse_valid_url(&decoded) else {
            continue;
        };
        let snippet = container
            .select(&snippet_sel)
            .map(|el| el.text().collect::<String>())
            .find(|t| t.chars().count() > 40)
            .unwrap_or_default();
        results.push(SearchResult::new(title, url, snippet));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_result_heading_and_link() {
        let html = r#"<html><body>
            <div class="g">
                <a href="https://example.com/page"><h3>Example Result</h3></a>
                <div data-sncf="1">This is a long enough snippet to pass the length filter comfortably.</div>
            </div>
        </body></html>"#;
        let results = parse_google_results(html);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Example Result");
    }
}
