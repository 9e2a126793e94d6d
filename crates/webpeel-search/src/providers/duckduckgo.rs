//! DuckDuckGo HTML and Lite scraping providers (spec.md §4.4, steps 3-4).
//! Both are unauthenticated HTML-table scrapes, grounded on
//! `riptide-search/src/none_provider.rs`'s regex/URL-extraction approach to
//! pulling links out of plain text/HTML without a JSON API underneath.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use webpeel_types::SearchResult;

use crate::errors::SearchError;
use crate::normalize::{decode_redirect, parse_valid_url};
use crate::provider::SearchProvider;

static SPLIT_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-z]+?)(ai|io|app|labs)$").unwrap());

/// The up-to-6 rewrites tried in order until one yields results (spec.md
/// §4.4 step 3).
fn query_rewrites(query: &str) -> Vec<String> {
    let mut rewrites = vec![query.to_string(), format!("\"{query}\"")];

    if !query.contains("site:") {
        rewrites.push(format!("{query} site:*"));
    }
    rewrites.push(format!("{query} website"));

    let compact: String = query.chars().filter(|c| !c.is_whitespace()).collect();
    if !compact.is_empty() {
        rewrites.push(format!("{compact}.com"));
    }

    let lower = query.to_lowercase();
    if let Some(caps) = SPLIT_SUFFIX.captures(&lower) {
        rewrites.push(format!("{} {}", &caps[1], &caps[2]));
    }

    rewrites.truncate(6);
    rewrites
}

fn parse_result_rows(html: &str, result_selector: &str, link_selector: &str, snippet_selector: &str) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let Ok(result_sel) = Selector::parse(result_selector) else {
        return Vec::new();
    };
    let Ok(link_sel) = Selector::parse(link_selector) else {
        return Vec::new();
    };
    let snippet_sel = Selector::parse(snippet_selector).ok();

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
    results
}

async fn fetch_html(client: &reqwest::Client, endpoint: &str, query: &str) -> Result<String, SearchError> {
    let response = client
        .get(endpoint)
        .query(&[("q", query)])
        .header("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36")
        .send()
        .await
        .map_err(|e| SearchError::RequestFailed {
            provider: "duckduckgo-html",
            message: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(SearchError::RequestFailed {
            provider: "duckduckgo-html",
            message: format!("status {}", response.status()),
        });
    }

    response.text().await.map_err(|e| SearchError::ParseFailed {
        provider: "duckduckgo-html",
        message: e.to_string(),
    })
}

/// `html.duckduckgo.com` scrape with query-rewrite retries.
pub struct DuckDuckGoHtmlProvider {
    client: reqwest::Client,
}

impl DuckDuckGoHtmlProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for DuckDuckGoHtmlProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoHtmlProvider {
    fn name(&self) -> &'static str {
        "duckduckgo-html"
    }

    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchResult>, SearchError> {
        for rewrite in query_rewrites(query) {
            let html = fetch_html(&self.client, "https://html.duckduckgo.com/html/", &rewrite).await?;
            let results = parse_result_rows(
                &html,
                ".result, .web-result",
                "a.result__a, .result__title a",
                ".result__snippet",
            );
            if !results.is_empty() {
                return Ok(results.into_iter().take(count as usize).collect());
            }
        }
        Err(SearchError::NoResults {
            provider: "duckduckgo-html",
        })
    }
}

/// `lite.duckduckgo.com` table-layout variant, tried after the HTML variant
/// exhausts its rewrites (spec.md §4.4 step 4).
pub struct DuckDuckGoLiteProvider {
    client: reqwest::Client,
}

impl DuckDuckGoLiteProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for DuckDuckGoLiteProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoLiteProvider {
    fn name(&self) -> &'static str {
        "duckduckgo-lite"
    }

    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchResult>, SearchError> {
        let html = fetch_html(&self.client, "https://lite.duckduckgo.com/lite/", query).await?;
        let results = parse_result_rows(&html, "tr", "a.result-link", "td.result-snippet");
        if results.is_empty() {
            return Err(SearchError::NoResults {
                provider: "duckduckgo-lite",
            });
        }
        Ok(results.into_iter().take(count as usize).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_quote_and_append_site() {
        let rewrites = query_rewrites("openai");
        assert_eq!(rewrites[0], "openai");
        assert_eq!(rewrites[1], "\"openai\"");
        assert!(rewrites.contains(&"openai site:*".to_string()));
        assert!(rewrites.contains(&"openai.com".to_string()));
    }

    #[test]
    fn rewrites_split_compound_suffix() {
        let rewrites = query_rewrites("openai");
        assert!(rewrites.iter().any(|r| r == "open ai"));
    }

    #[test]
    fn rewrites_cap_at_six() {
        assert!(query_rewrites("rust async runtime").len() <= 6);
    }

    #[test]
    fn parses_ddg_html_result_rows() {
        let html = r#"
            <div class="result">
                <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2F">Example Domain</a>
                <a class="result__snippet">An example snippet.</a>
            </div>
        "#;
        let results = parse_result_rows(html, ".result", "a.result__a", ".result__snippet");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Example Domain");
        assert_eq!(results[0].url.as_str(), "https://example.com/");
    }
}
