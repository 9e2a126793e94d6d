//! Google Programmable Search Engine (Custom Search JSON API) provider.
//! Grounded on the teacher's `SerperProvider` (reqwest JSON client hitting
//! a keyed third-party search API) in riptide-search/src/providers.rs.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;
use webpeel_types::SearchResult;

use crate::errors::SearchError;
use crate::provider::SearchProvider;

const ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

pub struct GoogleProvider {
    api_key: String,
    cx: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(api_key: String, cx: String) -> Self {
        Self {
            api_key,
            cx,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SearchProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx.as_str()),
                ("q", query),
                ("num", &count.clamp(1, 10).to_string()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed {
                provider: "google",
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SearchError::RequestFailed {
                provider: "google",
                message: format!("status {}", response.status()),
            });
        }

        let body: Value = response.json().await.map_err(|e| SearchError::ParseFailed {
            provider: "google",
            message: e.to_string(),
        })?;

        let items = body
            .get("items")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut results = Vec::new();
        for item in items {
            let Some(link) = item.get("link").and_then(|v| v.as_str()) else {
                continue;
            };
            let Ok(url) = Url::parse(link) else { continue };
            let title = item.get("title").and_then(|v| v.as_str()).unwrap_or(link);
            let snippet = item.get("snippet").and_then(|v| v.as_str()).unwrap_or("");
            results.push(SearchResult::new(title.to_string(), url, snippet.to_string()));
        }

        if results.is_empty() {
            return Err(SearchError::NoResults { provider: "google" });
        }
        Ok(results)
    }
}
