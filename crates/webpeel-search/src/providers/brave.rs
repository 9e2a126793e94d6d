//! Brave Search API provider — second in the keyed-API tier of the fallback
//! chain, same shape as [`super::google::GoogleProvider`].

use async_trait::async_trait;
use serde_json::Value;
use url::Url;
use webpeel_types::SearchResult;

use crate::errors::SearchError;
use crate::provider::SearchProvider;

const ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

pub struct BraveProvider {
    api_key: String,
    client: reqwest::Client,
}

impl BraveProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SearchProvider for BraveProvider {
    fn name(&self) -> &'static str {
        "brave"
    }

    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .client
            .get(ENDPOINT)
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", &count.clamp(1, 20).to_string())])
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed {
                provider: "brave",
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SearchError::RequestFailed {
                provider: "brave",
                message: format!("status {}", response.status()),
            });
        }

        let body: Value = response.json().await.map_err(|e| SearchError::ParseFailed {
            provider: "brave",
            message: e.to_string(),
        })?;

        let items = body
            .get("web")
            .and_then(|w| w.get("results"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut results = Vec::new();
        for item in items {
            let Some(link) = item.get("url").and_then(|v| v.as_str()) else {
                continue;
            };
            let Ok(url) = Url::parse(link) else { continue };
            let title = item.get("title").and_then(|v| v.as_str()).unwrap_or(link);
            let snippet = item
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            results.push(SearchResult::new(title.to_string(), url, snippet.to_string()));
        }

        if results.is_empty() {
            return Err(SearchError::NoResults { provider: "brave" });
        }
        Ok(results)
    }
}
