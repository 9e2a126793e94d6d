//! Reddit domain extractor (spec.md §C): appends `.json` to a thread URL
//! and reads Reddit's own public listing API instead of the rendered page.

use std::collections::HashMap;

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;
use webpeel_types::registry::DomainContent;
use webpeel_types::DomainExtractor;

pub struct RedditExtractor {
    client: Client,
}

impl RedditExtractor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn json_url(url: &Url) -> Url {
        let mut json_url = url.clone();
        let path = json_url.path().trim_end_matches('/').to_string();
        json_url.set_path(&format!("{path}.json"));
        json_url.set_query(None);
        json_url
    }
}

#[async_trait]
impl DomainExtractor for RedditExtractor {
    fn name(&self) -> &str {
        "reddit"
    }

    fn applies(&self, url: &Url) -> bool {
        matches!(
            url.host_str(),
            Some(h) if h == "reddit.com" || h.ends_with(".reddit.com")
        )
    }

    async fn fetch(&self, url: &Url) -> anyhow::Result<DomainContent> {
        let json_url = Self::json_url(url);
        let resp = self
            .client
            .get(json_url.clone())
            .header("User-Agent", "webpeel/0.1 (+https://github.com/webpeel)")
            .send()
            .await
            .context("reddit .json request failed")?;

        if !resp.status().is_success() {
            bail!("reddit .json endpoint returned {}", resp.status());
        }

        let body: serde_json::Value = resp.json().await.context("reddit .json parse failed")?;
        let listing = body
            .as_array()
            .and_then(|arr| arr.first())
            .context("reddit .json response missing thread listing")?;
        let post = listing
            .pointer("/data/children/0/data")
            .context("reddit .json response missing post data")?;

        let title = post
            .get("title")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let selftext = post.get("selftext").and_then(|v| v.as_str()).unwrap_or("");
        let author = post.get("author").and_then(|v| v.as_str()).unwrap_or("");
        let subreddit = post
            .get("subreddit_name_prefixed")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let score = post.get("score").and_then(|v| v.as_i64()).unwrap_or(0);

        let comments = listing
            .pointer("/data/children/1/data/children")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut content = String::new();
        if let Some(t) = &title {
            content.push_str(&format!("# {t}\n\n"));
        }
        content.push_str(&format!("Posted by u/{author} in {subreddit} ({score} points)\n\n"));
        if !selftext.is_empty() {
            content.push_str(selftext);
            content.push_str("\n\n");
        }
        if !comments.is_empty() {
            content.push_str("## Top comments\n\n");
            for comment in comments.iter().take(10) {
                let Some(cdata) = comment.pointer("/data") else {
                    continue;
                };
                let body = cdata.get("body").and_then(|v| v.as_str()).unwrap_or("");
                let cauthor = cdata.get("author").and_then(|v| v.as_str()).unwrap_or("");
                if body.is_empty() || body == "[deleted]" || body == "[removed]" {
                    continue;
                }
                content.push_str(&format!("- **u/{cauthor}**: {body}\n"));
            }
        }

        let mut metadata = HashMap::new();
        metadata.insert("subreddit".to_string(), subreddit.to_string());
        metadata.insert("author".to_string(), author.to_string());
        metadata.insert("score".to_string(), score.to_string());

        Ok(DomainContent {
            title,
            content,
            metadata,
            raw: body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_only_to_reddit_hosts() {
        let extractor = RedditExtractor::new(Client::new());
        assert!(extractor.applies(&Url::parse("https://www.reddit.com/r/rust/comments/abc/title/").unwrap()));
        assert!(extractor.applies(&Url::parse("https://old.reddit.com/r/rust/comments/abc/").unwrap()));
        assert!(!extractor.applies(&Url::parse("https://example.com/reddit").unwrap()));
    }

    #[test]
    fn builds_json_url_by_appending_extension() {
        let url = Url::parse("https://www.reddit.com/r/rust/comments/abc/title/").unwrap();
        let json_url = RedditExtractor::json_url(&url);
        assert_eq!(json_url.as_str(), "https://www.reddit.com/r/rust/comments/abc/title.json");
    }
}
