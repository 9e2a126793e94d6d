//! Hacker News domain extractor (spec.md §C): uses the Algolia HN Search
//! API instead of parsing `news.ycombinator.com`'s rendered HTML.

use std::collections::HashMap;

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;
use webpeel_types::registry::DomainContent;
use webpeel_types::DomainExtractor;

const ALGOLIA_ITEM_ENDPOINT: &str = "https://hn.algolia.com/api/v1/items";

pub struct HackerNewsExtractor {
    client: Client,
}

impl HackerNewsExtractor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn item_id(url: &Url) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.to_string())
    }

    fn render_comments(comments: &[serde_json::Value], depth: usize, out: &mut String) {
        for comment in comments {
            let Some(text) = comment.get("text").and_then(|v| v.as_str()) else {
                continue;
            };
            if text.is_empty() {
                continue;
            }
            let author = comment.get("author").and_then(|v| v.as_str()).unwrap_or("unknown");
            let indent = "  ".repeat(depth);
            out.push_str(&format!("{indent}- **{author}**: {}\n", strip_html_tags(text)));
            if let Some(children) = comment.get("children").and_then(|v| v.as_array()) {
                Self::render_comments(children, depth + 1, out);
            }
        }
    }
}

fn strip_html_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&#x27;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

#[async_trait]
impl DomainExtractor for HackerNewsExtractor {
    fn name(&self) -> &str {
        "hackernews"
    }

    fn applies(&self, url: &Url) -> bool {
        matches!(url.host_str(), Some("news.ycombinator.com"))
    }

    async fn fetch(&self, url: &Url) -> anyhow::Result<DomainContent> {
        let item_id = Self::item_id(url).context("hacker news URL missing item id")?;
        let endpoint = format!("{ALGOLIA_ITEM_ENDPOINT}/{item_id}");

        let resp = self
            .client
            .get(&endpoint)
            .send()
            .await
            .context("hacker news algolia request failed")?;
        if !resp.status().is_success() {
            bail!("hacker news algolia endpoint returned {}", resp.status());
        }
        let body: serde_json::Value = resp.json().await.context("hacker news algolia parse failed")?;

        let title = body
            .get("title")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let story_text = body.get("text").and_then(|v| v.as_str()).unwrap_or("");
        let story_url = body.get("url").and_then(|v| v.as_str()).unwrap_or("");
        let points = body.get("points").and_then(|v| v.as_i64()).unwrap_or(0);
        let author = body.get("author").and_then(|v| v.as_str()).unwrap_or("");

        let mut content = String::new();
        if let Some(t) = &title {
            content.push_str(&format!("# {t}\n\n"));
        }
        if !story_url.is_empty() {
            content.push_str(&format!("Link: {story_url}\n\n"));
        }
        content.push_str(&format!("Submitted by {author} ({points} points)\n\n"));
        if !story_text.is_empty() {
            content.push_str(&strip_html_tags(story_text));
            content.push_str("\n\n");
        }

        if let Some(children) = body.get("children").and_then(|v| v.as_array()) {
            content.push_str("## Comments\n\n");
            Self::render_comments(children, 0, &mut content);
        }

        let mut metadata = HashMap::new();
        metadata.insert("author".to_string(), author.to_string());
        metadata.insert("points".to_string(), points.to_string());

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
    fn applies_only_to_hn_host() {
        let extractor = HackerNewsExtractor::new(Client::new());
        assert!(extractor.applies(&Url::parse("https://news.ycombinator.com/item?id=123").unwrap()));
        assert!(!extractor.applies(&Url::parse("https://example.com/item?id=123").unwrap()));
    }

    #[test]
    fn extracts_item_id_from_query() {
        let url = Url::parse("https://news.ycombinator.com/item?id=38000123").unwrap();
        assert_eq!(HackerNewsExtractor::item_id(&url).as_deref(), Some("38000123"));
    }

    #[test]
    fn strips_tags_and_entities() {
        let stripped = strip_html_tags("<p>it&#x27;s &amp; &quot;great&quot;</p>");
        assert_eq!(stripped, "it's & \"great\"");
    }
}
