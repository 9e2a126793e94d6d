//! GitHub domain extractor (spec.md §C): reads repository READMEs and
//! issue/PR threads via the GitHub REST API instead of scraping
//! `github.com`'s rendered HTML.

use std::collections::HashMap;

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;
use webpeel_types::registry::DomainContent;
use webpeel_types::DomainExtractor;

const API_BASE: &str = "https://api.github.com";

enum GithubRoute {
    Repo { owner: String, repo: String },
    Issue { owner: String, repo: String, number: u64 },
}

fn route(url: &Url) -> Option<GithubRoute> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [owner, repo] => Some(GithubRoute::Repo {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }),
        [owner, repo, kind @ ("issues" | "pull"), number] => {
            let _ = kind;
            number.parse().ok().map(|number| GithubRoute::Issue {
                owner: owner.to_string(),
                repo: repo.to_string(),
                number,
            })
        }
        _ => None,
    }
}

pub struct GithubExtractor {
    client: Client,
}

impl GithubExtractor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_json(&self, path: &str) -> anyhow::Result<serde_json::Value> {
        let resp = self
            .client
            .get(format!("{API_BASE}{path}"))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "webpeel/0.1 (+https://github.com/webpeel)")
            .send()
            .await
            .with_context(|| format!("github api request to {path} failed"))?;
        if !resp.status().is_success() {
            bail!("github api {path} returned {}", resp.status());
        }
        resp.json()
            .await
            .with_context(|| format!("github api {path} response was not valid json"))
    }

    async fn fetch_repo(&self, owner: &str, repo: &str) -> anyhow::Result<DomainContent> {
        let repo_data = self.get_json(&format!("/repos/{owner}/{repo}")).await?;
        let readme = self
            .client
            .get(format!("{API_BASE}/repos/{owner}/{repo}/readme"))
            .header("Accept", "application/vnd.github.raw+json")
            .header("User-Agent", "webpeel/0.1 (+https://github.com/webpeel)")
            .send()
            .await
            .context("github readme request failed")?
            .text()
            .await
            .unwrap_or_default();

        let full_name = repo_data
            .get("full_name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("{owner}/{repo}"));
        let description = repo_data
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let stars = repo_data
            .get("stargazers_count")
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        let language = repo_data.get("language").and_then(|v| v.as_str()).unwrap_or("");

        let mut content = format!("# {full_name}\n\n");
        if !description.is_empty() {
            content.push_str(&format!("{description}\n\n"));
        }
        content.push_str(&format!("Stars: {stars} | Language: {language}\n\n"));
        content.push_str(&readme);

        let mut metadata = HashMap::new();
        metadata.insert("stars".to_string(), stars.to_string());
        metadata.insert("language".to_string(), language.to_string());

        Ok(DomainContent {
            title: Some(full_name),
            content,
            metadata,
            raw: repo_data,
        })
    }

    async fn fetch_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<DomainContent> {
        let issue = self
            .get_json(&format!("/repos/{owner}/{repo}/issues/{number}"))
            .await?;
        let comments = self
            .get_json(&format!("/repos/{owner}/{repo}/issues/{number}/comments"))
            .await
            .unwrap_or(serde_json::Value::Array(Vec::new()));

        let title = issue.get("title").and_then(|v| v.as_str()).map(|s| s.to_string());
        let body = issue.get("body").and_then(|v| v.as_str()).unwrap_or("");
        let state = issue.get("state").and_then(|v| v.as_str()).unwrap_or("");
        let author = issue
            .pointer("/user/login")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let mut content = String::new();
        if let Some(t) = &title {
            content.push_str(&format!("# {t}\n\n"));
        }
        content.push_str(&format!("Opened by {author} · {state}\n\n"));
        content.push_str(body);
        content.push_str("\n\n");

        if let Some(comment_list) = comments.as_array() {
            if !comment_list.is_empty() {
                content.push_str("## Comments\n\n");
                for comment in comment_list {
                    let cauthor = comment.pointer("/user/login").and_then(|v| v.as_str()).unwrap_or("");
                    let cbody = comment.get("body").and_then(|v| v.as_str()).unwrap_or("");
                    if cbody.is_empty() {
                        continue;
                    }
                    content.push_str(&format!("- **{cauthor}**: {cbody}\n"));
                }
            }
        }

        let mut metadata = HashMap::new();
        metadata.insert("state".to_string(), state.to_string());
        metadata.insert("author".to_string(), author.to_string());

        Ok(DomainContent {
            title,
            content,
            metadata,
            raw: issue,
        })
    }
}

#[async_trait]
impl DomainExtractor for GithubExtractor {
    fn name(&self) -> &str {
        "github"
    }

    fn applies(&self, url: &Url) -> bool {
        matches!(url.host_str(), Some("github.com"))
    }

    async fn fetch(&self, url: &Url) -> anyhow::Result<DomainContent> {
        match route(url).context("unrecognized github URL shape")? {
            GithubRoute::Repo { owner, repo } => self.fetch_repo(&owner, &repo).await,
            GithubRoute::Issue { owner, repo, number } => self.fetch_issue(&owner, &repo, number).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_repo_url() {
        let url = Url::parse("https://github.com/rust-lang/rust").unwrap();
        match route(&url) {
            Some(GithubRoute::Repo { owner, repo }) => {
                assert_eq!(owner, "rust-lang");
                assert_eq!(repo, "rust");
            }
            _ => panic!("expected repo route"),
        }
    }

    #[test]
    fn routes_issue_url() {
        let url = Url::parse("https://github.com/rust-lang/rust/issues/12345").unwrap();
        match route(&url) {
            Some(GithubRoute::Issue { owner, repo, number }) => {
                assert_eq!(owner, "rust-lang");
                assert_eq!(repo, "rust");
                assert_eq!(number, 12345);
            }
            _ => panic!("expected issue route"),
        }
    }

    #[test]
    fn applies_only_to_github_host() {
        let extractor = GithubExtractor::new(Client::new());
        assert!(extractor.applies(&Url::parse("https://github.com/rust-lang/rust").unwrap()));
        assert!(!extractor.applies(&Url::parse("https://gitlab.com/rust-lang/rust").unwrap()));
    }
}
