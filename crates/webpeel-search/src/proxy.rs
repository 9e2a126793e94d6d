//! Search-as-Proxy Fallback (spec.md §4.7): when the real page is blocked,
//! retrieve whatever the search engines cached and synthesize a minimal
//! document from it. Never primary content — always quality ≤ 0.4.

use webpeel_types::SearchResult;

use crate::chain::SearchChain;

/// Result of a successful search-as-proxy lookup.
pub struct SearchProxyResult {
    pub title: String,
    pub cached_content: String,
    pub source: String,
}

const TOP_N: usize = 3;

/// Best-effort title heuristic: the last non-empty path segment, humanized.
fn bare_title_guess(url: &url::Url) -> String {
    url.path_segments()
        .and_then(|mut segs| segs.next_back())
        .map(|seg| seg.replace(['-', '_'], " "))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| url.host_str().unwrap_or("page").to_string())
}

/// Build the `site:<host> <path-without-extension>` query spec.md §4.7
/// describes, falling back to the bare-title heuristic when the path is
/// empty (e.g. a bare domain).
fn build_query(url: &url::Url) -> String {
    let host = url.host_str().unwrap_or("");
    let path = url.path().trim_start_matches('/');
    let path_no_ext = path.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(path);
    if path_no_ext.trim_matches('/').is_empty() {
        format!("site:{host} {}", bare_title_guess(url))
    } else {
        format!("site:{host} {}", path_no_ext.replace(['-', '_', '/'], " "))
    }
}

fn synthesize(results: &[SearchResult]) -> (String, String) {
    let title = results
        .first()
        .map(|r| r.title.clone())
        .unwrap_or_else(|| "Untitled".to_string());

    let mut content = String::new();
    for (i, r) in results.iter().take(TOP_N).enumerate() {
        if i > 0 {
            content.push_str("\n\n");
        }
        content.push_str(&format!("## {}\n\n{}", r.title, r.snippet));
    }
    (title, content)
}

/// Search for cached copies of `url` and synthesize a minimal markdown
/// document from the top 3 titles/snippets, or `None` if the engines have
/// nothing for it either.
pub async fn search_proxy(chain: &SearchChain, url: &url::Url) -> Option<SearchProxyResult> {
    let query = build_query(url);
    let results = chain.search_web(&query, 5).await;
    if results.is_empty() {
        return None;
    }
    let (title, content) = synthesize(&results);
    Some(SearchProxyResult {
        title,
        cached_content: content,
        source: "search-engine-cache".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_site_scoped_query_from_path() {
        let url = url::Url::parse("https://example.com/blog/my-great-post.html").unwrap();
        let q = build_query(&url);
        assert!(q.starts_with("site:example.com"));
        assert!(q.contains("my great post"));
    }

    #[test]
    fn falls_back_to_bare_title_for_root_path() {
        let url = url::Url::parse("https://example.com/").unwrap();
        let q = build_query(&url);
        assert_eq!(q, "site:example.com example.com");
    }

    #[test]
    fn synthesizes_minimal_markdown_from_top_results() {
        let results = vec![
            SearchResult::new(
                "Title One".to_string(),
                url::Url::parse("https://example.com/a").unwrap(),
                "Snippet one.".to_string(),
            ),
            SearchResult::new(
                "Title Two".to_string(),
                url::Url::parse("https://example.com/b").unwrap(),
                "Snippet two.".to_string(),
            ),
        ];
        let (title, content) = synthesize(&results);
        assert_eq!(title, "Title One");
        assert!(content.contains("## Title One"));
        assert!(content.contains("## Title Two"));
    }
}
