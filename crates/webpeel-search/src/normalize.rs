//! Result normalization shared by every scraping provider (spec.md §4.4
//! "Result normalization"): decode redirect wrappers, validate protocol,
//! and build the deduplicated, ordered result list.

use url::Url;
use webpeel_types::SearchResult;

/// Decode a search engine's redirect-wrapper URL, if `href` is one. Handles
/// DuckDuckGo's `//duckduckgo.com/l/?uddg=<encoded>` and Google's
/// `/url?q=<encoded>&...` forms. Returns the href unchanged if it isn't a
/// recognized wrapper.
pub fn decode_redirect(href: &str) -> String {
    let Ok(parsed) = Url::parse(href).or_else(|_| Url::parse(&format!("https:{href}"))) else {
        return href.to_string();
    };
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    for key in ["uddg", "q"] {
        if let Some((_, value)) = pairs.iter().find(|(k, _)| k == key) {
            if value.starts_with("http://") || value.starts_with("https://") {
                return value.clone();
            }
        }
    }
    href.to_string()
}

/// Parse a decoded URL and validate its protocol is http/https, per spec.md
/// §4.4 "Validate protocol ∈ {http, https}".
pub fn parse_valid_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    if url.scheme() == "http" || url.scheme() == "https" {
        Some(url)
    } else {
        None
    }
}

/// Deduplicate a list of results by normalized URL key, keeping the first
/// occurrence — callers pass results in engine-declaration order so earlier
/// engines dominate ties (spec.md §5 Ordering guarantees).
pub fn dedupe(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(results.len());
    for r in results {
        let key = r.normalize_key();
        if seen.insert(key) {
            out.push(r);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ddg_uddg_wrapper() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpage&rut=abc";
        assert_eq!(decode_redirect(href), "https://example.com/page");
    }

    #[test]
    fn decodes_google_url_wrapper() {
        let href = "/url?q=https://example.com/page&sa=U";
        assert_eq!(decode_redirect(href), "https://example.com/page");
    }

    #[test]
    fn leaves_plain_urls_untouched() {
        assert_eq!(decode_redirect("https://example.com/page"), "https://example.com/page");
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let a = SearchResult::new(
            "A".to_string(),
            Url::parse("https://www.example.com/page/").unwrap(),
            "snippet a".to_string(),
        );
        let b = SearchResult::new(
            "B".to_string(),
            Url::parse("https://example.com/page").unwrap(),
            "snippet b".to_string(),
        );
        let out = dedupe(vec![a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "A");
    }
}
