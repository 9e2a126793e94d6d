//! Types shared between the challenge detector and the search providers.

use serde::{Deserialize, Serialize};

/// Bot-protection vendor (or class of block) a page was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeType {
    Cloudflare,
    Perimeterx,
    Akamai,
    Datadome,
    Incapsula,
    GenericBlock,
    EmptyShell,
    None,
}

/// Output of the challenge detector (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeVerdict {
    pub is_challenge: bool,
    #[serde(rename = "type")]
    pub challenge_type: ChallengeType,
    pub confidence: f64,
    pub signals: Vec<String>,
}

impl ChallengeVerdict {
    pub fn none() -> Self {
        Self {
            is_challenge: false,
            challenge_type: ChallengeType::None,
            confidence: 0.0,
            signals: Vec::new(),
        }
    }
}

const CHALLENGE_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Builds a verdict from a provider/score pair, enforcing
/// `isChallenge ⇔ confidence ≥ 0.7`.
pub fn verdict_from_score(
    challenge_type: ChallengeType,
    confidence: f64,
    signals: Vec<String>,
) -> ChallengeVerdict {
    ChallengeVerdict {
        is_challenge: confidence >= CHALLENGE_CONFIDENCE_THRESHOLD,
        challenge_type,
        confidence,
        signals,
    }
}

/// A single normalized search-engine result (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: url::Url,
    pub snippet: String,
}

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_SNIPPET_CHARS: usize = 500;

impl SearchResult {
    /// Construct a result, clamping title/snippet to their spec'd maximum
    /// lengths and trimming leading/trailing ellipses from the snippet.
    pub fn new(title: String, url: url::Url, snippet: String) -> Self {
        Self {
            title: clamp_chars(&title, MAX_TITLE_CHARS),
            url,
            snippet: clamp_chars(strip_ellipses(&snippet), MAX_SNIPPET_CHARS),
        }
    }

    /// The deduplication key: `lower(host without "www.") + path(trim
    /// trailing slashes)`.
    pub fn normalize_key(&self) -> String {
        normalize_url_key(&self.url)
    }
}

/// Shared normalization function used by both dedup (§4.4) and URL-based
/// dedup elsewhere (§3's definition of the URL data type).
pub fn normalize_url_key(url: &url::Url) -> String {
    let host = url
        .host_str()
        .unwrap_or("")
        .to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let path = url.path().trim_end_matches('/');
    format!("{host}{path}")
}

fn clamp_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

fn strip_ellipses(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '…' || c == '.')
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_threshold_is_exact() {
        let v = verdict_from_score(ChallengeType::Cloudflare, 0.7, vec![]);
        assert!(v.is_challenge);
        let v = verdict_from_score(ChallengeType::Cloudflare, 0.699, vec![]);
        assert!(!v.is_challenge);
    }

    #[test]
    fn normalize_strips_www_and_trailing_slash() {
        let a = url::Url::parse("https://www.Example.com/Foo/Bar/").unwrap();
        let b = url::Url::parse("https://example.com/Foo/Bar").unwrap();
        assert_eq!(normalize_url_key(&a), normalize_url_key(&b));
    }

    #[test]
    fn clamps_title_and_snippet() {
        let long_title = "x".repeat(300);
        let long_snip = format!("...{}", "y".repeat(600));
        let r = SearchResult::new(
            long_title,
            url::Url::parse("https://example.com").unwrap(),
            long_snip,
        );
        assert_eq!(r.title.chars().count(), MAX_TITLE_CHARS);
        assert!(r.snippet.chars().count() <= MAX_SNIPPET_CHARS);
        assert!(!r.snippet.starts_with('.'));
    }
}
