//! The challenge/block detector itself: `detect(html, status) -> ChallengeVerdict`.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use webpeel_types::search::verdict_from_score;
use webpeel_types::{ChallengeType, ChallengeVerdict};

use crate::signals::{Needle, GENERIC_BLOCK_PHRASES, PROVIDERS};

/// Status codes treated as bot-protection signals in both the provider
/// formula and the generic-block rule.
fn is_bot_status(status: u16) -> bool {
    matches!(status, 403 | 429 | 503)
}

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static P_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static SCRIPT_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("script").unwrap());
static ROOT_MOUNT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#__next, #root, #app").unwrap());
static SCRIPT_STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</\1>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());

/// Strip script/style blocks and all remaining tags, collapsing whitespace,
/// to approximate "visible text" the way spec.md's empty-shell and
/// false-positive gates require.
pub fn visible_text(html: &str) -> String {
    let no_script = SCRIPT_STYLE_RE.replace_all(html, " ");
    let no_tags = TAG_RE.replace_all(&no_script, " ");
    no_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn page_title(doc: &Html) -> String {
    doc.select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>())
        .unwrap_or_default()
}

/// Count how many `<p>` elements have more than 40 chars of visible text —
/// the "substantive paragraph" gate used by the generic-block rule.
fn substantive_paragraph_count(doc: &Html) -> usize {
    doc.select(&P_SELECTOR)
        .filter(|p| p.text().collect::<String>().trim().chars().count() > 40)
        .count()
}

/// Empty-SPA-shell detection (spec.md §4.3).
fn is_empty_shell(html: &str, doc: &Html, text: &str) -> bool {
    let script_count = doc.select(&SCRIPT_SELECTOR).count();
    let has_root_mount = doc.select(&ROOT_MOUNT_SELECTOR).next().is_some();
    html.len() > 2000 && text.chars().count() < 200 && script_count >= 4 && has_root_mount
}

/// A provider signature only applies once it clears spec.md §4.3's "match
/// ≥ 2 of ~4 listed signals" floor — a single hook (even a near-dispositive
/// one) is not enough on its own.
const MIN_SIGNALS_MATCHED: usize = 2;

/// Evaluate every provider's signal list against the raw HTML (and parsed
/// title where relevant), returning the matched signal names and the
/// per-provider confidence formula from spec.md §4.3:
/// `min(1.0, 0.35 * signals_matched + 0.15 * (status in {403,429,503} ? 1 : 0))`,
/// gated on matching at least [`MIN_SIGNALS_MATCHED`] signals.
fn score_provider(
    html_lower: &str,
    title_lower: &str,
    status: u16,
    signals: &'static [crate::signals::SignalSpec],
) -> (f64, Vec<String>) {
    let mut matched = Vec::new();
    for spec in signals {
        let hit = match &spec.needle {
            Needle::Html(s) => html_lower.contains(s),
            Needle::TitleContains(s) => title_lower.contains(s),
        };
        if hit {
            matched.push(spec.name.to_string());
        }
    }
    if matched.len() < MIN_SIGNALS_MATCHED {
        return (0.0, matched);
    }
    let status_bonus = if is_bot_status(status) { 1.0 } else { 0.0 };
    let confidence = (0.35 * matched.len() as f64 + 0.15 * status_bonus).min(1.0);
    (confidence, matched)
}

/// Generic-block scoring: HTTP status in {403,429,503} OR (content-length <
/// 2000 AND any keyword AND no substantive `<p>`).
fn score_generic(html: &str, doc: &Html, status: u16) -> (f64, Vec<String>) {
    let html_lower = html.to_lowercase();
    let matched_phrases: Vec<String> = GENERIC_BLOCK_PHRASES
        .iter()
        .filter(|p| html_lower.contains(*p))
        .map(|p| p.to_string())
        .collect();

    let short_and_keyworded = html.len() < 2000
        && !matched_phrases.is_empty()
        && substantive_paragraph_count(doc) == 0;

    if !is_bot_status(status) && !short_and_keyworded {
        return (0.0, Vec::new());
    }

    let mut confidence = 0.0;
    let mut signals = Vec::new();
    if is_bot_status(status) {
        confidence += 0.5;
        signals.push(format!("http-status-{status}"));
    }
    if short_and_keyworded {
        confidence += 0.2 * matched_phrases.len().min(3) as f64;
        signals.extend(matched_phrases);
    }
    (confidence.min(1.0), signals)
}

/// `detect(html, statusCode) -> ChallengeVerdict`, per spec.md §4.3.
///
/// False-positive prevention: a page with more than 1500 chars of visible
/// text and no provider-specific DOM hooks is never classified as a block,
/// regardless of keyword matches — the generic-block lexical path is
/// gated on this before it can fire.
pub fn detect(html: &str, status: u16) -> ChallengeVerdict {
    let doc = Html::parse_document(html);
    let title = page_title(&doc);
    let html_lower = html.to_lowercase();
    let title_lower = title.to_lowercase();
    let text = visible_text(html);

    let mut best: Option<(ChallengeType, f64, Vec<String>)> = None;
    let mut any_provider_hook = false;
    for provider in PROVIDERS {
        let (confidence, signals) = score_provider(&html_lower, &title_lower, status, provider.signals);
        if !signals.is_empty() {
            any_provider_hook = true;
        }
        if best.as_ref().map(|(_, c, _)| confidence > *c).unwrap_or(true) {
            best = Some((provider.provider, confidence, signals));
        }
    }

    if is_empty_shell(html, &doc, &text) {
        return verdict_from_score(ChallengeType::EmptyShell, 1.0, vec!["empty-shell".to_string()]);
    }

    if let Some((provider_type, confidence, signals)) = best {
        if confidence >= 0.7 {
            return verdict_from_score(provider_type, confidence, signals);
        }
    }

    // Article-length / DOM-hook gate: long substantive text with no
    // provider fingerprint is never a block, no matter what keywords appear.
    let substantial_article = text.chars().count() > 1500 && !any_provider_hook;
    if substantial_article {
        return ChallengeVerdict::none();
    }

    let (generic_confidence, generic_signals) = score_generic(html, &doc, status);
    if generic_confidence > 0.0 {
        return verdict_from_score(ChallengeType::GenericBlock, generic_confidence, generic_signals);
    }

    ChallengeVerdict::none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloudflare_challenge_html() -> &'static str {
        r#"<html><head><title>Just a moment...</title></head>
        <body><div class="cf-turnstile"></div><p>cf-ray: abc123</p>
        <script src="/cdn-cgi/challenge-platform/h/b/orchestrate/chl_page/v1"></script>
        </body></html>"#
    }

    #[test]
    fn detects_cloudflare_challenge() {
        let v = detect(cloudflare_challenge_html(), 503);
        assert!(v.is_challenge);
        assert!(matches!(v.challenge_type, ChallengeType::Cloudflare));
    }

    #[test]
    fn detects_perimeterx_press_and_hold() {
        let html = r#"<html><body><div id="px-captcha"></div>
        <p>Press & Hold to confirm you are a human (and not a bot).</p>
        <script>document.querySelector("#px-captcha"); var _pxAppId = "abc";</script></body></html>"#;
        let v = detect(html, 403);
        assert!(v.is_challenge);
        assert!(matches!(v.challenge_type, ChallengeType::Perimeterx));
    }

    #[test]
    fn detects_akamai_bmak() {
        let html = r#"<html><body>
        <script src="https://x.akamaized.net/akam/11/bmak.js"></script>
        <script>document.cookie="_bm_sz=xyz; ak_bmsc=abc"</script>
        </body></html>"#;
        let v = detect(html, 403);
        assert!(v.is_challenge);
        assert!(matches!(v.challenge_type, ChallengeType::Akamai));
    }

    #[test]
    fn detects_datadome_captcha() {
        let html = r#"<html><body>
        <script src="https://ct.datadome.co/t.js"></script>
        <iframe src="https://geo.captcha-delivery.com/captcha/"></iframe>
        <script>var ddjskey = "abc";</script>
        </body></html>"#;
        let v = detect(html, 403);
        assert!(v.is_challenge);
        assert!(matches!(v.challenge_type, ChallengeType::Datadome));
    }

    #[test]
    fn detects_incapsula() {
        let html = r#"<html><body>
        <script src="/_Incapsula_Resource?SWJIYLWA=incapsula.js"></script>
        <p>incap_ses_123=abc; visid_incap_456=def</p>
        <p>Incapsula incident ID: 12345</p>
        </body></html>"#;
        let v = detect(html, 403);
        assert!(v.is_challenge);
        assert!(matches!(v.challenge_type, ChallengeType::Incapsula));
    }

    #[test]
    fn detects_empty_next_js_shell() {
        let mut body = String::from(r#"<html><body><div id="__next"></div>"#);
        for i in 0..6 {
            body.push_str(&format!("<script src=\"/_next/static/chunk{i}.js\"></script>"));
        }
        body.push_str("</body></html>");
        // Pad to exceed 2000 chars while keeping visible text near zero.
        let html = format!("{body}<!-- {} -->", "x".repeat(2200));
        let v = detect(&html, 200);
        assert!(v.is_challenge);
        assert!(matches!(v.challenge_type, ChallengeType::EmptyShell));
    }

    #[test]
    fn false_positive_article_about_captchas() {
        let mut article = String::from("<html><body><article><h1>How CAPTCHAs Work</h1>");
        for _ in 0..15 {
            article.push_str("<p>This long paragraph discusses bot protection, captcha systems, and access denied pages in great detail for educational readers who want to understand web security thoroughly and completely.</p>");
        }
        article.push_str("</article></body></html>");
        let v = detect(&article, 200);
        assert!(!v.is_challenge);
    }

    #[test]
    fn false_positive_login_page() {
        let html = r#"<html><body><form><label>Username</label><input name="u">
        <label>Password</label><input name="p" type="password">
        <button>Sign in</button></form></body></html>"#;
        let v = detect(html, 200);
        assert!(!v.is_challenge);
    }

    #[test]
    fn false_positive_404_page() {
        let html = "<html><body><h1>404 Not Found</h1><p>The page you requested does not exist.</p></body></html>";
        let v = detect(html, 404);
        assert!(!v.is_challenge);
    }

    #[test]
    fn false_positive_product_page() {
        let mut html = String::from("<html><body><h1>Wireless Headphones</h1>");
        for _ in 0..10 {
            html.push_str("<p>These premium wireless headphones deliver crisp, detailed audio with active noise cancellation and a thirty hour battery life for all-day listening comfort.</p>");
        }
        html.push_str("</body></html>");
        let v = detect(&html, 200);
        assert!(!v.is_challenge);
    }
}
