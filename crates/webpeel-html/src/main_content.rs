//! Main-content detection: score candidate block elements and pick the one
//! most likely to be the article body (spec.md §4.5).

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static CANDIDATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article, main, [role='main'], section, div").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)nav|header|footer|sidebar|aside|comment|promo|ad|cookie|newsletter|related")
        .unwrap()
});

const BOILERPLATE_PENALTY: f64 = 0.2;
const MIN_SHARE_OF_BODY_TEXT: f64 = 0.4;

fn semantic_weight(el: &ElementRef) -> f64 {
    let value = el.value();
    if value.name() == "article" {
        3.0
    } else if value.name() == "main" {
        2.5
    } else if value.attr("role") == Some("main") {
        2.0
    } else if value.name() == "section" {
        1.2
    } else {
        1.0
    }
}

fn matches_boilerplate(el: &ElementRef) -> bool {
    let class_and_id = format!(
        "{} {}",
        el.value().attr("class").unwrap_or(""),
        el.value().attr("id").unwrap_or("")
    );
    BOILERPLATE_RE.is_match(&class_and_id)
}

fn text_len(el: &ElementRef) -> usize {
    el.text().collect::<String>().chars().count()
}

fn link_text_len(el: &ElementRef) -> usize {
    el.select(&LINK_SELECTOR)
        .map(|a| a.text().collect::<String>().chars().count())
        .sum()
}

fn score_element(el: &ElementRef) -> f64 {
    let text = text_len(el);
    if text == 0 {
        return 0.0;
    }
    let link_text = link_text_len(el);
    let link_ratio = 1.0 - (link_text as f64 / text as f64).min(1.0);
    // text_to_link_ratio close to 1 when little of the text is inside <a>.
    let mut score = text as f64 * link_ratio.max(0.05) * semantic_weight(el);
    if matches_boilerplate(el) {
        score *= BOILERPLATE_PENALTY;
    }
    score
}

/// Returns the inner HTML of the highest-scoring candidate block, or `None`
/// if no candidate reaches 40% of total body text (caller should keep the
/// original document in that case).
pub fn detect_main_content(doc: &Html) -> Option<String> {
    let body_text_len = doc
        .select(&BODY_SELECTOR)
        .next()
        .map(|b| text_len(&b))
        .unwrap_or_else(|| doc.root_element().text().collect::<String>().chars().count());

    if body_text_len == 0 {
        return None;
    }

    let mut best: Option<(f64, ElementRef)> = None;
    for el in doc.select(&CANDIDATE_SELECTOR) {
        let score = score_element(&el);
        if best.as_ref().map(|(s, _)| score > *s).unwrap_or(true) {
            best = Some((score, el));
        }
    }

    let (_, best_el) = best?;
    let share = text_len(&best_el) as f64 / body_text_len as f64;
    if share >= MIN_SHARE_OF_BODY_TEXT {
        Some(best_el.html())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_article_over_nav_chrome() {
        let html = r#"<html><body>
            <nav class="site-nav"><a href="/a">A</a><a href="/b">B</a><a href="/c">C</a></nav>
            <article>
                <h1>Big Story</h1>
                <p>This is the first paragraph of a long, detailed news article describing events in depth.</p>
                <p>This is the second paragraph continuing the narrative with more substantive prose content.</p>
                <p>A third paragraph wraps up the story with concluding remarks and analysis for readers.</p>
            </article>
            <footer class="site-footer"><a href="/privacy">Privacy</a></footer>
        </body></html>"#;
        let doc = Html::parse_document(html);
        let main = detect_main_content(&doc).expect("should find main content");
        assert!(main.contains("Big Story"));
        assert!(!main.contains("site-nav"));
    }

    #[test]
    fn returns_none_when_no_candidate_dominates() {
        let html = "<html><body><div>short</div></body></html>";
        let doc = Html::parse_document(html);
        assert!(detect_main_content(&doc).is_none());
    }
}
