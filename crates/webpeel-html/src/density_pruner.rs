//! Density pruner: strips low-value boilerplate blocks before markdown
//! conversion (spec.md §4.5). Applied when HTML is large, format is
//! markdown, and the page is not being rendered full-page (§4.2 Stage 5).

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static CANDIDATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div, section, aside, ul, ol, table, form, li").unwrap());
static ALL_ELEMENTS_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("*").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)nav|header|footer|sidebar|aside|comment|promo|ad|cookie|newsletter|related")
        .unwrap()
});

const DENSITY_THRESHOLD: f64 = 2.0;
const MAX_TEXT_CHARS: usize = 80;
const LINK_DENSITY_THRESHOLD: f64 = 0.5;

struct Candidate {
    html: String,
    descendant_count: usize,
    density: f64,
    text_chars: usize,
    link_density: f64,
    boilerplate: bool,
}

fn analyze(el: &ElementRef) -> Candidate {
    let text_chars = el.text().collect::<String>().chars().count();
    let descendant_count = el.select(&ALL_ELEMENTS_SELECTOR).count();
    let link_chars: usize = el
        .select(&LINK_SELECTOR)
        .map(|a| a.text().collect::<String>().chars().count())
        .sum();
    let link_density = if text_chars == 0 {
        0.0
    } else {
        (link_chars as f64 / text_chars as f64).min(1.0)
    };
    let density = text_chars as f64 / (1.0 + descendant_count as f64);
    let class_and_id = format!(
        "{} {}",
        el.value().attr("class").unwrap_or(""),
        el.value().attr("id").unwrap_or("")
    );
    Candidate {
        html: el.html(),
        descendant_count,
        density,
        text_chars,
        link_density,
        boilerplate: BOILERPLATE_RE.is_match(&class_and_id),
    }
}

fn should_remove(c: &Candidate) -> bool {
    c.density < DENSITY_THRESHOLD
        && c.text_chars < MAX_TEXT_CHARS
        && c.link_density > LINK_DENSITY_THRESHOLD
        && c.boilerplate
}

/// Walk the DOM, collect low-density boilerplate blocks, and strip them
/// from a serialized copy of the document. Returns the pruned HTML and the
/// percent of DOM nodes removed.
pub fn prune(html: &str) -> (String, f64) {
    let doc = Html::parse_document(html);
    let total_nodes = doc.select(&ALL_ELEMENTS_SELECTOR).count().max(1);

    let mut candidates: Vec<Candidate> = doc
        .select(&CANDIDATE_SELECTOR)
        .map(|el| analyze(&el))
        .filter(should_remove)
        .collect();

    // Remove outer (longer-serialized) candidates first so a nested block
    // already covered by an ancestor removal isn't double-counted.
    candidates.sort_by(|a, b| b.html.len().cmp(&a.html.len()));

    let mut working = doc.root_element().html();
    let mut removed_nodes = 0usize;
    for candidate in &candidates {
        if working.contains(&candidate.html) {
            working = working.replacen(&candidate.html, "", 1);
            removed_nodes += 1 + candidate.descendant_count;
        }
    }

    let percent = (removed_nodes as f64 / total_nodes as f64 * 100.0).min(100.0);
    (working, percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prunes_link_heavy_boilerplate_sidebar() {
        let mut links = String::new();
        for i in 0..6 {
            links.push_str(&format!("<a href=\"/l{i}\">l{i}</a> "));
        }
        let html = format!(
            r#"<html><body>
            <article><p>A long substantive paragraph of article content that should survive pruning untouched by the density filter here.</p></article>
            <aside class="sidebar-promo">{links}</aside>
            </body></html>"#
        );
        let (pruned, percent) = prune(&html);
        assert!(!pruned.contains("sidebar-promo"));
        assert!(pruned.contains("substantive paragraph"));
        assert!(percent > 0.0);
    }

    #[test]
    fn keeps_substantive_content_untouched() {
        let html = "<html><body><article><p>Just a normal paragraph with no boilerplate markers at all.</p></article></body></html>";
        let (pruned, percent) = prune(html);
        assert!(pruned.contains("normal paragraph"));
        assert_eq!(percent, 0.0);
    }
}
