//! Budget Distillation (spec.md §4.6): BM25-based passage selection to fit
//! a soft token budget, with a head-truncation safety net for pathological
//! inputs.

use crate::bm25::Bm25Corpus;

/// Char-per-token heuristic shared with `webpeel-pipeline`'s BuildResult
/// token estimate (spec.md §4.2 Stage 8).
fn estimate_tokens(s: &str) -> u32 {
    ((s.chars().count() as f64) / 4.0).ceil().max(0.0) as u32
}

/// Split `content` into paragraph-level passages for markdown/text content,
/// dropping blank runs (spec.md §4.6 step 1).
fn split_passages(content: &str) -> Vec<String> {
    content
        .split("\n\n")
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Pull the document's title line (a leading `# ...` heading) out so it can
/// always be preserved, per spec.md §4.6 step 5.
fn leading_title_line(content: &str) -> Option<String> {
    content
        .lines()
        .find(|l| !l.trim().is_empty())
        .filter(|l| l.trim_start().starts_with('#'))
        .map(|l| l.trim().to_string())
}

/// Head-truncate at a word boundary, used both as the distillation safety
/// net and as the maxTokens hard cap (spec.md §4.2 Stage 6 step 5).
pub fn head_truncate_at_word_boundary(content: &str, budget_tokens: u32) -> String {
    let budget_chars = (budget_tokens as usize).saturating_mul(4);
    if content.chars().count() <= budget_chars {
        return content.to_string();
    }
    let truncated: String = content.chars().take(budget_chars).collect();
    match truncated.rfind(char::is_whitespace) {
        Some(idx) => truncated[..idx].trim_end().to_string(),
        None => truncated,
    }
}

/// Result of a distillation attempt.
pub struct DistillOutcome {
    pub content: String,
    pub budget_fallback: bool,
    pub warning: Option<String>,
}

/// `distill(content, budgetTokens, format) -> content'` where
/// `tokens(content') <= budgetTokens * 1.1` (spec.md §4.6). `query` is the
/// title+first-heading derivation, or the caller's `question` when set.
pub fn distill(content: &str, budget_tokens: u32, query: &str) -> DistillOutcome {
    let original_len = content.chars().count();
    let passages = split_passages(content);

    if passages.is_empty() {
        let truncated = head_truncate_at_word_boundary(content, budget_tokens);
        return DistillOutcome {
            content: truncated,
            budget_fallback: false,
            warning: None,
        };
    }

    let corpus = Bm25Corpus::new(&passages);
    let scores = corpus.score_all(query);

    let mut ranked: Vec<usize> = (0..passages.len()).collect();
    ranked.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let budget_chars_max = (budget_tokens as f64 * 1.1 * 4.0) as usize;
    let title = leading_title_line(content);
    let mut included = vec![false; passages.len()];
    let mut running_chars = title.as_ref().map(|t| t.chars().count() + 2).unwrap_or(0);

    for &idx in &ranked {
        let passage_chars = passages[idx].chars().count() + 2;
        if running_chars + passage_chars > budget_chars_max && running_chars > 0 {
            continue;
        }
        included[idx] = true;
        running_chars += passage_chars;
    }
    // Guarantee progress even when the very first passage alone exceeds
    // budget: always keep at least the highest-scoring one.
    if included.iter().all(|&b| !b) {
        if let Some(&best) = ranked.first() {
            included[best] = true;
        }
    }

    let mut out_parts = Vec::new();
    if let Some(t) = &title {
        out_parts.push(t.clone());
    }
    for (idx, passage) in passages.iter().enumerate() {
        if included[idx] {
            out_parts.push(passage.clone());
        }
    }
    let output = out_parts.join("\n\n");

    // Safety net (spec.md §4.6 step 6).
    if original_len > 500 && output.chars().count() < original_len / 10 {
        let truncated = head_truncate_at_word_boundary(content, budget_tokens);
        return DistillOutcome {
            content: truncated,
            budget_fallback: true,
            warning: Some(
                "budget distillation produced under 10% of the original content; fell back to head truncation"
                    .to_string(),
            ),
        };
    }

    DistillOutcome {
        content: output,
        budget_fallback: false,
        warning: None,
    }
}

/// Derive the BM25 query used when no `question` was supplied: the
/// document's title plus its first heading (spec.md §4.6 step 2).
pub fn derive_query(title: Option<&str>, content: &str) -> String {
    let first_heading = content
        .lines()
        .find(|l| l.trim_start().starts_with('#'))
        .map(|l| l.trim_start_matches('#').trim().to_string());
    match (title, first_heading) {
        (Some(t), Some(h)) if t != h => format!("{t} {h}"),
        (Some(t), _) => t.to_string(),
        (None, Some(h)) => h,
        (None, None) => String::new(),
    }
}

pub fn estimate_tokens_pub(s: &str) -> u32 {
    estimate_tokens(s)
}

/// Shared passage splitter, also used by `quick_answer` (§4.2 Stage 6).
pub fn split_passages_pub(content: &str) -> Vec<String> {
    split_passages(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_article() -> String {
        let mut s = String::from("# Long Article Title\n\n");
        for i in 0..50 {
            s.push_str(&format!(
                "Paragraph {i} discusses various unrelated filler topics at moderate length to pad the document out substantially for budget testing purposes.\n\n"
            ));
        }
        s.push_str("Paragraph about the specific keyword quantum entanglement appears here with real signal relevant to the query.\n\n");
        s
    }

    #[test]
    fn keeps_title_and_fits_budget() {
        let article = long_article();
        let outcome = distill(&article, 100, "quantum entanglement");
        assert!(outcome.content.contains("Long Article Title"));
        assert!(estimate_tokens_pub(&outcome.content) <= (100.0 * 1.1) as u32 + 1);
    }

    #[test]
    fn prioritizes_query_relevant_passage() {
        let article = long_article();
        let outcome = distill(&article, 60, "quantum entanglement");
        assert!(outcome.content.contains("quantum entanglement"));
    }

    #[test]
    fn idempotent_on_already_fitting_content() {
        let article = long_article();
        let first = distill(&article, 80, "quantum entanglement");
        let second = distill(&first.content, 80, "quantum entanglement");
        assert_eq!(first.content, second.content);
    }

    #[test]
    fn head_truncate_breaks_at_word_boundary() {
        let text = "one two three four five six seven eight nine ten";
        let truncated = head_truncate_at_word_boundary(text, 3);
        assert!(!truncated.ends_with("thre"));
        assert!(text.starts_with(&truncated));
    }
}
