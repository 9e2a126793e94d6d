//! Quick-answer extraction (spec.md §4.2 Stage 6 step 4, glossary
//! "Quick answer"): BM25 passage ranking against the user's `question`,
//! with a retry over the raw HTML text when the processed content looks
//! too thin to have contained the answer.

use webpeel_types::QuickAnswer;

use crate::bm25::Bm25Corpus;
use crate::distill::split_passages_pub;

const CONFIDENCE_RETRY_THRESHOLD: f64 = 0.91;

/// Normalize a raw BM25 score into a 0..1 confidence. BM25 scores are
/// unbounded, so this saturates rather than clips.
fn score_to_confidence(score: f64) -> f64 {
    1.0 - (-score / 4.0).exp()
}

fn best_passage(passages: &[String], question: &str) -> Option<(usize, f64)> {
    if passages.is_empty() {
        return None;
    }
    let corpus = Bm25Corpus::new(passages);
    let scores = corpus.score_all(question);
    let (idx, &score) = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    Some((idx, score_to_confidence(score)))
}

/// Extract the best-matching passage for `question` out of the processed
/// `content`. If the initial confidence is below the retry threshold and
/// `raw_html_text` is at least twice as long as `content`, the search is
/// repeated against the unprocessed text and the higher-confidence answer
/// wins (spec.md §4.2 Stage 6 step 4).
pub fn extract_quick_answer(
    content: &str,
    question: &str,
    raw_html_text: Option<&str>,
) -> Option<QuickAnswer> {
    let passages = split_passages_pub(content);
    let primary = best_passage(&passages, question);

    let should_retry = match &primary {
        None => raw_html_text.is_some(),
        Some((_, confidence)) => {
            *confidence < CONFIDENCE_RETRY_THRESHOLD
                && raw_html_text
                    .map(|raw| raw.chars().count() > content.chars().count() * 2)
                    .unwrap_or(false)
        }
    };

    let fallback = if should_retry {
        raw_html_text.and_then(|raw| {
            let raw_passages = split_passages_pub(raw);
            best_passage(&raw_passages, question)
                .map(|(idx, confidence)| (raw_passages, idx, confidence))
        })
    } else {
        None
    };

    match (primary, fallback) {
        (Some((idx, conf)), Some((raw_passages, raw_idx, raw_conf))) if raw_conf > conf => {
            Some(QuickAnswer {
                answer: raw_passages[raw_idx].clone(),
                confidence: raw_conf,
                source_passage: raw_passages[raw_idx].clone(),
            })
        }
        (Some((idx, conf)), _) => Some(QuickAnswer {
            answer: passages[idx].clone(),
            confidence: conf,
            source_passage: passages[idx].clone(),
        }),
        (None, Some((raw_passages, raw_idx, raw_conf))) => Some(QuickAnswer {
            answer: raw_passages[raw_idx].clone(),
            confidence: raw_conf,
            source_passage: raw_passages[raw_idx].clone(),
        }),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_relevant_passage() {
        let content = "# Doc\n\nSome intro text.\n\nThe capital of France is Paris.\n\nMore filler.";
        let answer = extract_quick_answer(content, "What is the capital of France?", None);
        let answer = answer.expect("expected an answer");
        assert!(answer.answer.contains("Paris"));
    }

    #[test]
    fn returns_none_on_empty_content() {
        assert!(extract_quick_answer("", "anything?", None).is_none());
    }

    #[test]
    fn retries_against_raw_html_when_thin_and_low_confidence() {
        let content = "# Doc\n\nUnrelated filler paragraph only.";
        let raw = "Completely unrelated header.\n\nSome noise here blah blah blah blah blah blah.\n\nThe capital of France is Paris, a fact buried deep in the raw page.\n\nmore noise padding padding padding padding padding padding padding padding.";
        let answer = extract_quick_answer(content, "What is the capital of France?", Some(raw));
        let answer = answer.expect("expected an answer");
        assert_eq!(answer.source_passage, answer.answer);
        assert!(answer.answer.contains("Paris"));
    }
}
