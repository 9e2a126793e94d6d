//! Shared BM25 scorer used by both budget distillation (§4.6) and the
//! quick-answer extractor (§4.2 Stage 6 step 4, glossary "Quick answer").
//! `k1=1.5, b=0.75` per spec.md §4.6.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

pub const K1: f64 = 1.5;
pub const B: f64 = 0.75;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").unwrap());

pub fn tokenize(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// A BM25 index over a fixed corpus of passages, built once and queried
/// many times (once per query term set).
pub struct Bm25Corpus {
    docs: Vec<Vec<String>>,
    doc_freq: HashMap<String, usize>,
    avg_len: f64,
}

impl Bm25Corpus {
    pub fn new(passages: &[String]) -> Self {
        let docs: Vec<Vec<String>> = passages.iter().map(|p| tokenize(p)).collect();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in &docs {
            let unique: std::collections::HashSet<&String> = doc.iter().collect();
            for term in unique {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }
        let total_len: usize = docs.iter().map(|d| d.len()).sum();
        let avg_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f64 / docs.len() as f64
        };
        Self {
            docs,
            doc_freq,
            avg_len,
        }
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = *self.doc_freq.get(term).unwrap_or(&0) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Score every passage against `query`, returning scores in original
    /// passage order.
    pub fn score_all(&self, query: &str) -> Vec<f64> {
        let query_terms = tokenize(query);
        (0..self.docs.len()).map(|i| self.score_one(i, &query_terms)).collect()
    }

    fn score_one(&self, doc_index: usize, query_terms: &[String]) -> f64 {
        let doc = &self.docs[doc_index];
        let doc_len = doc.len() as f64;
        if doc_len == 0.0 || self.avg_len == 0.0 {
            return 0.0;
        }
        let mut term_freq: HashMap<&str, usize> = HashMap::new();
        for t in doc {
            *term_freq.entry(t.as_str()).or_insert(0) += 1;
        }

        let mut score = 0.0;
        for term in query_terms {
            let Some(&tf) = term_freq.get(term.as_str()) else {
                continue;
            };
            let tf = tf as f64;
            let idf = self.idf(term);
            let numerator = tf * (K1 + 1.0);
            let denominator = tf + K1 * (1.0 - B + B * doc_len / self.avg_len);
            score += idf * numerator / denominator;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_exact_term_match_higher() {
        let passages = vec![
            "the quick brown fox jumps over the lazy dog".to_string(),
            "completely unrelated sentence about something else entirely".to_string(),
        ];
        let corpus = Bm25Corpus::new(&passages);
        let scores = corpus.score_all("quick fox");
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn empty_query_scores_zero() {
        let passages = vec!["some passage text".to_string()];
        let corpus = Bm25Corpus::new(&passages);
        let scores = corpus.score_all("");
        assert_eq!(scores, vec![0.0]);
    }
}
