//! Document decoding, domain extractors, YouTube transcripts, BM25 budget
//! distillation, quick-answer extraction, and auto-extract heuristics
//! (spec.md §4.6, §6 "Document formats", §D/§F of SPEC_FULL.md).

pub mod auto_extract;
pub mod bm25;
pub mod distill;
pub mod document;
pub mod domain;
pub mod errors;
pub mod quick_answer;
pub mod youtube;

pub use distill::{derive_query, distill, head_truncate_at_word_boundary, DistillOutcome};
pub use document::{decode_document, DocumentContent, DocumentKind};
pub use errors::ExtractionError;
pub use quick_answer::extract_quick_answer;
