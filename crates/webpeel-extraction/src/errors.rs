//! Error type for document decoding and extraction heuristics, matching the
//! teacher's per-crate `thiserror`-derived error convention.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("malformed {kind} document: {message}")]
    MalformedDocument { kind: String, message: String },

    #[error("unsupported document kind for {url}")]
    UnsupportedKind { url: String },
}
