//! Typed fetch errors (spec.md §4.1: distinguish Blocked from BadStatus from
//! Timeout from Network).

use thiserror::Error;
use webpeel_types::ErrorKind;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("blocked by bot protection at {url}: {reason}")]
    Blocked { url: String, reason: String },

    #[error("bad status {status} fetching {url}")]
    BadStatus { url: String, status: u16 },

    #[error("timeout fetching {url} after {elapsed_ms}ms")]
    Timeout { url: String, elapsed_ms: u64 },

    #[error("network error fetching {url}: {message}")]
    Network {
        url: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("browser engine unavailable: {message}")]
    EngineUnavailable { message: String },

    #[error("action {index} ({action_type}) failed: {message}")]
    ActionFailed {
        index: usize,
        action_type: String,
        message: String,
    },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Blocked { .. } => ErrorKind::Blocked,
            FetchError::BadStatus { .. } => ErrorKind::BadStatus,
            FetchError::Timeout { .. } => ErrorKind::Timeout,
            FetchError::Network { .. } => ErrorKind::Network,
            FetchError::EngineUnavailable { .. } => ErrorKind::Fatal,
            FetchError::ActionFailed { .. } => ErrorKind::Fatal,
        }
    }
}
