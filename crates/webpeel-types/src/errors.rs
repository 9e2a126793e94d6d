//! Error taxonomy for the extraction core.
//!
//! The pipeline never surfaces a recoverable condition as an exception — see
//! the propagation policy in `webpeel-pipeline`. This enum exists so that the
//! small set of conditions that DO need to cross the `peel` boundary (§7 of
//! the spec: invalid-input, network-at-top-tier, timeout, fatal) carry a
//! stable `kind` a caller can match on, plus enough context to act on it.

use thiserror::Error;

/// The eight error kinds named in the spec, used both internally (to decide
/// whether a condition is a warning or a surfaced error) and on the
/// `PeelError` that does escape `peel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidInput,
    Network,
    Timeout,
    Blocked,
    BadStatus,
    ParseFailed,
    DownstreamOptional,
    Fatal,
}

impl ErrorKind {
    /// Whether a condition of this kind is allowed to propagate out of
    /// `peel` as an error rather than being downgraded to a warning.
    pub fn is_surfaced(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidInput | ErrorKind::Network | ErrorKind::Timeout | ErrorKind::Fatal
        )
    }
}

/// Top-level error type returned by `peel` for the conditions that are
/// allowed to surface. Every other recoverable condition is folded into
/// `PipelineContext.warnings` instead of constructing one of these.
#[derive(Error, Debug)]
pub enum PeelError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("network error fetching {url}: {message}")]
    Network {
        url: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("timeout fetching {url} after {elapsed_ms}ms")]
    Timeout { url: String, elapsed_ms: u64 },

    #[error("blocked by bot protection at {url}: {reason}")]
    Blocked { url: String, reason: String },

    #[error("bad status {status} fetching {url}")]
    BadStatus { url: String, status: u16 },

    #[error("internal invariant violated: {message}")]
    Fatal { message: String },
}

impl PeelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PeelError::InvalidInput { .. } => ErrorKind::InvalidInput,
            PeelError::Network { .. } => ErrorKind::Network,
            PeelError::Timeout { .. } => ErrorKind::Timeout,
            PeelError::Blocked { .. } => ErrorKind::Blocked,
            PeelError::BadStatus { .. } => ErrorKind::BadStatus,
            PeelError::Fatal { .. } => ErrorKind::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surfaced_kinds_match_spec() {
        assert!(ErrorKind::InvalidInput.is_surfaced());
        assert!(ErrorKind::Network.is_surfaced());
        assert!(ErrorKind::Timeout.is_surfaced());
        assert!(ErrorKind::Fatal.is_surfaced());
        assert!(!ErrorKind::Blocked.is_surfaced());
        assert!(!ErrorKind::BadStatus.is_surfaced());
        assert!(!ErrorKind::ParseFailed.is_surfaced());
        assert!(!ErrorKind::DownstreamOptional.is_surfaced());
    }
}
