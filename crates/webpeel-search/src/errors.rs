//! Search-provider errors. A single provider failing is never fatal to the
//! fallback chain (spec.md §4.4: "Never throws on a single-engine failure")
//! — these exist so each provider can report *why* it produced zero results,
//! for logging, without that reason ever crossing the `search_web` boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("provider {provider} not configured")]
    NotConfigured { provider: &'static str },

    #[error("provider {provider} request failed: {message}")]
    RequestFailed { provider: &'static str, message: String },

    #[error("provider {provider} returned an unparseable response: {message}")]
    ParseFailed { provider: &'static str, message: String },

    #[error("provider {provider} returned zero results")]
    NoResults { provider: &'static str },
}
