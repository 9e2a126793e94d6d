//! Multi-engine Search Provider (spec.md §4.4) and Search-as-Proxy Fallback
//! (§4.7): a fallback chain from keyed APIs down through scraped engines,
//! normalized/deduplicated results, and an entry-level-locked search cache
//! (§5, "the only long-lived mutable state in the core").

pub mod cache;
pub mod chain;
pub mod errors;
pub mod normalize;
pub mod provider;
pub mod providers;
pub mod proxy;

pub use cache::SearchCache;
pub use chain::SearchChain;
pub use errors::SearchError;
pub use normalize::{decode_redirect, dedupe, parse_valid_url};
pub use provider::SearchProvider;
pub use proxy::{search_proxy, SearchProxyResult};
