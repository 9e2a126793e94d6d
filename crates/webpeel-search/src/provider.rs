//! `SearchProvider` trait seam: each engine in the fallback chain (spec.md
//! §4.4) is a first-class component rather than a dynamically-loaded module
//! (§9's registry-pattern redesign note).

use async_trait::async_trait;
use webpeel_types::SearchResult;

use crate::errors::SearchError;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Name used in logs and in the "engine-declaration order" tie-break
    /// during result aggregation (spec.md §5 Ordering guarantees).
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchResult>, SearchError>;
}
