//! Trait seams for the registry pattern named in spec.md §9 ("Dynamic
//! module loading for fallbacks" -> replace with a registry of first-class
//! components registered at construction).

use async_trait::async_trait;

/// A per-host adapter that reaches a site's own public API instead of
/// parsing rendered HTML (§4.2 Stage 3, glossary: "Domain extractor").
#[async_trait]
pub trait DomainExtractor: Send + Sync {
    /// Human-readable name, used in `domain_data` provenance and logs.
    fn name(&self) -> &str;

    /// Whether this extractor claims the given URL's host.
    fn applies(&self, url: &url::Url) -> bool;

    /// Fetch structured content. Implementations should return an error
    /// rather than empty content; the caller treats "< 50 chars" as a miss
    /// per spec.md Stage 3.
    async fn fetch(&self, url: &url::Url) -> anyhow::Result<DomainContent>;
}

/// Structured content returned by a `DomainExtractor`.
#[derive(Debug, Clone)]
pub struct DomainContent {
    pub title: Option<String>,
    pub content: String,
    pub metadata: std::collections::HashMap<String, String>,
    pub raw: serde_json::Value,
}

/// A downstream-optional enrichment step (readability, branding, json-ld
/// rescue, summarize, change-tracking). Failures here are logged and
/// recorded as warnings, never surfaced (§7 `downstream-optional`).
#[async_trait]
pub trait Fallback: Send + Sync {
    fn name(&self) -> &str;
}

/// Read/write-through store for change-tracking baselines (§6 Persisted
/// state). Opaque to the core; cross-request writes may race and the store
/// must accept last-writer-wins (§5).
#[async_trait]
pub trait ChangeTrackingStore: Send + Sync {
    async fn get(&self, url_key: &str) -> Option<StoredBaseline>;
    async fn put(&self, url_key: &str, baseline: StoredBaseline);
}

#[derive(Debug, Clone)]
pub struct StoredBaseline {
    pub fingerprint: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub last_diff: Option<String>,
}
