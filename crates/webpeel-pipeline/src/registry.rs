//! First-class component registries, constructed once at `Pipeline::new`
//! time rather than looked up by string/dynamic dispatch (spec.md §9
//! "Dynamic module loading for fallbacks").

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use webpeel_types::registry::StoredBaseline;
use webpeel_types::{ChangeTrackingStore, DomainExtractor};

/// In-memory change-tracking baseline store, keyed by normalized URL.
/// Last-writer-wins across concurrent requests (spec.md §5), via `DashMap`'s
/// per-entry locking. Swappable by the embedding application for a
/// persistent key-value store — the core only depends on the trait.
#[derive(Default)]
pub struct InMemoryChangeTrackingStore {
    baselines: DashMap<String, StoredBaseline>,
}

#[async_trait]
impl ChangeTrackingStore for InMemoryChangeTrackingStore {
    async fn get(&self, url_key: &str) -> Option<StoredBaseline> {
        self.baselines.get(url_key).map(|e| e.clone())
    }

    async fn put(&self, url_key: &str, baseline: StoredBaseline) {
        self.baselines.insert(url_key.to_string(), baseline);
    }
}

/// Host-ordered registry of domain extractors, checked in registration
/// order by `applies`.
pub struct DomainExtractorRegistry {
    extractors: Vec<Arc<dyn DomainExtractor>>,
}

impl DomainExtractorRegistry {
    pub fn new(extractors: Vec<Arc<dyn DomainExtractor>>) -> Self {
        Self { extractors }
    }

    pub fn find(&self, url: &url::Url) -> Option<&Arc<dyn DomainExtractor>> {
        self.extractors.iter().find(|e| e.applies(url))
    }
}
