use super::types::IndexDocument;

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives cache keys that must be dropped after a write.
pub trait CacheInvalidator: Send + Sync + 'static {
    fn evict(&self, key: &str);
}

/// `doc:{documentId}`
pub fn cache_key(document_id: &str) -> String {
    format!("doc:{}", document_id)
}

/// Local read-through cache for document lookups. Misses are never cached.
#[derive(Default)]
pub struct DocumentCache {
    entries: DashMap<String, IndexDocument>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<IndexDocument> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: String, document: IndexDocument) {
        self.entries.insert(key, document);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl CacheInvalidator for DocumentCache {
    fn evict(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            tracing::debug!(key, "cache entry evicted");
        }
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }
}
