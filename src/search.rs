//! Candidate tool search boundary and its TTL cache.
//!
//! Ranking is delegated to an external vector store; this module only
//! defines the seam and an expiring cache over it. Cached results reduce
//! duplicate upstream searches and are never consulted for attachment state.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::{error::ToolSyncResult, types::ToolDescriptor};

/// Ranked candidate tools for a free-text query.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> ToolSyncResult<Vec<ToolDescriptor>>;
}

#[derive(Clone)]
struct CacheSlot {
    cached_at: Instant,
    results: Vec<ToolDescriptor>,
}

/// Expiring key→value cache over a [`CandidateSource`], keyed by normalized
/// query text and limit. Entries are atomically replaced on expiry; a stale
/// hit is tolerated rather than locked against.
pub struct CachedCandidateSource {
    inner: Arc<dyn CandidateSource>,
    slots: DashMap<String, CacheSlot>,
    ttl: Duration,
}

impl CachedCandidateSource {
    pub fn new(inner: Arc<dyn CandidateSource>, ttl: Duration) -> Self {
        Self {
            inner,
            slots: DashMap::new(),
            ttl,
        }
    }

    fn cache_key(query: &str, limit: usize) -> String {
        format!("{}#{limit}", normalize_query(query))
    }
}

/// Collapse case and whitespace so trivially different phrasings share a slot.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl CandidateSource for CachedCandidateSource {
    async fn search(&self, query: &str, limit: usize) -> ToolSyncResult<Vec<ToolDescriptor>> {
        let key = Self::cache_key(query, limit);

        if let Some(slot) = self.slots.get(&key) {
            if slot.cached_at.elapsed() <= self.ttl {
                debug!(key, "Search cache hit");
                return Ok(slot.results.clone());
            }
        }

        let results = self.inner.search(query, limit).await?;
        self.slots.insert(
            key,
            CacheSlot {
                cached_at: Instant::now(),
                results: results.clone(),
            },
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CandidateSource for CountingSource {
        async fn search(&self, _query: &str, limit: usize) -> ToolSyncResult<Vec<ToolDescriptor>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..limit)
                .map(|i| ToolDescriptor::new(format!("tool-{i}"), format!("tool_{i}")))
                .collect())
        }
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Send   Email "), "send email");
        assert_eq!(normalize_query("send email"), "send email");
    }

    #[tokio::test]
    async fn test_cache_dedupes_equivalent_queries() {
        let inner = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedCandidateSource::new(inner.clone(), Duration::from_secs(60));

        let first = cached.search("Send Email", 3).await.unwrap();
        let second = cached.search("  send   email", 3).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        // A different limit is a different slot.
        cached.search("send email", 5).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_expires_after_ttl() {
        let inner = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedCandidateSource::new(inner.clone(), Duration::from_secs(30));

        cached.search("send email", 3).await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        cached.search("send email", 3).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
