use crate::config::Settings;
use crate::domain::company::RawCompanyData;
use crate::error::PipelineError;
use crate::time::clock::Clock;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

type Outcome = Option<Result<Arc<RawCompanyData>, PipelineError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
struct CacheEntry {
    data: Arc<RawCompanyData>,
    inserted_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
    access_seq: u64,
}

struct Inner {
    entries: DashMap<String, CacheEntry>,
    inflight: DashMap<String, watch::Receiver<Outcome>>,
    ttl: chrono::Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    access_seq: AtomicU64,
}

/// Volatile company-data cache with lazy TTL expiry, LRU eviction, and at most one in-flight
/// extraction per key.
#[derive(Clone)]
pub struct CompanyCache {
    inner: Arc<Inner>,
}

impl CompanyCache {
    pub fn new(ttl: Duration, max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                inflight: DashMap::new(),
                ttl: chrono::Duration::from_std(ttl)
                    .unwrap_or_else(|_| chrono::Duration::days(36_500)),
                max_entries: max_entries.max(1),
                clock,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                access_seq: AtomicU64::new(0),
            }),
        }
    }

    pub fn from_settings(settings: &Settings, clock: Arc<dyn Clock>) -> Self {
        Self::new(settings.cache_ttl, settings.max_cache_size, clock)
    }

    pub fn get(&self, key: &str) -> Option<Arc<RawCompanyData>> {
        let found = self.lookup(key);
        let counter = if found.is_some() {
            &self.inner.hits
        } else {
            &self.inner.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn put(&self, key: &str, value: RawCompanyData) {
        self.insert(key, Arc::new(value));
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.inner.entries.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.inner.entries.clear();
        tracing::info!("company cache cleared");
    }

    /// Returns the cached entry, or runs `fetch` to produce it.
    ///
    /// Concurrent callers for the same uncached key share one fetch. The fetch runs on its own
    /// task, so it still populates the cache if every caller stops waiting. Errors are handed to
    /// the callers waiting at the time and are not cached.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        fetch: F,
    ) -> Result<Arc<RawCompanyData>, PipelineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RawCompanyData, PipelineError>> + Send + 'static,
    {
        if let Some(hit) = self.get(key) {
            tracing::debug!(%key, "cache hit");
            return Ok(hit);
        }

        let (mut rx, leader) = match self.inner.inflight.entry(key.to_string()) {
            Entry::Occupied(waiting) => {
                tracing::debug!(%key, "joining in-flight extraction");
                (waiting.get().clone(), None)
            }
            Entry::Vacant(slot) => {
                // A leader may have finished between the miss above and taking this slot.
                if let Some(data) = self.lookup(key) {
                    return Ok(data);
                }
                let (tx, rx) = watch::channel(None);
                slot.insert(rx.clone());
                (rx, Some(tx))
            }
        };

        if let Some(tx) = leader {
            self.spawn_fetch(key.to_string(), fetch(), tx);
        }

        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| {
            Err(PipelineError::UpstreamUnavailable {
                company: key.to_string(),
                failed_sections: Vec::new(),
                detail: "extraction task ended without a result".to_string(),
            })
        })
    }

    fn spawn_fetch<Fut>(&self, key: String, fut: Fut, tx: watch::Sender<Outcome>)
    where
        Fut: Future<Output = Result<RawCompanyData, PipelineError>> + Send + 'static,
    {
        let guard = InflightGuard {
            cache: self.clone(),
            key,
        };
        tokio::spawn(async move {
            let outcome = fut.await.map(Arc::new);
            match &outcome {
                Ok(data) => guard.cache.insert(&guard.key, data.clone()),
                Err(err) => tracing::debug!(key = %guard.key, error = %err, "extraction failed; nothing cached"),
            }
            // Unmark before publishing so a caller woken by the result never rejoins this fetch.
            drop(guard);
            tx.send_replace(Some(outcome));
        });
    }

    fn lookup(&self, key: &str) -> Option<Arc<RawCompanyData>> {
        let now = self.inner.clock.now();
        {
            let mut entry = self.inner.entries.get_mut(key)?;
            if !self.is_expired(&entry, now) {
                entry.last_accessed = now;
                entry.access_seq = self.next_seq();
                return Some(entry.data.clone());
            }
        }
        self.inner
            .entries
            .remove_if(key, |_, e| self.is_expired(e, now));
        tracing::debug!(%key, "cache entry expired");
        None
    }

    fn insert(&self, key: &str, data: Arc<RawCompanyData>) {
        let now = self.inner.clock.now();
        self.inner.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                inserted_at: now,
                last_accessed: now,
                access_seq: self.next_seq(),
            },
        );
        self.evict(now);
    }

    fn evict(&self, now: DateTime<Utc>) {
        if self.inner.entries.len() <= self.inner.max_entries {
            return;
        }
        let purged = self.purge_expired(now);
        if purged > 0 {
            tracing::debug!(purged, "dropped expired entries before eviction");
        }

        while self.inner.entries.len() > self.inner.max_entries {
            let victim = self
                .inner
                .entries
                .iter()
                .min_by_key(|e| (e.last_accessed, e.access_seq))
                .map(|e| e.key().clone());
            let Some(victim) = victim else { break };
            self.inner.entries.remove(&victim);
            tracing::debug!(key = %victim, "evicted least recently used entry");
        }
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.inner.entries.len();
        self.inner.entries.retain(|_, e| !self.is_expired(e, now));
        before.saturating_sub(self.inner.entries.len())
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.inserted_at > self.inner.ttl
    }

    fn next_seq(&self) -> u64 {
        self.inner.access_seq.fetch_add(1, Ordering::Relaxed)
    }
}

struct InflightGuard {
    cache: CompanyCache,
    key: String,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.cache.inner.inflight.remove(&self.key);
    }
}
