//! Synthesized tarball caching with TTL support
//!
//! Entries expire a fixed time after they were written and the number of
//! entries is bounded (least recently used entries go first). Concurrent
//! misses on the same key share a single build, which runs on its own
//! task and completes even if every waiter is dropped.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use relay_core::error::RelayError;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::tarball::Tarball;
use crate::CacheResult;

/// Namespace tag prefixed to every key
const KEY_NAMESPACE: &str = "tarball";

/// Default lifetime of a cached tarball
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache key: alias package name and version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub alias: String,
    pub version: String,
}

impl CacheKey {
    pub fn new(alias: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", KEY_NAMESPACE, self.alias, self.version)
    }
}

/// Cache entry with TTL
#[derive(Debug, Clone)]
struct CacheEntry {
    tarball: Tarball,
    /// When the entry was stored
    stored_at: Instant,
    /// Time-to-live duration
    ttl: Duration,
}

impl CacheEntry {
    fn new(tarball: Tarball, ttl: Duration) -> Self {
        Self {
            tarball,
            stored_at: Instant::now(),
            ttl,
        }
    }

    /// Check if cache entry is still fresh
    fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }
}

type BuildResult = Result<Tarball, Arc<RelayError>>;

/// A build other callers can join
struct InFlight {
    id: u64,
    future: Shared<BoxFuture<'static, BuildResult>>,
}

/// Removes a build's in-flight entry once its task ends
struct RetireBuild {
    in_flight: Arc<DashMap<CacheKey, InFlight>>,
    key: CacheKey,
    id: u64,
}

impl Drop for RetireBuild {
    fn drop(&mut self) {
        self.in_flight
            .remove_if(&self.key, |_, running| running.id == self.id);
    }
}

/// Fresh-or-stale tarball storage shared with running builds
struct Store {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl Store {
    fn get(&self, key: &CacheKey) -> Option<Tarball> {
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if entry.is_fresh() => return Some(entry.tarball.clone()),
            Some(_) => {}
            None => return None,
        }

        // Remove stale entry
        entries.pop(key);
        None
    }

    fn put(&self, key: CacheKey, tarball: Tarball) {
        let entry = CacheEntry::new(tarball, self.ttl);
        if let Some((evicted, _)) = self.entries.lock().push(key.clone(), entry) {
            if evicted != key {
                debug!(key = %evicted, "Evicted least recently used tarball");
            }
        }
    }
}

/// In-memory cache of synthesized tarballs
pub struct TarballCache {
    store: Arc<Store>,
    in_flight: Arc<DashMap<CacheKey, InFlight>>,
    next_build_id: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Stored entries, fresh or not yet purged
    pub entries: usize,
    /// Builds currently running
    pub in_flight: usize,
    /// Lookups answered from storage
    pub hits: u64,
    /// Lookups that had to build or join a build
    pub misses: u64,
    /// Builds started
    pub builds: u64,
}

impl TarballCache {
    /// Create a cache holding at most `capacity` tarballs for `ttl` each
    pub fn new(ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            store: Arc::new(Store {
                entries: Mutex::new(LruCache::new(capacity)),
                ttl,
            }),
            in_flight: Arc::new(DashMap::new()),
            next_build_id: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            builds: AtomicU64::new(0),
        }
    }

    /// Lifetime of new entries
    pub fn ttl(&self) -> Duration {
        self.store.ttl
    }

    /// Get a cached tarball if present and fresh
    pub fn get(&self, key: &CacheKey) -> Option<Tarball> {
        self.store.get(key)
    }

    /// Store a tarball, replacing any existing entry
    pub fn put(&self, key: CacheKey, tarball: Tarball) {
        self.store.put(key, tarball);
    }

    /// Return the cached tarball for `key`, building it on a miss
    ///
    /// Callers missing on a key whose build is already running wait for
    /// that build instead of starting another. Builds run on their own
    /// task, so they finish and are stored even when every caller gives
    /// up waiting. Failed builds are handed to every waiter and never
    /// stored.
    pub async fn try_get<F, Fut>(&self, key: CacheKey, build: F) -> CacheResult<Tarball>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<Tarball>> + Send + 'static,
    {
        if let Some(tarball) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Tarball cache hit");
            return Ok(tarball);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let future = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(in_flight) => {
                debug!(key = %key, "Joining in-flight tarball build");
                in_flight.get().future.clone()
            }
            Entry::Vacant(slot) => {
                debug!(key = %key, "Tarball cache miss, building");
                self.builds.fetch_add(1, Ordering::Relaxed);

                let id = self.next_build_id.fetch_add(1, Ordering::Relaxed);
                let future = self.spawn_build(key.clone(), id, build());
                slot.insert(InFlight {
                    id,
                    future: future.clone(),
                });
                future
            }
        };

        future
            .await
            .map_err(|error| Arc::try_unwrap(error).unwrap_or_else(RelayError::Shared))
    }

    /// Run `build` on its own task, which stores a successful result
    /// before retiring its in-flight entry
    fn spawn_build<Fut>(&self, key: CacheKey, id: u64, build: Fut) -> Shared<BoxFuture<'static, BuildResult>>
    where
        Fut: Future<Output = CacheResult<Tarball>> + Send + 'static,
    {
        let store = self.store.clone();
        let in_flight = self.in_flight.clone();
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            // Dropped after the store below, or while unwinding from a panic
            let _retire = RetireBuild {
                in_flight,
                key: task_key.clone(),
                id,
            };

            let result = build.await;
            if let Ok(tarball) = &result {
                store.put(task_key, tarball.clone());
            }
            result.map_err(Arc::new)
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                Err(Arc::new(RelayError::BuildIncomplete {
                    key: key.to_string(),
                    message: e.to_string(),
                }))
            })
        }
        .boxed()
        .shared()
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.store.entries.lock();

        let stale: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            entries.pop(key);
        }
        stale.len()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.store.entries.lock().len(),
            in_flight: self.in_flight.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
        }
    }
}

impl Default for TarballCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, NonZeroUsize::new(1024).unwrap_or(NonZeroUsize::MIN))
    }
}

impl fmt::Debug for TarballCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TarballCache")
            .field("ttl", &self.ttl())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests;
