//! Read-through cache for note listing payloads.
//!
//! `lookup` consults the store before the backing query; on a miss the
//! caller runs the query and hands the payload back via `store`. Any
//! mutation to an owner's notes goes through `invalidate_owner`, which
//! purges every cached variant in that owner's key namespace.
//!
//! Nothing in this module ever fails a request: store errors, corrupt
//! payloads and an unavailable backend all degrade to a miss or a no-op.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use super::key::{derive_key, owner_prefix, ListQuery};
use super::store::{CacheError, CacheStore};
use crate::database::NoteListPage;

/// Counters for cache effectiveness, readable at any time.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn stores(&self) -> u64 {
        self.stores.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }
}

/// Read-through cache for per-owner note listings.
///
/// Generic over the store so the backend can be swapped out in tests.
/// Concurrent lookups and stores for the same key are last-write-wins;
/// staleness after a lost race is bounded by the TTL.
pub struct ListCache<S> {
    store: Arc<S>,
    ttl: Duration,
    stats: CacheStats,
}

impl<S: CacheStore> ListCache<S> {
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            stats: CacheStats::default(),
        }
    }

    /// Look up a cached listing for (owner, query).
    ///
    /// Returns `None` on a miss, on any store error, and on a payload that
    /// no longer deserializes; a hit comes back with the `cached` marker
    /// set.
    pub async fn lookup(&self, owner_id: &str, query: &ListQuery) -> Option<NoteListPage> {
        let key = derive_key(owner_id, query);

        match self.try_lookup(&key).await {
            Ok(Some(mut page)) => {
                debug!("Cache hit for owner {owner_id}");
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                page.cached = true;
                return Some(page);
            }
            Ok(None) => {
                debug!("Cache miss for owner {owner_id}");
            }
            Err(CacheError::Unavailable) => {
                debug!("Cache unavailable, falling through to the backing store");
            }
            Err(err @ CacheError::Decode(_)) => {
                // Schema drift or corruption: treat as a miss, let the
                // fresh payload overwrite the entry.
                warn!("Discarding undecodable cache entry for owner {owner_id}: {err}");
            }
            Err(err) => {
                warn!("Cache read failed for owner {owner_id}: {err}");
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn try_lookup(&self, key: &str) -> Result<Option<NoteListPage>, CacheError> {
        match self.store.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Store a freshly computed listing under (owner, query).
    ///
    /// Fire-and-forget: the caller's response is already built from the
    /// backing store, so failures are logged and ignored.
    pub async fn store(&self, owner_id: &str, query: &ListQuery, page: &NoteListPage) {
        let key = derive_key(owner_id, query);

        let bytes = match serde_json::to_vec(page) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Failed to serialize listing for owner {owner_id}: {err}");
                return;
            }
        };

        match self.store.set_with_ttl(&key, &bytes, self.ttl).await {
            Ok(()) => {
                debug!(
                    "Cached listing for owner {owner_id} (ttl {}s)",
                    self.ttl.as_secs()
                );
                self.stats.stores.fetch_add(1, Ordering::Relaxed);
            }
            Err(CacheError::Unavailable) => {
                debug!("Cache unavailable, listing for owner {owner_id} not stored");
            }
            Err(err) => {
                warn!("Failed to cache listing for owner {owner_id}: {err}");
            }
        }
    }

    /// Purge every cached listing variant for an owner.
    ///
    /// Called after any mutation to the owner's notes. Invalidating an
    /// owner with nothing cached is a successful no-op; failures are
    /// logged and never surfaced, leaving at worst a stale entry that the
    /// TTL bounds.
    pub async fn invalidate_owner(&self, owner_id: &str) {
        let prefix = owner_prefix(owner_id);

        let keys = match self.store.scan_by_prefix(&prefix).await {
            Ok(keys) => keys,
            Err(CacheError::Unavailable) => {
                debug!("Cache unavailable, nothing to invalidate for owner {owner_id}");
                return;
            }
            Err(err) => {
                warn!("Cache scan failed while invalidating owner {owner_id}: {err}");
                return;
            }
        };

        if keys.is_empty() {
            debug!("No cached listings for owner {owner_id}");
            return;
        }

        match self.store.delete_many(&keys).await {
            Ok(deleted) => {
                debug!("Invalidated {deleted} cached listing(s) for owner {owner_id}");
                self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                warn!("Cache delete failed while invalidating owner {owner_id}: {err}");
            }
        }
    }

    /// Cache effectiveness counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// The configured entry TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
