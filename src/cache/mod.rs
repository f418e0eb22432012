//! Cache module - Redis-backed caching for note listings.
//!
//! ## Architecture
//!
//! The cache is layered, leaves first:
//! - `key` - Deterministic cache-key derivation from (owner, query)
//! - `store` - `CacheStore` trait and the Redis adapter (`RedisStore`)
//! - `list` - Read-through cache for listing payloads, plus owner-scoped
//!   invalidation
//!
//! Every layer degrades instead of failing: when the backend is down or an
//! operation errors, callers see a cache miss (or a no-op) and the backing
//! store stays authoritative.

mod config;
mod key;
mod list;
mod store;

pub use config::CacheSettings;
pub use key::{derive_key, owner_prefix, ListQuery, SortField, SortOrder};
pub use list::{CacheStats, ListCache};
pub use store::{CacheError, CacheStatus, CacheStore, RedisStore};

#[cfg(test)]
pub(crate) use store::MemoryStore;
