//! Scriptorium - Read-through list cache for an owner-scoped notes store.
//!
//! Caches paginated, searchable per-owner note listings in Redis, in front
//! of a MongoDB-backed notes collection. Any mutation to an owner's notes
//! purges that owner's cached listings; the cache is an optimization and
//! never a hard dependency.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `cache` - Cache key derivation, Redis store adapter, read-through list cache
//! - `database` - MongoDB integration (models, note repository)
//! - `service` - Note operations with caching and invalidation wired in

pub mod cache;
pub mod config;
pub mod database;
pub mod service;

pub use cache::{CacheSettings, CacheStats, CacheStore, ListCache, ListQuery, RedisStore};
pub use config::Config;
pub use database::{Database, Note, NoteListPage, NoteRepository, NoteStore};
pub use service::NoteService;
