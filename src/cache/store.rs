//! Cache store adapter - thin capability surface over Redis.
//!
//! The adapter never lets a backend problem escape: callers get
//! `Err(CacheError)` and decide how to degrade. When the backend is
//! disabled or not yet connected, every operation short-circuits without a
//! round-trip.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use tracing::{debug, info, warn};

use super::CacheSettings;

/// Base delay for the initial connection backoff.
const BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Errors internal to the cache layer.
///
/// These never cross the service boundary; the read-through layer maps
/// every variant to a miss or a no-op.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable")]
    Unavailable,

    #[error("redis error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("cache payload could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Connection state of the cache backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Caching switched off by configuration.
    Disabled,
    /// Not connected (initial attempts pending or exhausted).
    Connecting,
    /// Connected and serving operations.
    Ready,
}

/// Capability surface over the key-value backend.
///
/// Injected into the read-through cache so tests can substitute an
/// in-memory implementation.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Last known availability. Operations on an unavailable store return
    /// `Err(CacheError::Unavailable)` without touching the network.
    fn is_available(&self) -> bool;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration)
        -> Result<(), CacheError>;

    /// All keys starting with `prefix`.
    async fn scan_by_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError>;

    /// Delete the given keys, returning how many existed.
    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError>;
}

/// Redis-backed cache store.
///
/// The connection handle and status flag are the only shared mutable
/// state; both are written by the connection task and read by request
/// handlers. Lock guards are never held across await points.
pub struct RedisStore {
    status: RwLock<CacheStatus>,
    conn: RwLock<Option<ConnectionManager>>,
}

impl RedisStore {
    /// Create a store and start connecting in the background.
    ///
    /// Returns immediately with the store in `Connecting` (or `Disabled`)
    /// state; the application proceeds without caching until the backend
    /// is ready. The initial connection loop retries with exponential
    /// backoff, bounded by attempt count and total elapsed time. Once
    /// those bounds are exhausted the store stays unavailable; established
    /// connections are re-established by the Redis client itself.
    pub fn connect(settings: &CacheSettings) -> Arc<Self> {
        if !settings.enabled {
            info!("Cache disabled by configuration, running without caching");
            return Arc::new(Self {
                status: RwLock::new(CacheStatus::Disabled),
                conn: RwLock::new(None),
            });
        }

        let store = Arc::new(Self {
            status: RwLock::new(CacheStatus::Connecting),
            conn: RwLock::new(None),
        });

        tokio::spawn(Self::connect_loop(Arc::clone(&store), settings.clone()));

        store
    }

    async fn connect_loop(store: Arc<Self>, settings: CacheSettings) {
        let client = match redis::Client::open(settings.url.as_str()) {
            Ok(client) => client,
            Err(err) => {
                warn!("Invalid Redis URL, running without caching: {err}");
                return;
            }
        };

        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(settings.response_timeout)
            .set_response_timeout(settings.response_timeout);

        let started = tokio::time::Instant::now();
        let mut backoff = BACKOFF_BASE;

        for attempt in 1..=settings.max_connect_attempts {
            match client.get_connection_manager_with_config(config.clone()).await {
                Ok(manager) => {
                    *store.conn.write() = Some(manager);
                    *store.status.write() = CacheStatus::Ready;
                    info!("Cache backend connected (attempt {attempt})");
                    return;
                }
                Err(err) => {
                    debug!("Cache connection attempt {attempt} failed: {err}");
                }
            }

            if started.elapsed() + backoff > settings.connect_deadline {
                warn!("Cache connection deadline exhausted, running without caching");
                return;
            }

            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(settings.backoff_ceiling);
        }

        warn!(
            "Cache backend unreachable after {} attempts, running without caching",
            settings.max_connect_attempts
        );
    }

    /// Current connection status.
    pub fn status(&self) -> CacheStatus {
        *self.status.read()
    }

    /// Clone the connection handle out of the lock, if ready.
    fn connection(&self) -> Result<ConnectionManager, CacheError> {
        if self.status() != CacheStatus::Ready {
            return Err(CacheError::Unavailable);
        }
        self.conn.read().clone().ok_or(CacheError::Unavailable)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn is_available(&self) -> bool {
        self.status() == CacheStatus::Ready
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection()?;

        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut conn = self.connection()?;

        // SETEX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        redis::cmd("SETEX")
            .arg(key)
            .arg(seconds)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn scan_by_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection()?;

        // Cursor-based SCAN rather than KEYS, which blocks the server.
        let pattern = format!("{prefix}*");
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(keys)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection()?;

        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(key);
        }
        let deleted: u64 = cmd.query_async(&mut conn).await?;
        Ok(deleted)
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("status", &self.status())
            .finish()
    }
}

/// In-memory `CacheStore` used by the crate's tests.
///
/// Honors TTLs against the tokio clock so expiry is testable with paused
/// time, and can be forced unavailable to exercise degradation paths.
#[cfg(test)]
pub(crate) struct MemoryStore {
    entries: parking_lot::Mutex<std::collections::HashMap<String, (Vec<u8>, tokio::time::Instant)>>,
    available: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MemoryStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: parking_lot::Mutex::new(std::collections::HashMap::new()),
            available: std::sync::atomic::AtomicBool::new(true),
        })
    }

    pub(crate) fn set_available(&self, available: bool) {
        self.available
            .store(available, std::sync::atomic::Ordering::SeqCst);
    }

    pub(crate) fn len(&self) -> usize {
        let now = tokio::time::Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|(_, expires)| *expires > now)
            .count()
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.available.load(std::sync::atomic::Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable)
        }
    }
}

#[cfg(test)]
#[async_trait]
impl CacheStore for MemoryStore {
    fn is_available(&self) -> bool {
        self.available.load(std::sync::atomic::Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.check_available()?;

        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((value, expires)) if *expires > tokio::time::Instant::now() => {
                Ok(Some(value.clone()))
            }
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.check_available()?;

        self.entries.lock().insert(
            key.to_string(),
            (value.to_vec(), tokio::time::Instant::now() + ttl),
        );
        Ok(())
    }

    async fn scan_by_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        self.check_available()?;

        let now = tokio::time::Instant::now();
        Ok(self
            .entries
            .lock()
            .iter()
            .filter(|(key, (_, expires))| key.starts_with(prefix) && *expires > now)
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError> {
        self.check_available()?;

        let mut entries = self.entries.lock();
        let mut deleted = 0;
        for key in keys {
            if entries.remove(key).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
