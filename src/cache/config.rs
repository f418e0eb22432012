//! Cache configuration.

use std::env;
use std::time::Duration;

/// Configuration for the Redis cache backend.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Redis connection URL.
    pub url: String,

    /// Whether caching is enabled at all.
    /// When disabled, the store behaves as permanently unavailable and
    /// every operation is a no-op.
    pub enabled: bool,

    /// Time-to-live for cached listing payloads.
    pub ttl: Duration,

    /// Maximum number of initial connection attempts.
    pub max_connect_attempts: u32,

    /// Ceiling on the per-attempt backoff delay.
    pub backoff_ceiling: Duration,

    /// Total time budget for the initial connection loop.
    pub connect_deadline: Duration,

    /// Per-operation response timeout, so a hung backend cannot stall
    /// request latency.
    pub response_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            enabled: true,
            ttl: Duration::from_secs(900), // 15 minutes
            max_connect_attempts: 10,
            backoff_ceiling: Duration::from_secs(3),
            connect_deadline: Duration::from_secs(3600),
            response_timeout: Duration::from_secs(1),
        }
    }
}

impl CacheSettings {
    /// Load cache settings from environment variables.
    ///
    /// Every variable is optional; missing or unparsable values fall back
    /// to the defaults above.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            url: env::var("REDIS_URL").unwrap_or(defaults.url),
            enabled: env::var("REDIS_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            ttl: env_secs("CACHE_TTL_SECS").unwrap_or(defaults.ttl),
            max_connect_attempts: env_parse("REDIS_MAX_CONNECT_ATTEMPTS")
                .unwrap_or(defaults.max_connect_attempts),
            backoff_ceiling: env_millis("REDIS_BACKOFF_CEILING_MS")
                .unwrap_or(defaults.backoff_ceiling),
            connect_deadline: env_secs("REDIS_CONNECT_DEADLINE_SECS")
                .unwrap_or(defaults.connect_deadline),
            response_timeout: env_millis("REDIS_RESPONSE_TIMEOUT_MS")
                .unwrap_or(defaults.response_timeout),
        }
    }

    /// Settings with caching switched off entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set the Redis URL (builder pattern).
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the entry TTL.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the initial connection retry bounds.
    #[must_use]
    pub fn connect_bounds(mut self, attempts: u32, ceiling: Duration, deadline: Duration) -> Self {
        self.max_connect_attempts = attempts;
        self.backoff_ceiling = ceiling;
        self.connect_deadline = deadline;
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_secs(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_secs)
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}
