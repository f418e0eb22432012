//! Configuration module.
//!
//! Loads configuration from environment variables.

use std::env;

use crate::cache::CacheSettings;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    /// Cache backend settings.
    /// The cache is optional: with `REDIS_ENABLED=false` the application
    /// runs with caching switched off entirely.
    pub cache: CacheSettings,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if required environment variables are not set.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            mongodb_uri: env::var("MONGODB_URI").expect("MONGODB_URI must be set"),
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "scriptorium".to_string()),
            cache: CacheSettings::from_env(),
        }
    }
}
