//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::rate_limit::RateLimitOptions;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// SQLite database file backing the flight store
    pub database_path: String,
    /// Absolute cache TTL in seconds, counted from insertion
    pub cache_absolute_ttl_secs: u64,
    /// Sliding cache TTL in seconds, counted from the last read
    pub cache_sliding_ttl_secs: u64,
    /// Expired-entry sweep interval in seconds
    pub cache_scan_interval: u64,
    /// Requests admitted per rate-limit window
    pub rate_limit_permits: u32,
    /// Rate-limit window length in seconds
    pub rate_limit_window_secs: u64,
    /// Requests allowed to wait for the next window
    pub rate_limit_queue: usize,
    /// Allowed CORS origins; empty means any origin
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `FLIGHTS_DB_PATH` - SQLite database file (default: flights.db)
    /// - `CACHE_ABSOLUTE_TTL` - Absolute TTL in seconds (default: 300)
    /// - `CACHE_SLIDING_TTL` - Sliding TTL in seconds (default: 120)
    /// - `CACHE_SCAN_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `RATE_LIMIT_PERMITS` - Permits per window (default: 12)
    /// - `RATE_LIMIT_WINDOW` - Window length in seconds (default: 12)
    /// - `RATE_LIMIT_QUEUE` - Queue limit (default: 4)
    /// - `CORS_ALLOWED_ORIGINS` - Comma separated origins (default: any)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            database_path: env::var("FLIGHTS_DB_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.database_path),
            cache_absolute_ttl_secs: env_or("CACHE_ABSOLUTE_TTL", defaults.cache_absolute_ttl_secs),
            cache_sliding_ttl_secs: env_or("CACHE_SLIDING_TTL", defaults.cache_sliding_ttl_secs),
            cache_scan_interval: env_or("CACHE_SCAN_INTERVAL", defaults.cache_scan_interval),
            rate_limit_permits: env_or("RATE_LIMIT_PERMITS", defaults.rate_limit_permits),
            rate_limit_window_secs: env_or("RATE_LIMIT_WINDOW", defaults.rate_limit_window_secs),
            rate_limit_queue: env_or("RATE_LIMIT_QUEUE", defaults.rate_limit_queue),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_default(),
        }
    }

    pub fn cache_absolute_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_absolute_ttl_secs)
    }

    pub fn cache_sliding_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_sliding_ttl_secs)
    }

    /// Limiter options built from the `RATE_LIMIT_*` values.
    pub fn rate_limit_options(&self) -> RateLimitOptions {
        RateLimitOptions {
            permit_limit: self.rate_limit_permits,
            window: Duration::from_secs(self.rate_limit_window_secs),
            queue_limit: self.rate_limit_queue,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            database_path: "flights.db".to_string(),
            cache_absolute_ttl_secs: 300,
            cache_sliding_ttl_secs: 120,
            cache_scan_interval: 60,
            rate_limit_permits: 12,
            rate_limit_window_secs: 12,
            rate_limit_queue: 4,
            cors_allowed_origins: Vec::new(),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
