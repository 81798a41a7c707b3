//! Configuration management for the bookshelf binary.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use slicekit_runtime::StoreConfig;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "bookshelf=info,slicekit_runtime=info";

/// Largest accepted `BOOKSHELF_BROADCAST_CAPACITY`.
pub const MAX_BROADCAST_CAPACITY: usize = 65_536;

/// Rejected configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The action broadcast needs room for at least one action
    #[error("BOOKSHELF_BROADCAST_CAPACITY must be at least 1")]
    ZeroBroadcastCapacity,

    /// Every subscriber would hold a buffer this large
    #[error("BOOKSHELF_BROADCAST_CAPACITY ({capacity}) must be at most {max}")]
    BroadcastCapacityTooLarge {
        /// Configured capacity
        capacity: usize,
        /// Largest accepted capacity
        max: usize,
    },

    /// Shutdown needs time to drain effects
    #[error("BOOKSHELF_SHUTDOWN_TIMEOUT_SECS must be at least 1")]
    ZeroShutdownTimeout,

    /// Every fetch would time out
    #[error(
        "BOOKSHELF_SOURCE_DELAY_MS ({delay_ms}) must be below \
         BOOKSHELF_FETCH_TIMEOUT_MS ({timeout_ms})"
    )]
    DelayExceedsTimeout {
        /// Configured source delay
        delay_ms: u64,
        /// Configured fetch timeout
        timeout_ms: u64,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Fetch timeout in milliseconds (`0` disables the timeout)
    pub fetch_timeout_ms: u64,
    /// Simulated latency of the book source in milliseconds
    pub source_delay_ms: u64,
    /// Capacity of the store's action broadcast
    pub broadcast_capacity: usize,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
    /// Tracing filter directive
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            fetch_timeout_ms: lookup("BOOKSHELF_FETCH_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            source_delay_ms: lookup("BOOKSHELF_SOURCE_DELAY_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            broadcast_capacity: lookup("BOOKSHELF_BROADCAST_CAPACITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            shutdown_timeout_secs: lookup("BOOKSHELF_SHUTDOWN_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            log_filter: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// Check the values against each other.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::ZeroBroadcastCapacity);
        }
        if self.broadcast_capacity > MAX_BROADCAST_CAPACITY {
            return Err(ConfigError::BroadcastCapacityTooLarge {
                capacity: self.broadcast_capacity,
                max: MAX_BROADCAST_CAPACITY,
            });
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(ConfigError::ZeroShutdownTimeout);
        }
        if self.fetch_timeout_ms > 0 && self.source_delay_ms >= self.fetch_timeout_ms {
            return Err(ConfigError::DelayExceedsTimeout {
                delay_ms: self.source_delay_ms,
                timeout_ms: self.fetch_timeout_ms,
            });
        }
        Ok(())
    }

    /// Fetch timeout, or `None` when disabled.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Option<Duration> {
        if self.fetch_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.fetch_timeout_ms))
        }
    }

    /// Simulated source latency.
    #[must_use]
    pub const fn source_delay(&self) -> Duration {
        Duration::from_millis(self.source_delay_ms)
    }

    /// Store settings derived from this configuration.
    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        StoreConfig::new(
            self.broadcast_capacity,
            Duration::from_secs(self.shutdown_timeout_secs),
        )
    }
}
