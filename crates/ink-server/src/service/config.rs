//! Gateway service configuration.

use std::time::Duration;

use ink_opendal::StorageConfig;
use ink_postgres::PgConfig;
use ink_postgres::types::ConflictStrategy;
use serde::{Deserialize, Serialize};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port.
    pub port: u16,
    /// Per-request deadline in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8787,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Returns the inbound request deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Batch scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Upper bound any job may request for parallel units.
    pub max_concurrency: usize,
    /// Concurrency used when a job does not specify one.
    pub default_concurrency: usize,
    /// Seconds a cancelled job waits for in-flight units.
    pub shutdown_grace_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            default_concurrency: 4,
            shutdown_grace_secs: 30,
        }
    }
}

impl BatchConfig {
    /// Returns the cancellation grace window.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Search cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default time-to-live of cache entries in seconds.
    pub ttl_default_secs: u64,
    /// Soft cap on live entries; exceeded entries are evicted oldest-first.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_default_secs: 300,
            max_entries: 4096,
        }
    }
}

impl CacheConfig {
    /// Returns the default entry TTL.
    pub fn ttl_default(&self) -> Duration {
        Duration::from_secs(self.ttl_default_secs)
    }
}

/// Sync core configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Conflict strategy applied when a change does not carry one.
    pub default_strategy: ConflictStrategy,
    /// Grouping window for batched sync, in milliseconds.
    pub batch_window_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_strategy: ConflictStrategy::Merge,
            batch_window_ms: 500,
        }
    }
}

/// Top-level configuration of the gateway services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Database pool configuration.
    pub db: PgConfig,
    /// Blob storage backend selection.
    pub blob: StorageConfig,
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Batch scheduler configuration.
    pub batch: BatchConfig,
    /// Retrieval cache configuration.
    pub cache: CacheConfig,
    /// Sync core configuration.
    pub sync: SyncConfig,
    /// The single opaque bearer token authorising API access.
    pub auth_token: String,
}
