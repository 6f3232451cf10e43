//! Command-line configuration.

use clap::{Args, Parser, Subcommand};
use ink_opendal::{FsConfig, GdriveConfig, S3Config, StorageConfig};
use ink_postgres::types::ConflictStrategy;
use ink_rig::{EmbeddingConfig, VisionConfig};
use ink_server::service::{BatchConfig, CacheConfig, ServerConfig, ServiceConfig, SyncConfig};

/// The Ink gateway.
#[derive(Debug, Parser)]
#[command(name = "ink-gateway", version, about)]
pub struct Cli {
    /// What to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Gateway entry points.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP gateway.
    Serve(GatewayArgs),
    /// Run the JSON-RPC tool server on stdin/stdout.
    Mcp(GatewayArgs),
}

/// Shared configuration of both entry points.
#[derive(Debug, Args)]
pub struct GatewayArgs {
    /// Database configuration.
    #[command(flatten)]
    pub db: ink_postgres::PgConfig,

    /// Listen port of the HTTP server.
    #[arg(long, env = "INK_PORT", default_value_t = 8787)]
    pub port: u16,

    /// Per-request deadline in seconds.
    #[arg(long, env = "INK_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout: u64,

    /// Bearer token authorising API access.
    #[arg(long, env = "INK_AUTH_TOKEN", default_value = "")]
    pub auth_token: String,

    // Blob storage
    /// Blob backend (`fs`, `s3`, `gdrive`).
    #[arg(long, env = "INK_BLOB_TYPE", default_value = "fs")]
    pub blob_type: String,

    /// Root folder for fs (or gdrive) blob storage.
    #[arg(long, env = "INK_BLOB_ROOT", default_value = "./blobs")]
    pub blob_root: String,

    /// Bucket for s3 blob storage.
    #[arg(long, env = "INK_BLOB_BUCKET", default_value = "")]
    pub blob_bucket: String,

    /// Region for s3 blob storage.
    #[arg(long, env = "INK_BLOB_REGION", default_value = "us-east-1")]
    pub blob_region: String,

    /// Endpoint override for s3-compatible stores.
    #[arg(long, env = "INK_BLOB_ENDPOINT")]
    pub blob_endpoint: Option<String>,

    /// Access key id for s3 blob storage.
    #[arg(long, env = "INK_BLOB_ACCESS_KEY")]
    pub blob_access_key: Option<String>,

    /// Secret access key for s3 blob storage.
    #[arg(long, env = "INK_BLOB_SECRET_KEY")]
    pub blob_secret_key: Option<String>,

    /// OAuth access token for gdrive blob storage.
    #[arg(long, env = "INK_BLOB_GDRIVE_TOKEN")]
    pub blob_gdrive_token: Option<String>,

    // Embedding
    /// OpenAI-compatible embedding endpoint override.
    #[arg(long, env = "INK_EMBEDDING_ENDPOINT")]
    pub embedding_endpoint: Option<String>,

    /// Embedding API key.
    #[arg(long, env = "INK_EMBEDDING_API_KEY", default_value = "")]
    pub embedding_api_key: String,

    /// Embedding model identifier.
    #[arg(long, env = "INK_EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
    pub embedding_model: String,

    /// Deployment vector dimension.
    #[arg(long, env = "INK_EMBEDDING_DIMENSION", default_value_t = 512)]
    pub embedding_dimension: usize,

    /// Embedding request timeout in seconds.
    #[arg(long, env = "INK_EMBEDDING_TIMEOUT", default_value_t = 30)]
    pub embedding_timeout: u64,

    // Vision
    /// OpenAI-compatible vision endpoint override.
    #[arg(long, env = "INK_VISION_ENDPOINT")]
    pub vision_endpoint: Option<String>,

    /// Vision API key; vision is disabled when unset.
    #[arg(long, env = "INK_VISION_API_KEY")]
    pub vision_api_key: Option<String>,

    /// Vision model identifier.
    #[arg(long, env = "INK_VISION_MODEL", default_value = "gpt-4o-mini")]
    pub vision_model: String,

    /// Vision request timeout in seconds.
    #[arg(long, env = "INK_VISION_TIMEOUT", default_value_t = 60)]
    pub vision_timeout: u64,

    // Batch
    /// Upper bound on per-job parallel units.
    #[arg(long, env = "INK_BATCH_MAX_CONCURRENCY", default_value_t = 8)]
    pub batch_max_concurrency: usize,

    /// Per-job parallel units when unspecified.
    #[arg(long, env = "INK_BATCH_DEFAULT_CONCURRENCY", default_value_t = 4)]
    pub batch_default_concurrency: usize,

    /// Seconds a cancelled job waits for in-flight units.
    #[arg(long, env = "INK_BATCH_SHUTDOWN_GRACE", default_value_t = 30)]
    pub batch_shutdown_grace: u64,

    // Cache
    /// Search cache TTL in seconds.
    #[arg(long, env = "INK_CACHE_TTL", default_value_t = 300)]
    pub cache_ttl: u64,

    /// Soft cap on live cache entries.
    #[arg(long, env = "INK_CACHE_MAX_ENTRIES", default_value_t = 4096)]
    pub cache_max_entries: usize,

    // Sync
    /// Default conflict strategy (`local-wins`, `remote-wins`, `merge`, `manual`).
    #[arg(long, env = "INK_SYNC_STRATEGY", default_value = "merge")]
    pub sync_strategy: ConflictStrategy,

    /// Grouping window for batched sync, in milliseconds.
    #[arg(long, env = "INK_SYNC_BATCH_WINDOW", default_value_t = 500)]
    pub sync_batch_window: u64,

    /// Run with deterministic mock AI ports (no external services).
    #[arg(long, env = "INK_MOCK_AI", default_value_t = false)]
    pub mock_ai: bool,
}

impl GatewayArgs {
    /// Assembles the service configuration.
    pub fn service_config(&self) -> anyhow::Result<ServiceConfig> {
        let mut db = self.db.clone();
        // one deployment constant drives both the store checks and the ports
        db.vector_dimensions = self.embedding_dimension;

        Ok(ServiceConfig {
            db,
            blob: self.storage_config()?,
            server: ServerConfig {
                port: self.port,
                request_timeout_secs: self.request_timeout,
            },
            batch: BatchConfig {
                max_concurrency: self.batch_max_concurrency,
                default_concurrency: self.batch_default_concurrency,
                shutdown_grace_secs: self.batch_shutdown_grace,
            },
            cache: CacheConfig {
                ttl_default_secs: self.cache_ttl,
                max_entries: self.cache_max_entries,
            },
            sync: SyncConfig {
                default_strategy: self.sync_strategy,
                batch_window_ms: self.sync_batch_window,
            },
            auth_token: self.auth_token.clone(),
        })
    }

    /// Assembles the blob storage configuration.
    fn storage_config(&self) -> anyhow::Result<StorageConfig> {
        let config = match self.blob_type.as_str() {
            "fs" => StorageConfig::Fs(FsConfig {
                root: self.blob_root.clone(),
            }),
            "s3" => StorageConfig::S3(S3Config {
                bucket: self.blob_bucket.clone(),
                region: self.blob_region.clone(),
                endpoint: self.blob_endpoint.clone(),
                access_key_id: self.blob_access_key.clone(),
                secret_access_key: self.blob_secret_key.clone(),
                prefix: None,
            }),
            "gdrive" => StorageConfig::Gdrive(GdriveConfig {
                root: self.blob_root.clone(),
                access_token: self.blob_gdrive_token.clone(),
            }),
            other => anyhow::bail!("unknown blob type: {other}"),
        };
        Ok(config)
    }

    /// Assembles the embedding port configuration.
    pub fn embedding_config(&self) -> EmbeddingConfig {
        EmbeddingConfig {
            endpoint: self.embedding_endpoint.clone(),
            api_key: self.embedding_api_key.clone(),
            model: self.embedding_model.clone(),
            dimension: self.embedding_dimension,
            timeout_secs: self.embedding_timeout,
        }
    }

    /// Assembles the vision port configuration when vision is enabled.
    pub fn vision_config(&self) -> Option<VisionConfig> {
        self.vision_api_key.as_ref().map(|api_key| VisionConfig {
            endpoint: self.vision_endpoint.clone(),
            api_key: api_key.clone(),
            model: self.vision_model.clone(),
            timeout_secs: self.vision_timeout,
        })
    }
}
