//! Storage backend configuration.

use serde::{Deserialize, Serialize};

/// Selects and configures the blob storage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Fs(FsConfig),
    /// S3-compatible object storage.
    S3(S3Config),
    /// Google Drive storage.
    Gdrive(GdriveConfig),
}

impl StorageConfig {
    /// Returns the backend name.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Fs(_) => "fs",
            Self::S3(_) => "s3",
            Self::Gdrive(_) => "gdrive",
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Fs(FsConfig::default())
    }
}

/// Local filesystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
    /// Root folder for stored blobs.
    pub root: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            root: "./blobs".to_owned(),
        }
    }
}

/// S3-compatible object storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Config {
    /// Bucket name.
    pub bucket: String,
    /// Bucket region.
    pub region: String,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint: Option<String>,
    /// Access key id.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<String>,
    /// Key prefix inside the bucket.
    pub prefix: Option<String>,
}

/// Google Drive storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GdriveConfig {
    /// Root folder path inside the drive.
    pub root: String,
    /// OAuth access token.
    pub access_token: Option<String>,
}
