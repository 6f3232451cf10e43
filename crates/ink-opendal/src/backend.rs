//! Blob storage backend over OpenDAL operators.

use bytes::Bytes;
use opendal::{Operator, services};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::{FsConfig, GdriveConfig, S3Config, StorageConfig};
use crate::hashing_reader::HashingReader;
use crate::{Error, Result, TRACING_TARGET};

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Opaque storage handle (the backend key).
    pub key: String,
    /// Stable URL of the blob.
    pub url: String,
    /// SHA-256 of the content, hex encoded.
    pub file_hash: String,
    /// Content length in bytes.
    pub size_bytes: u64,
}

/// Unified blob store that wraps an OpenDAL operator.
///
/// Uploads hash their content while streaming and return the hash so the
/// ingest pipeline can deduplicate blobs before anything else touches them.
/// The store is cheap to clone and safe for concurrent use.
#[derive(Clone)]
pub struct BlobStore {
    operator: Operator,
    config: StorageConfig,
}

impl BlobStore {
    /// Creates a new blob store from configuration.
    pub fn new(config: StorageConfig) -> Result<Self> {
        let operator = Self::create_operator(&config)?;

        tracing::info!(
            target: TRACING_TARGET,
            backend = %config.backend_name(),
            "Blob store initialized"
        );

        Ok(Self { operator, config })
    }

    /// Returns the configuration for this store.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the backend name.
    pub fn backend_name(&self) -> &'static str {
        self.config.backend_name()
    }

    /// Uploads a blob from an async reader, hashing while streaming.
    ///
    /// The blob is keyed by content hash (`blobs/<aa>/<hash>`), so
    /// re-uploading identical content overwrites the same object and the
    /// returned handle is stable across duplicate uploads.
    pub async fn upload(
        &self,
        reader: impl AsyncRead + Unpin + Send,
        file_name: &str,
    ) -> Result<StoredBlob> {
        let mut hashing = HashingReader::new(reader);
        let mut data = Vec::new();
        hashing
            .read_to_end(&mut data)
            .await
            .map_err(Error::io)?;
        let file_hash = hashing.finalize_hex();

        self.upload_hashed(Bytes::from(data), file_name, file_hash)
            .await
    }

    /// Uploads a blob whose bytes are already in memory.
    pub async fn upload_bytes(&self, data: Bytes, file_name: &str) -> Result<StoredBlob> {
        let file_hash = hex::encode(Sha256::digest(&data));
        self.upload_hashed(data, file_name, file_hash).await
    }

    async fn upload_hashed(
        &self,
        data: Bytes,
        file_name: &str,
        file_hash: String,
    ) -> Result<StoredBlob> {
        let size_bytes = data.len() as u64;
        let key = blob_key(&file_hash, file_name);

        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            size = size_bytes,
            "Uploading blob"
        );

        self.operator
            .write(&key, data)
            .await
            .map_err(Error::backend)?;

        let url = self.blob_url(&key);

        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            url = %url,
            "Blob upload complete"
        );

        Ok(StoredBlob {
            key,
            url,
            file_hash,
            size_bytes,
        })
    }

    /// Fetches a blob by its storage handle.
    pub async fn fetch(&self, key: &str) -> Result<Bytes> {
        let data = self.operator.read(key).await.map_err(Error::backend)?;
        Ok(data.to_bytes())
    }

    /// Returns whether a blob exists.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.operator.exists(key).await.map_err(Error::backend)
    }

    /// Deletes a blob by its storage handle.
    pub async fn delete(&self, key: &str) -> Result<()> {
        tracing::debug!(target: TRACING_TARGET, key = %key, "Deleting blob");
        self.operator.delete(key).await.map_err(Error::backend)
    }

    /// Verifies the backend is reachable by probing its root.
    pub async fn health_check(&self) -> Result<()> {
        self.operator
            .check()
            .await
            .map_err(Error::backend)
    }

    /// Returns the stable URL for a storage key.
    pub fn blob_url(&self, key: &str) -> String {
        match &self.config {
            StorageConfig::Fs(_) => format!("ink://fs/{key}"),
            StorageConfig::S3(cfg) => match &cfg.endpoint {
                Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), cfg.bucket, key),
                None => format!("https://{}.s3.{}.amazonaws.com/{}", cfg.bucket, cfg.region, key),
            },
            StorageConfig::Gdrive(_) => format!("ink://gdrive/{key}"),
        }
    }

    fn create_operator(config: &StorageConfig) -> Result<Operator> {
        match config {
            StorageConfig::Fs(cfg) => Self::create_fs_operator(cfg),
            StorageConfig::S3(cfg) => Self::create_s3_operator(cfg),
            StorageConfig::Gdrive(cfg) => Self::create_gdrive_operator(cfg),
        }
    }

    fn create_fs_operator(cfg: &FsConfig) -> Result<Operator> {
        let builder = services::Fs::default().root(&cfg.root);

        Operator::new(builder)
            .map(|op| op.finish())
            .map_err(Error::backend)
    }

    fn create_s3_operator(cfg: &S3Config) -> Result<Operator> {
        if cfg.bucket.is_empty() {
            return Err(Error::config("s3 storage requires a bucket"));
        }

        let mut builder = services::S3::default()
            .bucket(&cfg.bucket)
            .region(&cfg.region);

        if let Some(ref endpoint) = cfg.endpoint {
            builder = builder.endpoint(endpoint);
        }

        if let Some(ref access_key_id) = cfg.access_key_id {
            builder = builder.access_key_id(access_key_id);
        }

        if let Some(ref secret_access_key) = cfg.secret_access_key {
            builder = builder.secret_access_key(secret_access_key);
        }

        if let Some(ref prefix) = cfg.prefix {
            builder = builder.root(prefix);
        }

        Operator::new(builder)
            .map(|op| op.finish())
            .map_err(Error::backend)
    }

    fn create_gdrive_operator(cfg: &GdriveConfig) -> Result<Operator> {
        let mut builder = services::Gdrive::default().root(&cfg.root);

        if let Some(ref access_token) = cfg.access_token {
            builder = builder.access_token(access_token);
        }

        Operator::new(builder)
            .map(|op| op.finish())
            .map_err(Error::backend)
    }
}

/// Derives the storage key for a blob.
///
/// Keyed by hash with a two-character fan-out prefix; the original file
/// extension is kept so fetched URLs stay recognisable to viewers.
fn blob_key(file_hash: &str, file_name: &str) -> String {
    let prefix = &file_hash[..2.min(file_hash.len())];
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!("blobs/{prefix}/{file_hash}.{ext}"),
        _ => format!("blobs/{prefix}/{file_hash}"),
    }
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("backend", &self.config.backend_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs_store(root: &std::path::Path) -> BlobStore {
        BlobStore::new(StorageConfig::Fs(FsConfig {
            root: root.to_string_lossy().into_owned(),
        }))
        .unwrap()
    }

    #[test]
    fn blob_keys_keep_extension_and_fan_out() {
        assert_eq!(blob_key("abcdef", "photo.png"), "blobs/ab/abcdef.png");
        assert_eq!(blob_key("abcdef", "noext"), "blobs/ab/abcdef");
    }

    #[tokio::test]
    async fn upload_and_fetch_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = fs_store(dir.path());

        let stored = store
            .upload(&b"hello blob"[..], "note.txt")
            .await
            .unwrap();

        assert_eq!(stored.size_bytes, 10);
        assert_eq!(stored.file_hash.len(), 64);
        assert!(stored.url.starts_with("ink://fs/"));

        let fetched = store.fetch(&stored.key).await.unwrap();
        assert_eq!(&fetched[..], b"hello blob");
    }

    #[tokio::test]
    async fn identical_content_maps_to_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = fs_store(dir.path());

        let first = store.upload(&b"same bytes"[..], "a.png").await.unwrap();
        let second = store.upload(&b"same bytes"[..], "b.png").await.unwrap();

        assert_eq!(first.file_hash, second.file_hash);
        assert_eq!(first.key, second.key);
    }

    #[tokio::test]
    async fn upload_bytes_matches_streaming_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = fs_store(dir.path());

        let streamed = store.upload(&b"payload"[..], "x.bin").await.unwrap();
        let buffered = store
            .upload_bytes(Bytes::from_static(b"payload"), "x.bin")
            .await
            .unwrap();

        assert_eq!(streamed.file_hash, buffered.file_hash);
    }

    #[tokio::test]
    async fn delete_removes_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = fs_store(dir.path());

        let stored = store.upload(&b"transient"[..], "t.bin").await.unwrap();
        assert!(store.exists(&stored.key).await.unwrap());

        store.delete(&stored.key).await.unwrap();
        assert!(!store.exists(&stored.key).await.unwrap());
    }
}
