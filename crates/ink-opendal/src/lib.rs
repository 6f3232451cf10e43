#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for storage operations.
pub const TRACING_TARGET: &str = "ink_opendal";

mod backend;
mod config;
mod error;
mod hashing_reader;

pub use backend::{BlobStore, StoredBlob};
pub use config::{FsConfig, GdriveConfig, S3Config, StorageConfig};
pub use error::{Error, ErrorKind, Result};
pub use hashing_reader::HashingReader;
