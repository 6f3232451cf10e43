#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for provider operations.
pub const TRACING_TARGET: &str = "ink_rig";

mod config;
mod embedding;
mod vision;

pub use config::{EmbeddingConfig, VisionConfig};
pub use embedding::{HttpImageEmbedder, RigTextEmbedder};
pub use vision::RigVisionAnalyzer;
