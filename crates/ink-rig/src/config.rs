//! Provider configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the embedding providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Custom OpenAI-compatible endpoint; the provider default when unset.
    pub endpoint: Option<String>,
    /// API key.
    pub api_key: String,
    /// Embedding model identifier.
    pub model: String,
    /// Deployment vector dimension.
    pub dimension: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: String::new(),
            model: "text-embedding-3-small".to_owned(),
            dimension: 512,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for the vision analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Custom OpenAI-compatible endpoint; the provider default when unset.
    pub endpoint: Option<String>,
    /// API key.
    pub api_key: String,
    /// Vision-capable completion model identifier.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: String::new(),
            model: "gpt-4o-mini".to_owned(),
            timeout_secs: 60,
        }
    }
}

impl VisionConfig {
    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
