//! Vision analysis port.
//!
//! Produces a textual description, tag list and confidence for an image.
//! The output is purely derivative: analysing the same image twice is safe
//! and the ingest pipeline relies on that when re-processing media.

mod error;

pub use error::{Error, ErrorKind, Result};

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::ServiceHealth;

/// Tracing target for vision operations.
pub const TRACING_TARGET: &str = "ink_core::vision";

/// How much effort the analyzer should spend on an image.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Quick single-pass description.
    Low,
    /// Balanced description and tagging.
    #[default]
    Medium,
    /// Thorough description including text and layout.
    High,
}

impl DetailLevel {
    /// Returns the level as a lowercase string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Result of analysing a single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    /// Natural-language description of the image.
    pub description: String,
    /// Short tags naming subjects and concepts in the image.
    pub tags: Vec<String>,
    /// Identifier of the producing model.
    pub model: String,
    /// Model confidence in [0, 1].
    pub confidence: f32,
    /// When the analysis was performed.
    pub analyzed_at: Timestamp,
}

/// Analyses images into descriptions and tags.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Analyses the image at `image_url`.
    ///
    /// `language` is a BCP-47 tag for the description language.
    async fn analyze(
        &self,
        image_url: &str,
        detail: DetailLevel,
        language: &str,
    ) -> Result<ImageAnalysis>;

    /// Identifier of the producing model.
    fn model_name(&self) -> &str;

    /// Checks whether the backing service is reachable.
    async fn health_check(&self) -> Result<ServiceHealth>;
}
