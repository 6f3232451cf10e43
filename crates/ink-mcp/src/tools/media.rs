//! Media tools.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use ink_core::vision::DetailLevel;
use ink_server::service::{BatchOptions, MediaIngest, ServiceState};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::schema_of;
use crate::registry::{Tool, ToolError};

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_owned()
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::new(format!("invalid arguments: {e}")))
}

/// Arguments of `ink_analyze_image`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnalyzeImageParams {
    /// URL of the image to analyze.
    pub image_url: String,
    /// Analysis detail level.
    #[serde(default)]
    pub detail: DetailLevel,
    /// Description language.
    #[serde(default = "default_language")]
    pub language: String,
}

/// Runs vision analysis on an image URL.
///
/// Only registered when a vision service is configured.
pub struct AnalyzeImageTool {
    state: ServiceState,
}

impl AnalyzeImageTool {
    /// Creates the tool.
    pub fn new(state: ServiceState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for AnalyzeImageTool {
    fn name(&self) -> &'static str {
        "ink_analyze_image"
    }

    fn description(&self) -> &'static str {
        "Produces a description, tags and confidence for an image URL."
    }

    fn input_schema(&self) -> Value {
        schema_of::<AnalyzeImageParams>()
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let params: AnalyzeImageParams = parse_args(args)?;

        let vision = self
            .state
            .vision()
            .ok_or_else(|| ToolError::new("no vision service configured"))?;

        let analysis = vision
            .analyze(&params.image_url, params.detail, &params.language)
            .await
            .map_err(|e| ToolError::new(e.to_string()))?;

        Ok(serde_json::to_string_pretty(&json!({
            "description": analysis.description,
            "tags": analysis.tags,
            "model": analysis.model,
            "confidence": analysis.confidence,
            "analyzed_at": analysis.analyzed_at,
        }))
        .unwrap_or_default())
    }
}

/// Arguments of `ink_upload_image`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UploadImageParams {
    /// Original file name.
    pub file_name: String,
    /// Base64-encoded image content.
    pub data: String,
    /// Whether to run vision analysis (default true when available).
    pub auto_analyze: Option<bool>,
    /// Whether to compute an image embedding (default true).
    #[serde(default = "default_true")]
    pub auto_embed: bool,
    /// Owning page chunk.
    pub page_id: Option<Uuid>,
    /// Tag chunk ids.
    #[serde(default)]
    pub tags: Vec<Uuid>,
}

/// Uploads an image through the ingest pipeline.
pub struct UploadImageTool {
    state: ServiceState,
}

impl UploadImageTool {
    /// Creates the tool.
    pub fn new(state: ServiceState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for UploadImageTool {
    fn name(&self) -> &'static str {
        "ink_upload_image"
    }

    fn description(&self) -> &'static str {
        "Stores an image (base64), deduplicating by content hash."
    }

    fn input_schema(&self) -> Value {
        schema_of::<UploadImageParams>()
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let params: UploadImageParams = parse_args(args)?;

        let data = BASE64
            .decode(params.data.trim())
            .map(Bytes::from)
            .map_err(|e| ToolError::new(format!("data is not valid base64: {e}")))?;

        let auto_analyze = params
            .auto_analyze
            .unwrap_or_else(|| self.state.ingest().has_vision());

        let outcome = self
            .state
            .ingest()
            .ingest_media(MediaIngest {
                data,
                file_name: params.file_name,
                page: params.page_id,
                tags: params.tags,
                auto_analyze,
                auto_embed: params.auto_embed,
                language: default_language(),
                detail: DetailLevel::Medium,
            })
            .await?;

        let storage = outcome.chunk.metadata_view().storage();
        Ok(json!({
            "id": outcome.chunk.id,
            "deduplicated": outcome.deduplicated,
            "url": storage.map(|s| s.url),
            "description": outcome.chunk.content,
        })
        .to_string())
    }
}

/// Arguments of `ink_batch_process_images`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BatchProcessImagesParams {
    /// Server-side folder containing images.
    pub folder: String,
    /// Owning page for every chunk.
    pub page_id: Option<Uuid>,
    /// Tags for every chunk.
    #[serde(default)]
    pub tags: Vec<Uuid>,
    /// Whether units run vision analysis (default true when available).
    pub auto_analyze: Option<bool>,
    /// Whether units compute embeddings (default true).
    #[serde(default = "default_true")]
    pub auto_embed: bool,
    /// Parallel units.
    pub concurrency: Option<usize>,
}

/// Starts a folder-scale image batch.
pub struct BatchProcessImagesTool {
    state: ServiceState,
}

impl BatchProcessImagesTool {
    /// Creates the tool.
    pub fn new(state: ServiceState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for BatchProcessImagesTool {
    fn name(&self) -> &'static str {
        "ink_batch_process_images"
    }

    fn description(&self) -> &'static str {
        "Queues a folder of images for ingestion and returns the job id."
    }

    fn input_schema(&self) -> Value {
        schema_of::<BatchProcessImagesParams>()
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let params: BatchProcessImagesParams = parse_args(args)?;

        let auto_analyze = params
            .auto_analyze
            .unwrap_or_else(|| self.state.ingest().has_vision());

        let job_id = self
            .state
            .batch()
            .start_batch(
                vec![],
                Some(params.folder.into()),
                BatchOptions {
                    page: params.page_id,
                    tags: params.tags,
                    auto_analyze,
                    auto_embed: params.auto_embed,
                    concurrency: params.concurrency,
                    language: default_language(),
                    detail: DetailLevel::Medium,
                },
            )
            .await?;

        Ok(json!({ "job_id": job_id }).to_string())
    }
}
