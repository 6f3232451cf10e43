//! Search tools.

use async_trait::async_trait;
use ink_server::service::{ImageReference, SearchFilters, SearchKind, ServiceState};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{render_hits, schema_of};
use crate::registry::{Tool, ToolError};

fn default_limit() -> i64 {
    10
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::new(format!("invalid arguments: {e}")))
}

fn image_reference(raw: &str) -> ImageReference {
    match Uuid::parse_str(raw) {
        Ok(chunk_id) => ImageReference::Chunk(chunk_id),
        Err(_) => ImageReference::Url(raw.to_owned()),
    }
}

/// Arguments of `ink_search_text`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchTextParams {
    /// The text query.
    pub query: String,
    /// Maximum results (default 10).
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Minimum similarity score (default 0).
    #[serde(default)]
    pub min_score: f64,
}

/// Semantic text search over the whole store.
pub struct SearchTextTool {
    state: ServiceState,
}

impl SearchTextTool {
    /// Creates the tool.
    pub fn new(state: ServiceState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for SearchTextTool {
    fn name(&self) -> &'static str {
        "ink_search_text"
    }

    fn description(&self) -> &'static str {
        "Semantic search over knowledge chunks using a text query."
    }

    fn input_schema(&self) -> Value {
        schema_of::<SearchTextParams>()
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let params: SearchTextParams = parse_args(args)?;
        let hits = self
            .state
            .retrieval()
            .search_text(
                &params.query,
                SearchKind::All,
                SearchFilters::default(),
                params.limit,
                params.min_score,
            )
            .await?;
        Ok(render_hits(&hits))
    }
}

/// Arguments of `ink_search_chunks`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchChunksParams {
    /// Text query (optional when an image query is given).
    pub text_query: Option<String>,
    /// Image query: a URL or an existing chunk id.
    pub image_query: Option<String>,
    /// Vector partition: text, image or all.
    #[serde(default)]
    pub vector_type: SearchKind,
    /// Text-side weight for hybrid queries.
    pub text_weight: Option<f64>,
    /// Image-side weight for hybrid queries.
    pub image_weight: Option<f64>,
    /// Maximum results (default 10).
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Minimum similarity score (default 0).
    #[serde(default)]
    pub min_similarity: f64,
}

/// Multimodal search mirroring the HTTP surface.
pub struct SearchChunksTool {
    state: ServiceState,
}

impl SearchChunksTool {
    /// Creates the tool.
    pub fn new(state: ServiceState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for SearchChunksTool {
    fn name(&self) -> &'static str {
        "ink_search_chunks"
    }

    fn description(&self) -> &'static str {
        "Multimodal chunk search: text, image, or a weighted hybrid of both."
    }

    fn input_schema(&self) -> Value {
        schema_of::<SearchChunksParams>()
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let params: SearchChunksParams = parse_args(args)?;
        let retrieval = self.state.retrieval();

        let has_text = params
            .text_query
            .as_deref()
            .is_some_and(|q| !q.trim().is_empty());

        let hits = match (&params.image_query, has_text) {
            (Some(image), true) => {
                let (Some(text_weight), Some(image_weight)) =
                    (params.text_weight, params.image_weight)
                else {
                    return Err(ToolError::new(
                        "text_weight and image_weight are required for hybrid queries",
                    ));
                };
                retrieval
                    .hybrid_search(
                        params.text_query.as_deref(),
                        Some(image_reference(image)),
                        text_weight,
                        image_weight,
                        SearchFilters::default(),
                        params.limit,
                        params.min_similarity,
                    )
                    .await?
            }
            (Some(image), false) => {
                retrieval
                    .search_image(
                        image_reference(image),
                        SearchFilters::default(),
                        params.limit,
                        params.min_similarity,
                    )
                    .await?
            }
            (None, true) => {
                retrieval
                    .search_text(
                        params.text_query.as_deref().unwrap_or_default(),
                        params.vector_type,
                        SearchFilters::default(),
                        params.limit,
                        params.min_similarity,
                    )
                    .await?
            }
            (None, false) => {
                return Err(ToolError::new("either text_query or image_query is required"));
            }
        };

        Ok(render_hits(&hits))
    }
}

/// Arguments of `ink_search_images`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchImagesParams {
    /// Text query against the image partition.
    pub query: Option<String>,
    /// Reference image: a URL or an existing chunk id.
    pub image_url: Option<String>,
    /// Maximum results (default 10).
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Minimum similarity score (default 0).
    #[serde(default)]
    pub min_score: f64,
}

/// Image search by text or by reference image.
pub struct SearchImagesTool {
    state: ServiceState,
}

impl SearchImagesTool {
    /// Creates the tool.
    pub fn new(state: ServiceState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for SearchImagesTool {
    fn name(&self) -> &'static str {
        "ink_search_images"
    }

    fn description(&self) -> &'static str {
        "Searches stored images by text description or by a reference image."
    }

    fn input_schema(&self) -> Value {
        schema_of::<SearchImagesParams>()
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let params: SearchImagesParams = parse_args(args)?;
        let retrieval = self.state.retrieval();

        let hits = match (&params.image_url, &params.query) {
            (Some(image), _) => {
                retrieval
                    .search_image(
                        image_reference(image),
                        SearchFilters::default(),
                        params.limit,
                        params.min_score,
                    )
                    .await?
            }
            (None, Some(query)) => {
                retrieval
                    .search_text(
                        query,
                        SearchKind::Image,
                        SearchFilters::default(),
                        params.limit,
                        params.min_score,
                    )
                    .await?
            }
            (None, None) => return Err(ToolError::new("either query or image_url is required")),
        };

        Ok(render_hits(&hits))
    }
}

/// Arguments of `ink_hybrid_search`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct HybridSearchParams {
    /// Text query.
    pub text_query: Option<String>,
    /// Image query: a URL or an existing chunk id.
    pub image_query: Option<String>,
    /// Text-side weight (required).
    pub text_weight: f64,
    /// Image-side weight (required).
    pub image_weight: f64,
    /// Maximum results (default 10).
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Minimum fused score (default 0).
    #[serde(default)]
    pub min_similarity: f64,
}

/// Weighted hybrid search.
pub struct HybridSearchTool {
    state: ServiceState,
}

impl HybridSearchTool {
    /// Creates the tool.
    pub fn new(state: ServiceState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for HybridSearchTool {
    fn name(&self) -> &'static str {
        "ink_hybrid_search"
    }

    fn description(&self) -> &'static str {
        "Hybrid text+image search with explicit fusion weights."
    }

    fn input_schema(&self) -> Value {
        schema_of::<HybridSearchParams>()
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let params: HybridSearchParams = parse_args(args)?;

        let hits = self
            .state
            .retrieval()
            .hybrid_search(
                params.text_query.as_deref(),
                params.image_query.as_deref().map(image_reference),
                params.text_weight,
                params.image_weight,
                SearchFilters::default(),
                params.limit,
                params.min_similarity,
            )
            .await?;

        Ok(render_hits(&hits))
    }
}
