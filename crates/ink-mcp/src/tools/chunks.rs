//! Chunk tools.

use async_trait::async_trait;
use ink_postgres::query::{ChunkRepository, TagRepository};
use ink_server::service::{ServiceState, TextIngest};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::schema_of;
use crate::registry::{Tool, ToolError};

fn default_true() -> bool {
    true
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::new(format!("invalid arguments: {e}")))
}

/// Arguments of `ink_create_text_chunk`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateTextChunkParams {
    /// Chunk content.
    pub content: String,
    /// Owning page chunk.
    pub page: Option<Uuid>,
    /// Parent chunk.
    pub parent: Option<Uuid>,
    /// Tag chunk ids.
    #[serde(default)]
    pub tags: Vec<Uuid>,
    /// Whether to embed the chunk (default true).
    #[serde(default = "default_true")]
    pub auto_embed: bool,
}

/// Creates a text chunk.
pub struct CreateTextChunkTool {
    state: ServiceState,
}

impl CreateTextChunkTool {
    /// Creates the tool.
    pub fn new(state: ServiceState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for CreateTextChunkTool {
    fn name(&self) -> &'static str {
        "ink_create_text_chunk"
    }

    fn description(&self) -> &'static str {
        "Stores a text chunk in the knowledge base, optionally embedding it."
    }

    fn input_schema(&self) -> Value {
        schema_of::<CreateTextChunkParams>()
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let params: CreateTextChunkParams = parse_args(args)?;

        let outcome = self
            .state
            .ingest()
            .ingest_text(TextIngest {
                content: params.content,
                parent: params.parent,
                page: params.page,
                tags: params.tags,
                metadata: json!({}),
                auto_embed: params.auto_embed,
                document_id: None,
                file_name: None,
            })
            .await?;

        Ok(json!({
            "id": outcome.chunk.id,
            "document_id": outcome.chunk.document_id,
            "embedded": outcome.chunk.vector_kind.is_some(),
        })
        .to_string())
    }
}

/// Arguments of `ink_get_chunk`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetChunkParams {
    /// The chunk id.
    pub chunk_id: Uuid,
}

/// Fetches a chunk by id.
pub struct GetChunkTool {
    state: ServiceState,
}

impl GetChunkTool {
    /// Creates the tool.
    pub fn new(state: ServiceState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for GetChunkTool {
    fn name(&self) -> &'static str {
        "ink_get_chunk"
    }

    fn description(&self) -> &'static str {
        "Fetches a chunk with its tags and metadata by id."
    }

    fn input_schema(&self) -> Value {
        schema_of::<GetChunkParams>()
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let params: GetChunkParams = parse_args(args)?;

        let mut conn = self.state.pg_client().get_connection().await?;
        let chunk = conn
            .find_chunk_by_id(params.chunk_id)
            .await?
            .ok_or_else(|| ToolError::new(format!("chunk {} not found", params.chunk_id)))?;
        let tags = conn.list_chunk_tags(params.chunk_id).await?;

        let created_time: jiff::Timestamp = chunk.created_at.into();
        let last_updated: jiff::Timestamp = chunk.updated_at.into();
        Ok(serde_json::to_string_pretty(&json!({
            "id": chunk.id,
            "content": chunk.content,
            "role": chunk.role.to_string(),
            "parent": chunk.parent_id,
            "page": chunk.page_id,
            "tags": tags,
            "metadata": chunk.metadata,
            "document_id": chunk.document_id,
            "created_time": created_time,
            "last_updated": last_updated,
        }))
        .unwrap_or_default())
    }
}
