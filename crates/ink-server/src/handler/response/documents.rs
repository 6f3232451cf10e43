//! Document response DTOs.

use ink_postgres::model::VirtualDocument;
use jiff::Timestamp;
use schemars::JsonSchema;
use serde::Serialize;

use super::ChunkResponse;

/// The wire representation of a virtual document.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct VirtualDocumentResponse {
    /// Composite document id.
    pub document_id: String,
    /// External source type.
    pub source_type: String,
    /// External context id.
    pub context_id: String,
    /// Human title.
    pub title: Option<String>,
    /// Context metadata.
    pub metadata: serde_json::Value,
    /// Creation instant.
    pub created_at: Timestamp,
    /// Last update instant.
    pub last_updated: Timestamp,
}

impl From<VirtualDocument> for VirtualDocumentResponse {
    fn from(document: VirtualDocument) -> Self {
        Self {
            document_id: document.document_id,
            source_type: document.source_type,
            context_id: document.context_id,
            title: document.title,
            metadata: document.metadata,
            created_at: document.created_at.into(),
            last_updated: document.updated_at.into(),
        }
    }
}

/// A chunk annotated with its hierarchy depth.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct HierarchyChunkResponse {
    /// The chunk.
    #[serde(flatten)]
    pub chunk: ChunkResponse,
    /// Depth below the listed root.
    pub depth: i32,
}

/// Response of `GET /documents/{doc_id}/chunks`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DocumentChunksResponse {
    /// The listed document.
    pub document_id: String,
    /// The page of chunks.
    pub chunks: Vec<ChunkResponse>,
    /// Total chunks in the document.
    pub total: i64,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub page_size: u32,
    /// Descendants of the listed chunks, when hierarchy was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<Vec<HierarchyChunkResponse>>,
}
