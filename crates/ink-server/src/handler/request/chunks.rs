//! Chunk CRUD request DTOs.

use ink_postgres::types::DocumentScope;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::service::TextIngest;

fn default_true() -> bool {
    true
}

/// Body of `POST /chunks`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
pub struct CreateChunk {
    /// Chunk content; must be non-empty after trimming.
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    /// Optional parent chunk.
    pub parent: Option<Uuid>,
    /// Optional owning page chunk.
    pub page: Option<Uuid>,
    /// Tag chunk ids.
    #[serde(default)]
    pub tags: Vec<Uuid>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Whether to compute a text embedding.
    #[serde(default = "default_true")]
    pub auto_embed: bool,
    /// Explicit document id; derived when absent.
    pub document_id: Option<String>,
    /// Backing file name, for file-scoped chunks.
    pub file_name: Option<String>,
}

impl CreateChunk {
    /// Converts into the ingest pipeline input.
    pub fn into_ingest(self) -> TextIngest {
        TextIngest {
            content: self.content,
            parent: self.parent,
            page: self.page,
            tags: self.tags,
            metadata: self.metadata,
            auto_embed: self.auto_embed,
            document_id: self.document_id,
            file_name: self.file_name,
        }
    }
}

/// Body of `POST /chunks/batch`.
#[derive(Debug, Clone, Deserialize, Validate, JsonSchema)]
pub struct BatchCreateChunks {
    /// Chunks to create, in order.
    #[validate(length(min = 1, message = "batch must contain at least one chunk"), nested)]
    pub chunks: Vec<CreateChunk>,
}

/// Body of `PUT /chunks/{id}`.
///
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate, JsonSchema)]
pub struct UpdateChunkRequest {
    /// New content.
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: Option<String>,
    /// New parent chunk.
    pub parent: Option<Uuid>,
    /// New owning page chunk.
    pub page: Option<Uuid>,
    /// Replacement tag set.
    pub tags: Option<Vec<Uuid>>,
    /// Replacement metadata bag.
    pub metadata: Option<serde_json::Value>,
    /// New external reference.
    pub external_ref: Option<String>,
}

impl UpdateChunkRequest {
    /// Converts into the store changeset; tags travel separately.
    pub fn into_patch(self) -> (ink_postgres::model::UpdateChunk, Option<Vec<Uuid>>) {
        let patch = ink_postgres::model::UpdateChunk {
            content: self.content,
            parent_id: self.parent.map(Some),
            page_id: self.page.map(Some),
            metadata: self.metadata.map(|m| {
                ink_postgres::types::MetadataView::new(m).into_value()
            }),
            external_ref: self.external_ref.map(Some),
            ..Default::default()
        };
        (patch, self.tags)
    }
}

/// Body of `PUT /chunks/{id}/document-scope`.
#[derive(Debug, Clone, Deserialize, Validate, JsonSchema)]
pub struct ChangeDocumentScope {
    /// The new document id.
    #[validate(length(min = 1, message = "document_id must not be empty"))]
    pub document_id: String,
    /// The new document scope.
    pub scope: DocumentScope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_chunk_requires_content() {
        let request: CreateChunk = serde_json::from_value(serde_json::json!({
            "content": ""
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn create_chunk_defaults() {
        let request: CreateChunk = serde_json::from_value(serde_json::json!({
            "content": "hello"
        }))
        .unwrap();
        assert!(request.auto_embed);
        assert!(request.tags.is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn empty_batch_is_rejected() {
        let request: BatchCreateChunks =
            serde_json::from_value(serde_json::json!({ "chunks": [] })).unwrap();
        assert!(request.validate().is_err());
    }
}
