//! Chunk response DTOs.

use ink_postgres::model::Chunk;
use ink_postgres::types::DocumentScope;
use jiff::Timestamp;
use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;

/// File position of a chunk.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PositionResponse {
    /// File name.
    pub file_name: String,
    /// First line.
    pub line_start: Option<i32>,
    /// Last line.
    pub line_end: Option<i32>,
    /// First character offset.
    pub char_start: Option<i32>,
    /// Last character offset.
    pub char_end: Option<i32>,
}

/// The wire representation of a chunk.
///
/// Role flags are rendered as the four booleans clients expect; at most
/// one is ever true.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ChunkResponse {
    /// Chunk id.
    pub id: Uuid,
    /// Chunk content.
    pub content: String,
    /// Whether the chunk is a page root.
    pub is_page: bool,
    /// Whether the chunk is a tag.
    pub is_tag: bool,
    /// Whether the chunk is a template.
    pub is_template: bool,
    /// Whether the chunk is a template slot.
    pub is_slot: bool,
    /// Parent chunk.
    pub parent: Option<Uuid>,
    /// Owning page chunk.
    pub page: Option<Uuid>,
    /// Opaque external identifier.
    #[serde(rename = "ref")]
    pub external_ref: Option<String>,
    /// Tag chunk ids.
    pub tags: Vec<Uuid>,
    /// Metadata bag.
    pub metadata: serde_json::Value,
    /// Embedding modality, when embedded.
    pub vector_kind: Option<String>,
    /// Embedding model, when embedded.
    pub vector_model: Option<String>,
    /// Owning document id.
    pub document_id: String,
    /// Owning document scope.
    pub document_scope: DocumentScope,
    /// File position, when file-backed.
    pub position: Option<PositionResponse>,
    /// Creation instant.
    pub created_time: Timestamp,
    /// Last mutation instant.
    pub last_updated: Timestamp,
}

impl ChunkResponse {
    /// Builds the response from a stored chunk and its tag set.
    pub fn from_chunk(chunk: Chunk, tags: Vec<Uuid>) -> Self {
        let role = chunk.role;
        let position = chunk.position().map(|p| PositionResponse {
            file_name: p.file_name,
            line_start: p.line_start,
            line_end: p.line_end,
            char_start: p.char_start,
            char_end: p.char_end,
        });

        Self {
            id: chunk.id,
            content: chunk.content,
            is_page: matches!(role, ink_postgres::types::ChunkRole::Page),
            is_tag: matches!(role, ink_postgres::types::ChunkRole::Tag),
            is_template: matches!(role, ink_postgres::types::ChunkRole::Template),
            is_slot: matches!(role, ink_postgres::types::ChunkRole::Slot),
            parent: chunk.parent_id,
            page: chunk.page_id,
            external_ref: chunk.external_ref,
            tags,
            metadata: chunk.metadata,
            vector_kind: chunk.vector_kind.map(|k| k.to_string().to_lowercase()),
            vector_model: chunk.vector_model,
            document_id: chunk.document_id,
            document_scope: chunk.document_scope,
            position,
            created_time: chunk.created_at.into(),
            last_updated: chunk.updated_at.into(),
        }
    }
}

/// A plain list of chunk ids.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ChunkIds {
    /// The ids, in response order.
    pub ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use ink_postgres::types::ChunkRole;

    use super::*;

    fn chunk(role: ChunkRole) -> Chunk {
        Chunk {
            id: Uuid::now_v7(),
            content: "hello".into(),
            role,
            parent_id: None,
            page_id: None,
            external_ref: Some("ext-1".into()),
            document_id: "file:test".into(),
            document_scope: DocumentScope::File,
            metadata: serde_json::json!({}),
            file_hash: None,
            embedding: None,
            vector_kind: None,
            vector_model: None,
            file_name: Some("notes.md".into()),
            line_start: Some(3),
            line_end: Some(5),
            char_start: None,
            char_end: None,
            created_at: Timestamp::now().into(),
            updated_at: Timestamp::now().into(),
        }
    }

    #[test]
    fn at_most_one_role_flag_renders_true() {
        for role in [
            ChunkRole::Content,
            ChunkRole::Page,
            ChunkRole::Tag,
            ChunkRole::Template,
            ChunkRole::Slot,
        ] {
            let response = ChunkResponse::from_chunk(chunk(role), vec![]);
            let flags = [
                response.is_page,
                response.is_tag,
                response.is_template,
                response.is_slot,
            ];
            assert!(flags.iter().filter(|&&f| f).count() <= 1);
        }
    }

    #[test]
    fn ref_renders_under_wire_name() {
        let response = ChunkResponse::from_chunk(chunk(ChunkRole::Content), vec![]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ref"], "ext-1");
        assert!(json.get("external_ref").is_none());
    }

    #[test]
    fn position_is_projected() {
        let response = ChunkResponse::from_chunk(chunk(ChunkRole::Content), vec![]);
        let position = response.position.unwrap();
        assert_eq!(position.file_name, "notes.md");
        assert_eq!(position.line_start, Some(3));
    }
}
