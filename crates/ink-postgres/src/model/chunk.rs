//! Chunk model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use pgvector::Vector;
use uuid::Uuid;

use crate::schema::chunks;
use crate::types::{ChunkRole, DocumentScope, MetadataView, VectorKind};
use crate::{PgError, PgResult};

/// The universal unit of stored knowledge.
///
/// A chunk is role-polymorphic: plain content, page root, tag, template or
/// slot. Image chunks carry their blob location and AI analysis in the
/// metadata bag and may hold an image-kind embedding; text chunks may hold
/// a text-kind embedding.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chunks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Chunk {
    /// Unique chunk identifier.
    pub id: Uuid,
    /// Chunk text; the analysis description for image chunks.
    pub content: String,
    /// Role of the chunk in the knowledge graph.
    pub role: ChunkRole,
    /// Optional parent chunk (tree edge).
    pub parent_id: Option<Uuid>,
    /// Optional owning page chunk.
    pub page_id: Option<Uuid>,
    /// Optional opaque external identifier.
    pub external_ref: Option<String>,
    /// Identifier of the owning document.
    pub document_id: String,
    /// Scope of the owning document.
    pub document_scope: DocumentScope,
    /// Free-form metadata bag with reserved projections.
    pub metadata: serde_json::Value,
    /// Denormalised blob hash for image deduplication.
    pub file_hash: Option<String>,
    /// Embedding vector at the deployment dimension.
    pub embedding: Option<Vector>,
    /// Modality that produced the embedding.
    pub vector_kind: Option<VectorKind>,
    /// Model that produced the embedding.
    pub vector_model: Option<String>,
    /// Backing file name, for editor-file chunks.
    pub file_name: Option<String>,
    /// First line of the chunk in the backing file.
    pub line_start: Option<i32>,
    /// Last line of the chunk in the backing file.
    pub line_end: Option<i32>,
    /// First character offset.
    pub char_start: Option<i32>,
    /// Last character offset.
    pub char_end: Option<i32>,
    /// Timestamp when the chunk was created.
    pub created_at: Timestamp,
    /// Timestamp when the chunk was last updated.
    pub updated_at: Timestamp,
}

impl Chunk {
    /// Returns a typed view over the metadata bag.
    pub fn metadata_view(&self) -> MetadataView {
        MetadataView::new(self.metadata.clone())
    }

    /// Returns whether this chunk is an image chunk.
    pub fn is_image(&self) -> bool {
        self.metadata_view().is_image()
    }

    /// Returns the embedding dimension, when an embedding is present.
    pub fn embedding_dimensions(&self) -> Option<usize> {
        self.embedding.as_ref().map(|v| v.as_slice().len())
    }

    /// Returns the file position of the chunk, when file-backed.
    pub fn position(&self) -> Option<ChunkPosition> {
        Some(ChunkPosition {
            file_name: self.file_name.clone()?,
            line_start: self.line_start,
            line_end: self.line_end,
            char_start: self.char_start,
            char_end: self.char_end,
        })
    }
}

/// Position of a chunk inside its backing editor file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPosition {
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

/// Data for creating a new chunk.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = chunks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewChunk {
    /// Chunk id; assigned by the store when the caller passes none.
    pub id: Uuid,
    /// Chunk text (required, non-empty after trimming).
    pub content: String,
    /// Role of the chunk.
    pub role: ChunkRole,
    /// Optional parent chunk.
    pub parent_id: Option<Uuid>,
    /// Optional owning page chunk.
    pub page_id: Option<Uuid>,
    /// Optional opaque external identifier.
    pub external_ref: Option<String>,
    /// Owning document id.
    pub document_id: String,
    /// Owning document scope.
    pub document_scope: DocumentScope,
    /// Metadata bag.
    pub metadata: serde_json::Value,
    /// Denormalised blob hash.
    pub file_hash: Option<String>,
    /// Embedding vector.
    pub embedding: Option<Vector>,
    /// Embedding modality.
    pub vector_kind: Option<VectorKind>,
    /// Embedding model.
    pub vector_model: Option<String>,
    /// Backing file name.
    pub file_name: Option<String>,
    /// First line.
    pub line_start: Option<i32>,
    /// Last line.
    pub line_end: Option<i32>,
    /// First character offset.
    pub char_start: Option<i32>,
    /// Last character offset.
    pub char_end: Option<i32>,
}

impl NewChunk {
    /// Creates a new chunk insert with a fresh v7 id and defaults.
    pub fn new(content: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            content: content.into(),
            role: ChunkRole::Content,
            parent_id: None,
            page_id: None,
            external_ref: None,
            document_id: document_id.into(),
            document_scope: DocumentScope::File,
            metadata: serde_json::Value::Object(Default::default()),
            file_hash: None,
            embedding: None,
            vector_kind: None,
            vector_model: None,
            file_name: None,
            line_start: None,
            line_end: None,
            char_start: None,
            char_end: None,
        }
    }

    /// Validates the store invariants that do not require other rows.
    ///
    /// Checks non-empty content, vector/kind/model presence agreement and
    /// the deployment embedding dimension.
    pub fn validate(&self, expected_dimensions: usize) -> PgResult<()> {
        validate_content(&self.content)?;
        validate_vector_fields(
            self.embedding.as_ref(),
            self.vector_kind,
            self.vector_model.as_deref(),
            expected_dimensions,
        )
    }
}

/// Data for a partial chunk update.
///
/// `None` fields are left untouched. Clearing a nullable column goes
/// through the dedicated repository operations instead of this changeset.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = chunks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdateChunk {
    /// New content.
    pub content: Option<String>,
    /// New role.
    pub role: Option<ChunkRole>,
    /// New parent.
    pub parent_id: Option<Option<Uuid>>,
    /// New owning page.
    pub page_id: Option<Option<Uuid>>,
    /// New external ref.
    pub external_ref: Option<Option<String>>,
    /// New metadata bag.
    pub metadata: Option<serde_json::Value>,
    /// New blob hash.
    pub file_hash: Option<Option<String>>,
    /// New embedding.
    pub embedding: Option<Option<Vector>>,
    /// New embedding modality.
    pub vector_kind: Option<Option<VectorKind>>,
    /// New embedding model.
    pub vector_model: Option<Option<String>>,
    /// New file name.
    pub file_name: Option<Option<String>>,
    /// New first line.
    pub line_start: Option<Option<i32>>,
    /// New last line.
    pub line_end: Option<Option<i32>>,
    /// New first character offset.
    pub char_start: Option<Option<i32>>,
    /// New last character offset.
    pub char_end: Option<Option<i32>>,
    /// Bumped update timestamp; filled in by the repository.
    pub updated_at: Option<Timestamp>,
}

impl UpdateChunk {
    /// Returns whether this patch mutates any field tracked by the
    /// strictly-increasing `updated_at` rule.
    pub fn is_material(&self) -> bool {
        self.content.is_some()
            || self.role.is_some()
            || self.parent_id.is_some()
            || self.page_id.is_some()
            || self.metadata.is_some()
            || self.embedding.is_some()
            || self.vector_kind.is_some()
            || self.vector_model.is_some()
    }

    /// Validates the row-local invariants the patch can affect.
    pub fn validate(&self, expected_dimensions: usize) -> PgResult<()> {
        if let Some(content) = &self.content {
            validate_content(content)?;
        }

        // A patch that touches any vector field must carry all three so the
        // presence invariant can be checked without reading the old row.
        let touches_vector =
            self.embedding.is_some() || self.vector_kind.is_some() || self.vector_model.is_some();
        if touches_vector {
            let (Some(embedding), Some(kind), Some(model)) =
                (&self.embedding, &self.vector_kind, &self.vector_model)
            else {
                return Err(PgError::validation(
                    "vector, vector_kind and vector_model must be patched together",
                ));
            };
            validate_vector_fields(
                embedding.as_ref(),
                *kind,
                model.as_deref(),
                expected_dimensions,
            )?;
        }

        Ok(())
    }
}

fn validate_content(content: &str) -> PgResult<()> {
    if content.trim().is_empty() {
        return Err(PgError::validation("chunk content must not be empty"));
    }
    Ok(())
}

fn validate_vector_fields(
    embedding: Option<&Vector>,
    kind: Option<VectorKind>,
    model: Option<&str>,
    expected_dimensions: usize,
) -> PgResult<()> {
    match embedding {
        Some(vector) => {
            if kind.is_none() || model.is_none_or(str::is_empty) {
                return Err(PgError::validation(
                    "embedded chunks require vector_kind and vector_model",
                ));
            }
            let actual = vector.as_slice().len();
            if actual != expected_dimensions {
                return Err(PgError::validation(format!(
                    "embedding dimension {actual} does not match deployment dimension {expected_dimensions}"
                )));
            }
        }
        None => {
            if kind.is_some() || model.is_some() {
                return Err(PgError::validation(
                    "vector_kind and vector_model require an embedding",
                ));
            }
        }
    }
    Ok(())
}

/// A chunk with its similarity score.
///
/// Returned from vector search queries; `score` is cosine similarity for
/// single-kind searches and the weighted fusion score for hybrid searches.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The chunk.
    pub chunk: Chunk,
    /// Similarity or fusion score, higher is more similar.
    pub score: f64,
    /// Cosine similarity contributed by the text side, when any.
    pub text_similarity: Option<f64>,
    /// Cosine similarity contributed by the image side, when any.
    pub image_similarity: Option<f64>,
}

impl ScoredChunk {
    /// Wraps a single-kind search result.
    pub fn single(chunk: Chunk, score: f64, kind: VectorKind) -> Self {
        let (text_similarity, image_similarity) = match kind {
            VectorKind::Text => (Some(score), None),
            VectorKind::Image => (None, Some(score)),
        };
        Self {
            chunk,
            score,
            text_similarity,
            image_similarity,
        }
    }

    /// Consumes self and returns the inner chunk.
    pub fn into_chunk(self) -> Chunk {
        self.chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_fails_validation() {
        let chunk = NewChunk::new("   ", "file:abc");
        assert!(matches!(chunk.validate(4), Err(PgError::Validation(_))));
    }

    #[test]
    fn vector_without_kind_fails_validation() {
        let mut chunk = NewChunk::new("hello", "file:abc");
        chunk.embedding = Some(Vector::from(vec![0.0; 4]));
        chunk.vector_model = Some("mock".into());
        assert!(chunk.validate(4).is_err());

        chunk.vector_kind = Some(VectorKind::Text);
        assert!(chunk.validate(4).is_ok());
    }

    #[test]
    fn kind_without_vector_fails_validation() {
        let mut chunk = NewChunk::new("hello", "file:abc");
        chunk.vector_kind = Some(VectorKind::Text);
        assert!(chunk.validate(4).is_err());
    }

    #[test]
    fn dimension_mismatch_fails_validation() {
        let mut chunk = NewChunk::new("hello", "file:abc");
        chunk.embedding = Some(Vector::from(vec![0.0; 3]));
        chunk.vector_kind = Some(VectorKind::Text);
        chunk.vector_model = Some("mock".into());
        assert!(matches!(chunk.validate(4), Err(PgError::Validation(_))));
    }

    #[test]
    fn partial_vector_patch_is_rejected() {
        let patch = UpdateChunk {
            embedding: Some(Some(Vector::from(vec![0.0; 4]))),
            ..Default::default()
        };
        assert!(patch.validate(4).is_err());
    }

    #[test]
    fn material_patch_detection() {
        let patch = UpdateChunk {
            file_name: Some(Some("notes.md".into())),
            ..Default::default()
        };
        assert!(!patch.is_material());

        let patch = UpdateChunk {
            content: Some("new".into()),
            ..Default::default()
        };
        assert!(patch.is_material());
    }
}
