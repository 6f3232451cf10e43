//! Path parameter DTOs.

use schemars::JsonSchema;
use serde::Deserialize;
use uuid::Uuid;

/// Path of `/chunks/{id}` routes.
#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
pub struct ChunkPathParams {
    /// Chunk id.
    pub id: Uuid,
}

/// Path of `/documents/{doc_id}` routes.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DocumentPathParams {
    /// Document id.
    pub doc_id: String,
}

/// Path of `/media/batch/{id}` routes.
#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
pub struct BatchPathParams {
    /// Batch job id.
    pub id: Uuid,
}
