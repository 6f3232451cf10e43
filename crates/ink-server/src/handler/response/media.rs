//! Media response DTOs.

use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;

use super::ChunkResponse;

/// Response of `POST /media/upload`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct UploadResponse {
    /// The stored (or reused) chunk.
    pub chunk: ChunkResponse,
    /// Whether an existing chunk was reused via blob deduplication.
    pub deduplicated: bool,
}

/// Response of `POST /media/batch`.
#[derive(Debug, Clone, Copy, Serialize, JsonSchema)]
pub struct BatchAccepted {
    /// The immediately-visible job id.
    pub job_id: Uuid,
}

/// One group of duplicate images.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DuplicateGroupResponse {
    /// Member chunks, oldest first.
    pub chunks: Vec<ChunkResponse>,
    /// Whether the group shares an identical blob hash.
    pub exact: bool,
}

/// Response of `POST /media/find-duplicates`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FindDuplicatesResponse {
    /// The duplicate groups, largest first.
    pub groups: Vec<DuplicateGroupResponse>,
    /// Number of groups.
    pub total_groups: usize,
}
