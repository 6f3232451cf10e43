//! Sync request DTOs.

use ink_postgres::types::ConflictStrategy;
use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::service::{ChunkChange, SyncChunk, SyncOp, SyncOptions};

/// The client-side chunk carried by a change record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SyncChunkRequest {
    /// Chunk id; required for update and delete.
    pub id: Option<Uuid>,
    /// Chunk content.
    pub content: Option<String>,
    /// Parent chunk.
    pub parent: Option<Uuid>,
    /// Owning page chunk.
    pub page: Option<Uuid>,
    /// Tag set.
    pub tags: Option<Vec<Uuid>>,
    /// Metadata bag.
    pub metadata: Option<serde_json::Value>,
    /// Backing file name.
    pub file_name: Option<String>,
    /// Line range start.
    pub line_start: Option<i32>,
    /// Line range end.
    pub line_end: Option<i32>,
}

impl From<SyncChunkRequest> for SyncChunk {
    fn from(request: SyncChunkRequest) -> Self {
        Self {
            id: request.id,
            content: request.content,
            parent: request.parent,
            page: request.page,
            tags: request.tags,
            metadata: request.metadata,
            file_name: request.file_name,
            line_start: request.line_start,
            line_end: request.line_end,
        }
    }
}

/// One change record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncChangeRequest {
    /// The operation.
    pub op: SyncOp,
    /// The client's view of the chunk.
    pub chunk: SyncChunkRequest,
    /// The server version the client last saw.
    pub client_last_seen_version: Option<Timestamp>,
}

impl From<SyncChangeRequest> for ChunkChange {
    fn from(request: SyncChangeRequest) -> Self {
        Self {
            op: request.op,
            chunk: request.chunk.into(),
            client_last_seen_version: request.client_last_seen_version,
        }
    }
}

/// Body of `POST /sync/chunks`.
#[derive(Debug, Clone, Deserialize, Validate, JsonSchema)]
pub struct SyncRequest {
    /// The change stream, in client order.
    #[validate(length(min = 1, message = "changes must not be empty"))]
    pub changes: Vec<SyncChangeRequest>,
    /// Conflict strategy; the configured default when absent.
    pub strategy: Option<ConflictStrategy>,
    /// Whether changes collapse per chunk before applying.
    #[serde(default)]
    pub batched: bool,
}

impl SyncRequest {
    /// Splits into the service-level change list and options.
    pub fn into_parts(self) -> (Vec<ChunkChange>, SyncOptions) {
        let options = SyncOptions {
            strategy: self.strategy,
            batched: self.batched,
        };
        let changes = self.changes.into_iter().map(ChunkChange::from).collect();
        (changes, options)
    }
}
