//! Response DTOs for the HTTP facade.

mod chunks;
mod documents;
mod error_response;
mod health;
mod media;
mod search;

pub use chunks::{ChunkIds, ChunkResponse, PositionResponse};
pub use documents::{DocumentChunksResponse, HierarchyChunkResponse, VirtualDocumentResponse};
pub use error_response::{ErrorBody, ErrorResponse};
pub use health::{ComponentHealth, HealthResponse};
pub use media::{BatchAccepted, DuplicateGroupResponse, FindDuplicatesResponse, UploadResponse};
pub use search::{SearchResponse, SearchResultResponse};
