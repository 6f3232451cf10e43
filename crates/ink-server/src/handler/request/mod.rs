//! Request DTOs for the HTTP facade.

mod chunks;
mod documents;
mod media;
mod paths;
mod search;
mod sync;

pub use chunks::{BatchCreateChunks, ChangeDocumentScope, CreateChunk, UpdateChunkRequest};
pub use paths::{BatchPathParams, ChunkPathParams, DocumentPathParams};
pub use documents::{CreateVirtualDocument, DocumentChunksQuery};
pub use media::{
    BatchFileRequest, BatchMediaRequest, FindDuplicatesRequest, RecommendSlidesRequest,
    UploadMediaRequest,
};
pub use search::{
    DateRange, HierarchyQuery, MultimodalSearch, SearchFiltersRequest, SimilarQuery,
    TagSearchRequest, Weights,
};
pub use sync::{SyncChangeRequest, SyncChunkRequest, SyncRequest};
