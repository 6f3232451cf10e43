//! Domain services of the gateway.

mod batch;
mod cache;
mod config;
mod error;
mod events;
mod fingerprint;
mod ingest;
mod retrieval;
mod state;
mod sync;

pub use batch::{
    BatchError, BatchItem, BatchJob, BatchOptions, BatchScheduler, BatchUnitResult,
};
pub use cache::{CachedResults, SearchCache, WriteDomain};
pub use config::{BatchConfig, CacheConfig, ServerConfig, ServiceConfig, SyncConfig};
pub use error::{ServiceError, ServiceResult};
pub use events::{EventBus, GatewayEvent, IngestedKind};
pub use ingest::{IngestOutcome, IngestPipeline, MediaIngest, TextIngest};
pub use retrieval::{
    DuplicateGroup, ImageReference, MatchType, RetrievalEngine, SearchFilters, SearchHit,
    SearchKind, SlideRequest,
};
pub use state::{AiPorts, ServiceState};
pub use sync::{
    ChunkChange, SyncChunk, SyncConflict, SyncCore, SyncItemError, SyncOp, SyncOptions,
    SyncReport,
};
