//! Database models for the chunk store.

mod chunk;
mod chunk_tag;
mod hierarchy;
mod search_cache;
mod virtual_document;

pub use chunk::{Chunk, ChunkPosition, NewChunk, ScoredChunk, UpdateChunk};
pub use chunk_tag::{ChunkTag, NewChunkTag};
pub use hierarchy::{HierarchyRow, NewHierarchyRow};
pub use search_cache::{NewSearchCacheEntry, SearchCacheEntry};
pub use virtual_document::{NewVirtualDocument, VirtualDocument};
