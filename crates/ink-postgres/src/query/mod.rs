//! Repository traits implemented on the pooled database connection.
//!
//! Every trait is implemented for [`PgConnection`] so a checked-out
//! [`PgConn`] can call any repository method directly. Multi-step writes
//! (chunk + tag edges + hierarchy closure) run inside a single transaction
//! owned by the repository method.
//!
//! [`PgConnection`]: crate::PgConnection
//! [`PgConn`]: crate::PgConn

mod cache;
mod chunk;
mod hierarchy;
mod tag;
mod vector;
mod virtual_document;

pub use cache::SearchCacheRepository;
pub use chunk::ChunkRepository;
pub use hierarchy::{HierarchyNode, HierarchyRepository};
pub use tag::{TagLogic, TagRepository};
pub use vector::VectorSearchRepository;
pub use virtual_document::VirtualDocumentRepository;
