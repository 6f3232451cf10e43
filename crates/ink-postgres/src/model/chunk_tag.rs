//! Tag edge model.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use crate::schema::chunk_tags;

/// A directed edge from a content chunk to a tag chunk.
///
/// The edge table and the rendered tags-set of a chunk are kept in
/// bijective agreement inside the same transaction as every chunk mutation.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chunk_tags)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChunkTag {
    /// Source chunk.
    pub chunk_id: Uuid,
    /// Referenced tag chunk.
    pub tag_id: Uuid,
    /// When the edge was created.
    pub created_at: Timestamp,
}

/// Data for inserting a tag edge.
#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = chunk_tags)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewChunkTag {
    /// Source chunk.
    pub chunk_id: Uuid,
    /// Referenced tag chunk.
    pub tag_id: Uuid,
}
