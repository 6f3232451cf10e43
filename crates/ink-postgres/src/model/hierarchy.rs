//! Hierarchy closure model.

use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::chunk_hierarchy;
use crate::types::ClosureRow;

/// One precomputed (ancestor, descendant) pair of the parent-edge closure.
///
/// Self pairs exist at depth 0; `path` is the slash-joined id chain from
/// ancestor to descendant inclusive.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chunk_hierarchy)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HierarchyRow {
    /// Ancestor chunk.
    pub ancestor_id: Uuid,
    /// Descendant chunk.
    pub descendant_id: Uuid,
    /// Number of parent edges between the pair.
    pub depth: i32,
    /// Id chain from ancestor to descendant.
    pub path: String,
}

/// Data for inserting a closure row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = chunk_hierarchy)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewHierarchyRow {
    /// Ancestor chunk.
    pub ancestor_id: Uuid,
    /// Descendant chunk.
    pub descendant_id: Uuid,
    /// Number of parent edges between the pair.
    pub depth: i32,
    /// Id chain from ancestor to descendant.
    pub path: String,
}

impl From<ClosureRow> for NewHierarchyRow {
    fn from(row: ClosureRow) -> Self {
        Self {
            ancestor_id: row.ancestor_id,
            descendant_id: row.descendant_id,
            depth: row.depth,
            path: row.path,
        }
    }
}
