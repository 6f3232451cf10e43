//! Hierarchy repository: closure walks.

use std::collections::HashMap;
use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::model::{Chunk, HierarchyRow};
use crate::types::MAX_HIERARCHY_DEPTH;
use crate::{PgConnection, PgError, PgResult, schema};

/// A descendant chunk with its closure bookkeeping.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    /// The chunk.
    pub chunk: Chunk,
    /// Depth below the queried root.
    pub depth: i32,
    /// Id chain from the root to this chunk.
    pub path: String,
}

/// Repository for hierarchy closure reads.
///
/// Closure writes happen inside chunk transactions; this trait covers
/// descendant and ancestor walks over the precomputed rows.
pub trait HierarchyRepository {
    /// Returns the descendants of `root` up to `max_depth` edges away,
    /// ordered by depth then file position.
    ///
    /// `max_depth` beyond the hard cap of 100 is a validation failure; the
    /// root's depth-0 self pair is excluded from the result.
    fn find_descendants(
        &mut self,
        root: Uuid,
        max_depth: Option<i32>,
    ) -> impl Future<Output = PgResult<Vec<HierarchyNode>>> + Send;

    /// Returns the ancestors of a chunk ordered nearest-first.
    fn find_ancestors(
        &mut self,
        chunk_id: Uuid,
    ) -> impl Future<Output = PgResult<Vec<HierarchyRow>>> + Send;
}

impl HierarchyRepository for PgConnection {
    async fn find_descendants(
        &mut self,
        root: Uuid,
        max_depth: Option<i32>,
    ) -> PgResult<Vec<HierarchyNode>> {
        use schema::chunk_hierarchy::{self, dsl};

        let max_depth = match max_depth {
            Some(depth) if depth < 0 => {
                return Err(PgError::validation("max_depth must be non-negative"));
            }
            Some(depth) if depth > MAX_HIERARCHY_DEPTH => {
                return Err(PgError::validation(format!(
                    "max_depth {depth} exceeds the maximum of {MAX_HIERARCHY_DEPTH}"
                )));
            }
            Some(depth) => depth,
            None => MAX_HIERARCHY_DEPTH,
        };

        let rows: Vec<HierarchyRow> = chunk_hierarchy::table
            .filter(dsl::ancestor_id.eq(root))
            .filter(dsl::depth.gt(0))
            .filter(dsl::depth.le(max_depth))
            .order(dsl::depth.asc())
            .select(HierarchyRow::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        if rows.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.descendant_id).collect();
        let chunks: Vec<Chunk> = {
            use schema::chunks::{self, dsl};
            chunks::table
                .filter(dsl::id.eq_any(&ids))
                .select(Chunk::as_select())
                .load(self)
                .await
                .map_err(PgError::from)?
        };

        let mut by_id: HashMap<Uuid, Chunk> = chunks.into_iter().map(|c| (c.id, c)).collect();
        let mut nodes: Vec<HierarchyNode> = rows
            .into_iter()
            .filter_map(|row| {
                by_id.remove(&row.descendant_id).map(|chunk| HierarchyNode {
                    chunk,
                    depth: row.depth,
                    path: row.path,
                })
            })
            .collect();

        nodes.sort_by(|a, b| {
            (a.depth, &a.chunk.file_name, a.chunk.line_start, a.chunk.id).cmp(&(
                b.depth,
                &b.chunk.file_name,
                b.chunk.line_start,
                b.chunk.id,
            ))
        });

        Ok(nodes)
    }

    async fn find_ancestors(&mut self, chunk_id: Uuid) -> PgResult<Vec<HierarchyRow>> {
        use schema::chunk_hierarchy::{self, dsl};

        let rows = chunk_hierarchy::table
            .filter(dsl::descendant_id.eq(chunk_id))
            .filter(dsl::depth.gt(0))
            .order(dsl::depth.asc())
            .select(HierarchyRow::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(rows)
    }
}
