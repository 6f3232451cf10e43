//! Chunk repository: CRUD, batch writes and document listings.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use jiff::Timestamp;
use uuid::Uuid;

use crate::model::{Chunk, NewChunk, NewHierarchyRow, UpdateChunk};
use crate::types::{
    DocumentScope, MAX_HIERARCHY_DEPTH, Pagination, SortBy, SortOrder, next_update_timestamp,
};
use crate::{PgConnection, PgError, PgResult, TRACING_TARGET_QUERY, schema};

/// Repository for chunk lifecycle operations.
///
/// Writes synchronise the tag-edge table and the hierarchy closure inside
/// the same transaction as the chunk row, so the store invariants hold at
/// every commit boundary.
pub trait ChunkRepository {
    /// Creates a chunk together with its tag edges and closure rows.
    ///
    /// Returns the stored chunk. Fails with a validation error when the
    /// content is empty, the vector fields disagree, the dimension differs
    /// from `dimensions`, a tag id does not name a tag chunk, or the
    /// resulting hierarchy chain would exceed the depth cap.
    fn create_chunk(
        &mut self,
        new_chunk: NewChunk,
        tags: Vec<Uuid>,
        dimensions: usize,
    ) -> impl Future<Output = PgResult<Chunk>> + Send;

    /// Creates many chunks in one all-or-nothing transaction.
    ///
    /// Returns the stored chunks in input order.
    fn create_chunks(
        &mut self,
        new_chunks: Vec<(NewChunk, Vec<Uuid>)>,
        dimensions: usize,
    ) -> impl Future<Output = PgResult<Vec<Chunk>>> + Send;

    /// Finds a chunk by id.
    fn find_chunk_by_id(
        &mut self,
        chunk_id: Uuid,
    ) -> impl Future<Output = PgResult<Option<Chunk>>> + Send;

    /// Finds many chunks by id; missing ids are silently skipped.
    fn find_chunks_by_ids(
        &mut self,
        chunk_ids: &[Uuid],
    ) -> impl Future<Output = PgResult<Vec<Chunk>>> + Send;

    /// Applies a partial update, bumping `updated_at` for material changes.
    ///
    /// `tags` replaces the chunk's tag set when present. A parent change
    /// reparents the chunk's whole subtree in the closure table.
    fn update_chunk(
        &mut self,
        chunk_id: Uuid,
        patch: UpdateChunk,
        tags: Option<Vec<Uuid>>,
        dimensions: usize,
    ) -> impl Future<Output = PgResult<Chunk>> + Send;

    /// Deletes a chunk and its whole subtree.
    ///
    /// Removes tag edges and closure rows in both directions and returns
    /// the ids of every deleted chunk, the root first.
    fn delete_chunk(&mut self, chunk_id: Uuid)
    -> impl Future<Output = PgResult<Vec<Uuid>>> + Send;

    /// Lists the chunks of a document with a stable order.
    fn list_document_chunks(
        &mut self,
        document_id: &str,
        pagination: Pagination,
        sort_by: SortBy,
        sort_order: SortOrder,
    ) -> impl Future<Output = PgResult<Vec<Chunk>>> + Send;

    /// Counts the chunks of a document.
    fn count_document_chunks(
        &mut self,
        document_id: &str,
    ) -> impl Future<Output = PgResult<i64>> + Send;

    /// Substring search over chunk contents (case-insensitive).
    fn search_chunk_content(
        &mut self,
        needle: &str,
        limit: i64,
    ) -> impl Future<Output = PgResult<Vec<Chunk>>> + Send;

    /// Moves a chunk to a different document id and scope.
    fn set_chunk_document_scope(
        &mut self,
        chunk_id: Uuid,
        document_id: String,
        scope: DocumentScope,
    ) -> impl Future<Output = PgResult<Chunk>> + Send;
}

impl ChunkRepository for PgConnection {
    async fn create_chunk(
        &mut self,
        new_chunk: NewChunk,
        tags: Vec<Uuid>,
        dimensions: usize,
    ) -> PgResult<Chunk> {
        new_chunk.validate(dimensions)?;

        let chunk = self
            .transaction::<_, PgError, _>(|conn| {
                async move {
                    let chunk = insert_chunk_row(conn, &new_chunk).await?;
                    replace_tag_edges(conn, chunk.id, &tags).await?;
                    insert_closure_for_new_chunk(conn, chunk.id, chunk.parent_id).await?;
                    Ok(chunk)
                }
                .scope_boxed()
            })
            .await?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            chunk_id = %chunk.id,
            document_id = %chunk.document_id,
            "Chunk created"
        );

        Ok(chunk)
    }

    async fn create_chunks(
        &mut self,
        new_chunks: Vec<(NewChunk, Vec<Uuid>)>,
        dimensions: usize,
    ) -> PgResult<Vec<Chunk>> {
        if new_chunks.is_empty() {
            return Ok(vec![]);
        }

        for (new_chunk, _) in &new_chunks {
            new_chunk.validate(dimensions)?;
        }

        let chunks = self
            .transaction::<_, PgError, _>(|conn| {
                async move {
                    let mut chunks = Vec::with_capacity(new_chunks.len());
                    for (new_chunk, tags) in &new_chunks {
                        let chunk = insert_chunk_row(conn, new_chunk).await?;
                        replace_tag_edges(conn, chunk.id, tags).await?;
                        chunks.push(chunk);
                    }
                    insert_closure_for_batch(conn, &chunks).await?;
                    Ok(chunks)
                }
                .scope_boxed()
            })
            .await?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            count = chunks.len(),
            "Chunk batch created"
        );

        Ok(chunks)
    }

    async fn find_chunk_by_id(&mut self, chunk_id: Uuid) -> PgResult<Option<Chunk>> {
        use schema::chunks::{self, dsl};

        let chunk = chunks::table
            .filter(dsl::id.eq(chunk_id))
            .select(Chunk::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(chunk)
    }

    async fn find_chunks_by_ids(&mut self, chunk_ids: &[Uuid]) -> PgResult<Vec<Chunk>> {
        use schema::chunks::{self, dsl};

        if chunk_ids.is_empty() {
            return Ok(vec![]);
        }

        let chunks = chunks::table
            .filter(dsl::id.eq_any(chunk_ids))
            .select(Chunk::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(chunks)
    }

    async fn update_chunk(
        &mut self,
        chunk_id: Uuid,
        patch: UpdateChunk,
        tags: Option<Vec<Uuid>>,
        dimensions: usize,
    ) -> PgResult<Chunk> {
        patch.validate(dimensions)?;

        let chunk = self
            .transaction::<_, PgError, _>(|conn| {
                async move {
                    use schema::chunks::{self, dsl};

                    let mut patch = patch;

                    let current: Chunk = chunks::table
                        .filter(dsl::id.eq(chunk_id))
                        .select(Chunk::as_select())
                        .first(conn)
                        .await
                        .optional()
                        .map_err(PgError::from)?
                        .ok_or_else(|| {
                            PgError::validation(format!("chunk {chunk_id} does not exist"))
                        })?;

                    let material = patch.is_material() || tags.is_some();
                    if material {
                        patch.updated_at =
                            Some(next_update_timestamp(current.updated_at.into()).into());
                    }

                    let reparent = match patch.parent_id {
                        Some(new_parent) if new_parent != current.parent_id => Some(new_parent),
                        _ => None,
                    };

                    let chunk = if patch_has_columns(&patch) {
                        diesel::update(chunks::table.filter(dsl::id.eq(chunk_id)))
                            .set(&patch)
                            .returning(Chunk::as_returning())
                            .get_result(conn)
                            .await
                            .map_err(PgError::from)?
                    } else {
                        current
                    };

                    if let Some(tags) = tags {
                        replace_tag_edges(conn, chunk_id, &tags).await?;
                    }

                    if let Some(new_parent) = reparent {
                        reparent_subtree(conn, chunk_id, new_parent).await?;
                    }

                    Ok(chunk)
                }
                .scope_boxed()
            })
            .await?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            chunk_id = %chunk_id,
            "Chunk updated"
        );

        Ok(chunk)
    }

    async fn delete_chunk(&mut self, chunk_id: Uuid) -> PgResult<Vec<Uuid>> {
        let deleted = self
            .transaction::<_, PgError, _>(|conn| {
                async move {
                    use schema::{chunk_hierarchy, chunk_tags, chunks};

                    // the subtree rooted at the chunk, root first
                    let mut subtree: Vec<Uuid> = chunk_hierarchy::table
                        .filter(chunk_hierarchy::ancestor_id.eq(chunk_id))
                        .order(chunk_hierarchy::depth.asc())
                        .select(chunk_hierarchy::descendant_id)
                        .load(conn)
                        .await
                        .map_err(PgError::from)?;

                    if subtree.is_empty() {
                        // no closure rows means the chunk either does not exist
                        // or predates closure maintenance; fall back to the row
                        subtree.push(chunk_id);
                    }

                    diesel::delete(
                        chunk_tags::table.filter(
                            chunk_tags::chunk_id
                                .eq_any(&subtree)
                                .or(chunk_tags::tag_id.eq_any(&subtree)),
                        ),
                    )
                    .execute(conn)
                    .await
                    .map_err(PgError::from)?;

                    diesel::delete(
                        chunk_hierarchy::table.filter(
                            chunk_hierarchy::ancestor_id
                                .eq_any(&subtree)
                                .or(chunk_hierarchy::descendant_id.eq_any(&subtree)),
                        ),
                    )
                    .execute(conn)
                    .await
                    .map_err(PgError::from)?;

                    let affected =
                        diesel::delete(chunks::table.filter(chunks::id.eq_any(&subtree)))
                            .execute(conn)
                            .await
                            .map_err(PgError::from)?;

                    if affected == 0 {
                        subtree.clear();
                    }

                    Ok(subtree)
                }
                .scope_boxed()
            })
            .await?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            chunk_id = %chunk_id,
            cascade_count = deleted.len(),
            "Chunk deleted"
        );

        Ok(deleted)
    }

    async fn list_document_chunks(
        &mut self,
        document_id: &str,
        pagination: Pagination,
        sort_by: SortBy,
        sort_order: SortOrder,
    ) -> PgResult<Vec<Chunk>> {
        use schema::chunks::{self, dsl};

        let mut query = chunks::table
            .filter(dsl::document_id.eq(document_id))
            .select(Chunk::as_select())
            .limit(pagination.limit)
            .offset(pagination.offset)
            .into_boxed();

        query = match (sort_by, sort_order) {
            (SortBy::Position, SortOrder::Asc) => query.order((
                dsl::file_name.asc(),
                dsl::line_start.asc(),
                dsl::char_start.asc(),
                dsl::id.asc(),
            )),
            (SortBy::Position, SortOrder::Desc) => query.order((
                dsl::file_name.desc(),
                dsl::line_start.desc(),
                dsl::char_start.desc(),
                dsl::id.desc(),
            )),
            (SortBy::Created, SortOrder::Asc) => query.order((dsl::created_at.asc(), dsl::id.asc())),
            (SortBy::Created, SortOrder::Desc) => {
                query.order((dsl::created_at.desc(), dsl::id.asc()))
            }
            (SortBy::Updated, SortOrder::Asc) => query.order((dsl::updated_at.asc(), dsl::id.asc())),
            (SortBy::Updated, SortOrder::Desc) => {
                query.order((dsl::updated_at.desc(), dsl::id.asc()))
            }
        };

        let chunks = query.load(self).await.map_err(PgError::from)?;
        Ok(chunks)
    }

    async fn count_document_chunks(&mut self, document_id: &str) -> PgResult<i64> {
        use schema::chunks::{self, dsl};

        let count = chunks::table
            .filter(dsl::document_id.eq(document_id))
            .count()
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(count)
    }

    async fn search_chunk_content(&mut self, needle: &str, limit: i64) -> PgResult<Vec<Chunk>> {
        use schema::chunks::{self, dsl};

        let escaped = needle.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let pattern = format!("%{escaped}%");

        let chunks = chunks::table
            .filter(dsl::content.ilike(pattern))
            .order((dsl::updated_at.desc(), dsl::id.asc()))
            .limit(limit)
            .select(Chunk::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(chunks)
    }

    async fn set_chunk_document_scope(
        &mut self,
        chunk_id: Uuid,
        document_id: String,
        scope: DocumentScope,
    ) -> PgResult<Chunk> {
        use schema::chunks::{self, dsl};

        let now: jiff_diesel::Timestamp = Timestamp::now().into();
        let chunk = diesel::update(chunks::table.filter(dsl::id.eq(chunk_id)))
            .set((
                dsl::document_id.eq(document_id),
                dsl::document_scope.eq(scope),
                dsl::updated_at.eq(now),
            ))
            .returning(Chunk::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(chunk)
    }
}

/// Returns whether applying the changeset would touch any column.
///
/// Diesel rejects an `UPDATE` with an empty `SET` clause, so no-op patches
/// (tag-only or parent-only updates) skip the row update entirely.
fn patch_has_columns(patch: &UpdateChunk) -> bool {
    patch.content.is_some()
        || patch.role.is_some()
        || patch.parent_id.is_some()
        || patch.page_id.is_some()
        || patch.external_ref.is_some()
        || patch.metadata.is_some()
        || patch.file_hash.is_some()
        || patch.embedding.is_some()
        || patch.vector_kind.is_some()
        || patch.vector_model.is_some()
        || patch.file_name.is_some()
        || patch.line_start.is_some()
        || patch.line_end.is_some()
        || patch.char_start.is_some()
        || patch.char_end.is_some()
        || patch.updated_at.is_some()
}

/// Inserts the chunk row itself.
pub(crate) async fn insert_chunk_row(
    conn: &mut PgConnection,
    new_chunk: &NewChunk,
) -> PgResult<Chunk> {
    use schema::chunks;

    diesel::insert_into(chunks::table)
        .values(new_chunk)
        .returning(Chunk::as_returning())
        .get_result(conn)
        .await
        .map_err(PgError::from)
}

/// Replaces the tag edges of a chunk, verifying every target is a tag chunk.
pub(crate) async fn replace_tag_edges(
    conn: &mut PgConnection,
    chunk_id: Uuid,
    tags: &[Uuid],
) -> PgResult<()> {
    use crate::model::NewChunkTag;
    use crate::types::ChunkRole;
    use schema::{chunk_tags, chunks};

    if !tags.is_empty() {
        let tag_count: i64 = chunks::table
            .filter(chunks::id.eq_any(tags))
            .filter(chunks::role.eq(ChunkRole::Tag))
            .count()
            .get_result(conn)
            .await
            .map_err(PgError::from)?;

        if tag_count != tags.len() as i64 {
            return Err(PgError::validation(
                "every tag id must reference an existing tag chunk",
            ));
        }
    }

    diesel::delete(chunk_tags::table.filter(chunk_tags::chunk_id.eq(chunk_id)))
        .execute(conn)
        .await
        .map_err(PgError::from)?;

    if tags.is_empty() {
        return Ok(());
    }

    let edges: Vec<NewChunkTag> = tags
        .iter()
        .map(|&tag_id| NewChunkTag { chunk_id, tag_id })
        .collect();

    diesel::insert_into(chunk_tags::table)
        .values(&edges)
        .on_conflict_do_nothing()
        .execute(conn)
        .await
        .map_err(PgError::from)?;

    Ok(())
}

/// Inserts the closure rows for a freshly created chunk.
///
/// The new chunk gets its self pair plus one row per ancestor of the
/// parent; the chain depth is validated against the hard cap.
pub(crate) async fn insert_closure_for_new_chunk(
    conn: &mut PgConnection,
    chunk_id: Uuid,
    parent_id: Option<Uuid>,
) -> PgResult<()> {
    use crate::model::HierarchyRow;
    use schema::chunk_hierarchy;

    let mut rows = vec![NewHierarchyRow {
        ancestor_id: chunk_id,
        descendant_id: chunk_id,
        depth: 0,
        path: chunk_id.to_string(),
    }];

    if let Some(parent_id) = parent_id {
        let ancestor_rows: Vec<HierarchyRow> = chunk_hierarchy::table
            .filter(chunk_hierarchy::descendant_id.eq(parent_id))
            .select(HierarchyRow::as_select())
            .load(conn)
            .await
            .map_err(PgError::from)?;

        if ancestor_rows.is_empty() {
            return Err(PgError::validation(format!(
                "parent chunk {parent_id} does not exist"
            )));
        }

        for ancestor in &ancestor_rows {
            let depth = ancestor.depth + 1;
            if depth > MAX_HIERARCHY_DEPTH {
                return Err(PgError::validation(format!(
                    "hierarchy depth {depth} exceeds the maximum of {MAX_HIERARCHY_DEPTH}"
                )));
            }
            rows.push(NewHierarchyRow {
                ancestor_id: ancestor.ancestor_id,
                descendant_id: chunk_id,
                depth,
                path: format!("{}/{}", ancestor.path, chunk_id),
            });
        }
    }

    diesel::insert_into(chunk_hierarchy::table)
        .values(&rows)
        .execute(conn)
        .await
        .map_err(PgError::from)?;

    Ok(())
}

/// Inserts the closure rows for a batch of freshly created chunks.
///
/// Parent edges between batch members form a forest whose closure is
/// computed in one pass; members whose parent lives outside the batch are
/// then linked through that parent's stored ancestor chain.
pub(crate) async fn insert_closure_for_batch(
    conn: &mut PgConnection,
    chunks: &[Chunk],
) -> PgResult<()> {
    use std::collections::{HashMap, HashSet};

    use crate::model::HierarchyRow;
    use crate::types::{build_closure, subtree_depth};
    use schema::chunk_hierarchy;

    if chunks.is_empty() {
        return Ok(());
    }

    let batch_ids: HashSet<Uuid> = chunks.iter().map(|c| c.id).collect();

    // parents outside the batch make their chunk a root of the batch forest
    let edges: HashMap<Uuid, Option<Uuid>> = chunks
        .iter()
        .map(|chunk| {
            let in_batch_parent = chunk.parent_id.filter(|p| batch_ids.contains(p));
            (chunk.id, in_batch_parent)
        })
        .collect();

    let closure = build_closure(&edges, MAX_HIERARCHY_DEPTH)
        .map_err(|e| PgError::validation(e.to_string()))?;

    let mut rows: Vec<NewHierarchyRow> =
        closure.iter().cloned().map(NewHierarchyRow::from).collect();

    // link batch roots whose parent is stored outside the batch
    for chunk in chunks {
        let Some(parent_id) = chunk.parent_id else {
            continue;
        };
        if batch_ids.contains(&parent_id) {
            continue;
        }

        let ancestor_rows: Vec<HierarchyRow> = chunk_hierarchy::table
            .filter(chunk_hierarchy::descendant_id.eq(parent_id))
            .select(HierarchyRow::as_select())
            .load(conn)
            .await
            .map_err(PgError::from)?;

        if ancestor_rows.is_empty() {
            return Err(PgError::validation(format!(
                "parent chunk {parent_id} does not exist"
            )));
        }

        let max_ancestor_depth = ancestor_rows.iter().map(|r| r.depth).max().unwrap_or(0);
        let chain_depth = max_ancestor_depth + 1 + subtree_depth(&closure, chunk.id);
        if chain_depth > MAX_HIERARCHY_DEPTH {
            return Err(PgError::validation(format!(
                "hierarchy depth {chain_depth} exceeds the maximum of {MAX_HIERARCHY_DEPTH}"
            )));
        }

        for ancestor in &ancestor_rows {
            for member in closure.iter().filter(|r| r.ancestor_id == chunk.id) {
                rows.push(NewHierarchyRow {
                    ancestor_id: ancestor.ancestor_id,
                    descendant_id: member.descendant_id,
                    depth: ancestor.depth + 1 + member.depth,
                    path: format!("{}/{}", ancestor.path, member.path),
                });
            }
        }
    }

    diesel::insert_into(chunk_hierarchy::table)
        .values(&rows)
        .execute(conn)
        .await
        .map_err(PgError::from)?;

    Ok(())
}

/// Reparents a chunk's subtree under a new parent.
///
/// Deletes the closure rows linking the subtree to outside ancestors and
/// re-links every subtree member through the new parent's ancestor chain,
/// rejecting cycles and over-deep chains.
pub(crate) async fn reparent_subtree(
    conn: &mut PgConnection,
    chunk_id: Uuid,
    new_parent: Option<Uuid>,
) -> PgResult<()> {
    use crate::model::HierarchyRow;
    use schema::chunk_hierarchy;

    // subtree rows relative to the moved chunk (includes the self pair)
    let subtree_rows: Vec<HierarchyRow> = chunk_hierarchy::table
        .filter(chunk_hierarchy::ancestor_id.eq(chunk_id))
        .select(HierarchyRow::as_select())
        .load(conn)
        .await
        .map_err(PgError::from)?;

    let subtree_ids: Vec<Uuid> = subtree_rows.iter().map(|r| r.descendant_id).collect();
    let subtree_depth = subtree_rows.iter().map(|r| r.depth).max().unwrap_or(0);

    if let Some(new_parent) = new_parent {
        if subtree_ids.contains(&new_parent) {
            return Err(PgError::validation(
                "cannot reparent a chunk under its own descendant",
            ));
        }
    }

    // drop links from outside ancestors into the subtree
    diesel::delete(
        chunk_hierarchy::table
            .filter(chunk_hierarchy::descendant_id.eq_any(&subtree_ids))
            .filter(chunk_hierarchy::ancestor_id.ne_all(&subtree_ids)),
    )
    .execute(conn)
    .await
    .map_err(PgError::from)?;

    let Some(new_parent) = new_parent else {
        return Ok(());
    };

    let ancestor_rows: Vec<HierarchyRow> = chunk_hierarchy::table
        .filter(chunk_hierarchy::descendant_id.eq(new_parent))
        .select(HierarchyRow::as_select())
        .load(conn)
        .await
        .map_err(PgError::from)?;

    if ancestor_rows.is_empty() {
        return Err(PgError::validation(format!(
            "parent chunk {new_parent} does not exist"
        )));
    }

    let max_ancestor_depth = ancestor_rows.iter().map(|r| r.depth).max().unwrap_or(0);
    let total_depth = max_ancestor_depth + 1 + subtree_depth;
    if total_depth > MAX_HIERARCHY_DEPTH {
        return Err(PgError::validation(format!(
            "hierarchy depth {total_depth} exceeds the maximum of {MAX_HIERARCHY_DEPTH}"
        )));
    }

    let mut new_rows = Vec::with_capacity(ancestor_rows.len() * subtree_rows.len());
    for ancestor in &ancestor_rows {
        for member in &subtree_rows {
            new_rows.push(NewHierarchyRow {
                ancestor_id: ancestor.ancestor_id,
                descendant_id: member.descendant_id,
                depth: ancestor.depth + 1 + member.depth,
                path: format!("{}/{}", ancestor.path, member.path),
            });
        }
    }

    diesel::insert_into(chunk_hierarchy::table)
        .values(&new_rows)
        .execute(conn)
        .await
        .map_err(PgError::from)?;

    Ok(())
}
