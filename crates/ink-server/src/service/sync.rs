//! Sync core: reconciles client change streams with the store.

use std::collections::HashMap;
use std::time::Instant;

use ink_postgres::model::{Chunk, NewChunk, UpdateChunk};
use ink_postgres::query::{ChunkRepository, TagRepository};
use ink_postgres::types::{ConflictStrategy, MetadataView};
use ink_postgres::PgClient;
use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cache::{SearchCache, WriteDomain};
use super::{EventBus, GatewayEvent, ServiceError, ServiceResult, SyncConfig};

/// Tracing target for sync operations.
const TRACING_TARGET: &str = "ink_server::service::sync";

/// Separator inserted between remote and local contents on merge.
const MERGE_SEPARATOR: &str = "\n---\n";

/// A single change submitted by an editor client.
#[derive(Debug, Clone)]
pub struct ChunkChange {
    /// The operation.
    pub op: SyncOp,
    /// The client's view of the chunk.
    pub chunk: SyncChunk,
    /// The server version the client last saw, for conflict detection.
    pub client_last_seen_version: Option<Timestamp>,
}

/// Sync operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SyncOp {
    /// Create a new chunk.
    Create,
    /// Update an existing chunk.
    Update,
    /// Delete a chunk (cascades).
    Delete,
}

/// The client-side representation of a chunk in a change record.
#[derive(Debug, Clone, Default)]
pub struct SyncChunk {
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

/// A surfaced conflict carrying both versions.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SyncConflict {
    /// The contested chunk.
    pub chunk_id: Uuid,
    /// The strategy that produced (or parked) this conflict.
    pub strategy: ConflictStrategy,
    /// Server-side content at conflict time.
    pub server_content: String,
    /// Client-side content at conflict time.
    pub client_content: Option<String>,
    /// Server-side version at conflict time.
    pub server_version: Timestamp,
}

/// A per-change failure.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SyncItemError {
    /// The affected chunk, when known.
    pub chunk_id: Option<Uuid>,
    /// Failure description.
    pub message: String,
}

/// Result of applying a change stream.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SyncReport {
    /// Whether every change applied without error.
    pub success: bool,
    /// Number of changes applied.
    pub synced_count: usize,
    /// Per-change failures.
    pub errors: Vec<SyncItemError>,
    /// Conflicts surfaced to the client.
    pub conflicts: Vec<SyncConflict>,
    /// Wall-clock duration of the apply.
    pub duration_ms: u64,
}

/// Options of one sync submission.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Conflict strategy; the configured default when absent.
    pub strategy: Option<ConflictStrategy>,
    /// Batched mode groups changes by chunk id, last write wins.
    pub batched: bool,
}

/// The sync core.
#[derive(Clone)]
pub struct SyncCore {
    pg: PgClient,
    config: SyncConfig,
    events: EventBus,
    cache: SearchCache,
}

impl SyncCore {
    /// Creates the sync core.
    pub fn new(pg: PgClient, config: SyncConfig, events: EventBus, cache: SearchCache) -> Self {
        Self {
            pg,
            config,
            events,
            cache,
        }
    }

    /// Applies a stream of changes.
    ///
    /// Real-time mode applies changes in submission order; batched mode
    /// first collapses the stream per chunk id (last write wins) so a
    /// burst of edits to one chunk costs one store write.
    #[tracing::instrument(skip_all, fields(changes = changes.len(), batched = options.batched))]
    pub async fn apply_changes(
        &self,
        changes: Vec<ChunkChange>,
        options: SyncOptions,
    ) -> ServiceResult<SyncReport> {
        let started = Instant::now();
        let strategy = options.strategy.unwrap_or(self.config.default_strategy);

        let changes = if options.batched {
            collapse_by_chunk(changes)
        } else {
            changes
        };

        let mut synced_count = 0;
        let mut errors = Vec::new();
        let mut conflicts = Vec::new();

        for change in changes {
            let chunk_id = change.chunk.id;
            match self.apply_change(change, strategy).await {
                Ok(Some(conflict)) => conflicts.push(conflict),
                Ok(None) => synced_count += 1,
                Err(error) => errors.push(SyncItemError {
                    chunk_id,
                    message: error.to_string(),
                }),
            }
        }

        let report = SyncReport {
            success: errors.is_empty(),
            synced_count,
            errors,
            conflicts,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            target: TRACING_TARGET,
            synced = report.synced_count,
            errors = report.errors.len(),
            conflicts = report.conflicts.len(),
            duration_ms = report.duration_ms,
            "Sync batch applied"
        );

        Ok(report)
    }

    /// Applies one change; returns a conflict when one was surfaced.
    async fn apply_change(
        &self,
        change: ChunkChange,
        strategy: ConflictStrategy,
    ) -> ServiceResult<Option<SyncConflict>> {
        match change.op {
            SyncOp::Create => {
                self.apply_create(change.chunk).await?;
                Ok(None)
            }
            SyncOp::Update => self.apply_update(change, strategy).await,
            SyncOp::Delete => {
                let chunk_id = change
                    .chunk
                    .id
                    .ok_or_else(|| ServiceError::validation("delete requires a chunk id"))?;
                self.apply_delete(chunk_id).await?;
                Ok(None)
            }
        }
    }

    async fn apply_create(&self, chunk: SyncChunk) -> ServiceResult<Chunk> {
        let content = chunk
            .content
            .ok_or_else(|| ServiceError::validation("create requires content"))?;
        let tags = chunk.tags.unwrap_or_default();

        let document_id = match (chunk.page, chunk.file_name.as_deref()) {
            (Some(page), _) => page.to_string(),
            (None, Some(file_name)) => ink_postgres::types::file_document_id(file_name),
            (None, None) => ink_postgres::types::file_document_id("unfiled"),
        };

        let mut new_chunk = NewChunk::new(content, document_id);
        if let Some(id) = chunk.id {
            new_chunk.id = id;
        }
        new_chunk.parent_id = chunk.parent;
        new_chunk.page_id = chunk.page;
        if let Some(metadata) = chunk.metadata {
            new_chunk.metadata = MetadataView::new(metadata).into_value();
        }
        new_chunk.file_name = chunk.file_name;
        new_chunk.line_start = chunk.line_start;
        new_chunk.line_end = chunk.line_end;

        let domain = WriteDomain {
            tags: tags.clone(),
            page: new_chunk.page_id,
            kind: None,
        };

        let mut conn = self.pg.get_connection().await?;
        let stored = conn
            .create_chunk(new_chunk, tags, self.pg.vector_dimensions())
            .await?;
        drop(conn);

        self.cache.invalidate_for_write(&domain).await?;
        self.events.publish(GatewayEvent::Synced { chunk_id: stored.id });

        Ok(stored)
    }

    async fn apply_update(
        &self,
        change: ChunkChange,
        strategy: ConflictStrategy,
    ) -> ServiceResult<Option<SyncConflict>> {
        let chunk_id = change
            .chunk
            .id
            .ok_or_else(|| ServiceError::validation("update requires a chunk id"))?;

        let mut conn = self.pg.get_connection().await?;
        let current = conn
            .find_chunk_by_id(chunk_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("chunk", chunk_id))?;
        let current_tags = conn.list_chunk_tags(chunk_id).await?;
        drop(conn);

        let local = change.chunk;
        let server_version: Timestamp = current.updated_at.into();

        let conflicted = change
            .client_last_seen_version
            .is_some_and(|seen| server_version > seen)
            && has_conflicting_fields(&current, &current_tags, &local);

        if conflicted {
            match strategy {
                ConflictStrategy::Manual => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        chunk_id = %chunk_id,
                        "Conflict parked for manual resolution"
                    );
                    return Ok(Some(SyncConflict {
                        chunk_id,
                        strategy,
                        server_content: current.content,
                        client_content: local.content,
                        server_version,
                    }));
                }
                ConflictStrategy::RemoteWins => {
                    // client change dropped; report the server state back
                    return Ok(Some(SyncConflict {
                        chunk_id,
                        strategy,
                        server_content: current.content,
                        client_content: local.content,
                        server_version,
                    }));
                }
                ConflictStrategy::LocalWins => {
                    self.write_update(&current, &current_tags, local, None).await?;
                    return Ok(None);
                }
                ConflictStrategy::Merge => {
                    let merged = merge_change(&current, &current_tags, &local);
                    self.write_update(&current, &current_tags, local, Some(merged))
                        .await?;
                    return Ok(None);
                }
            }
        }

        self.write_update(&current, &current_tags, local, None).await?;
        Ok(None)
    }

    /// Writes an update, either the client's fields verbatim or the merge
    /// resolution computed from both sides.
    async fn write_update(
        &self,
        current: &Chunk,
        current_tags: &[Uuid],
        local: SyncChunk,
        merged: Option<MergedChange>,
    ) -> ServiceResult<()> {
        let (patch, tags) = match merged {
            Some(merged) => (merged.patch, Some(merged.tags)),
            None => {
                let mut patch = UpdateChunk::default();
                if let Some(content) = local.content {
                    patch.content = Some(content);
                }
                if local.parent != current.parent_id {
                    patch.parent_id = Some(local.parent);
                }
                if let Some(metadata) = local.metadata {
                    patch.metadata = Some(MetadataView::new(metadata).into_value());
                }
                if local.file_name.is_some() {
                    patch.file_name = Some(local.file_name);
                    patch.line_start = Some(local.line_start);
                    patch.line_end = Some(local.line_end);
                }
                (patch, local.tags)
            }
        };

        let domain = WriteDomain {
            tags: tags.clone().unwrap_or_else(|| current_tags.to_vec()),
            page: current.page_id,
            kind: current.vector_kind,
        };

        let mut conn = self.pg.get_connection().await?;
        conn.update_chunk(current.id, patch, tags, self.pg.vector_dimensions())
            .await?;
        drop(conn);

        self.cache.invalidate_for_write(&domain).await?;
        self.events.publish(GatewayEvent::Synced { chunk_id: current.id });

        Ok(())
    }

    async fn apply_delete(&self, chunk_id: Uuid) -> ServiceResult<()> {
        let mut conn = self.pg.get_connection().await?;
        let deleted = conn.delete_chunk(chunk_id).await?;
        drop(conn);

        if deleted.is_empty() {
            return Err(ServiceError::not_found("chunk", chunk_id));
        }

        // deletes can touch anything reachable, so invalidate broadly
        self.cache.invalidate_for_write(&WriteDomain::default()).await?;
        self.events.publish(GatewayEvent::Deleted { chunk_ids: deleted });

        Ok(())
    }
}

/// The outcome of a merge resolution.
struct MergedChange {
    patch: UpdateChunk,
    tags: Vec<Uuid>,
}

/// Merge strategy: contents concatenated with a separator, tags unioned,
/// metadata shallow-merged with the remote as base and the local overlay
/// winning, positions taken from local.
fn merge_change(current: &Chunk, current_tags: &[Uuid], local: &SyncChunk) -> MergedChange {
    let mut patch = UpdateChunk::default();

    if let Some(local_content) = &local.content {
        if *local_content != current.content {
            patch.content = Some(format!(
                "{}{}{}",
                current.content, MERGE_SEPARATOR, local_content
            ));
        }
    }

    let mut tags: Vec<Uuid> = current_tags.to_vec();
    if let Some(local_tags) = &local.tags {
        for tag in local_tags {
            if !tags.contains(tag) {
                tags.push(*tag);
            }
        }
    }

    if let Some(local_metadata) = &local.metadata {
        let mut merged = MetadataView::new(current.metadata.clone());
        merged.merge_overlay(&MetadataView::new(local_metadata.clone()));
        patch.metadata = Some(merged.into_value());
    }

    if local.file_name.is_some() {
        patch.file_name = Some(local.file_name.clone());
        patch.line_start = Some(local.line_start);
        patch.line_end = Some(local.line_end);
    }

    MergedChange { patch, tags }
}

/// Returns whether the client change actually contests any server field.
fn has_conflicting_fields(current: &Chunk, current_tags: &[Uuid], local: &SyncChunk) -> bool {
    if local
        .content
        .as_ref()
        .is_some_and(|content| *content != current.content)
    {
        return true;
    }

    if local.tags.as_ref().is_some_and(|tags| {
        let mut sorted = tags.clone();
        sorted.sort();
        let mut current = current_tags.to_vec();
        current.sort();
        sorted != current
    }) {
        return true;
    }

    if local
        .metadata
        .as_ref()
        .is_some_and(|metadata| *metadata != current.metadata)
    {
        return true;
    }

    false
}

/// Collapses a change stream per chunk id, last write winning.
///
/// Changes without an id (creates) are kept in order; the relative order
/// of surviving changes follows their last occurrence.
fn collapse_by_chunk(changes: Vec<ChunkChange>) -> Vec<ChunkChange> {
    let mut collapsed: Vec<ChunkChange> = Vec::with_capacity(changes.len());
    let mut last_position: HashMap<Uuid, usize> = HashMap::new();

    for change in changes {
        match change.chunk.id {
            Some(id) => {
                if let Some(&at) = last_position.get(&id) {
                    collapsed[at] = change;
                } else {
                    last_position.insert(id, collapsed.len());
                    collapsed.push(change);
                }
            }
            None => collapsed.push(change),
        }
    }

    collapsed
}

#[cfg(test)]
mod tests {
    use ink_postgres::types::{ChunkRole, DocumentScope};
    use serde_json::json;

    use super::*;

    fn server_chunk(content: &str) -> Chunk {
        Chunk {
            id: Uuid::now_v7(),
            content: content.into(),
            role: ChunkRole::Content,
            parent_id: None,
            page_id: None,
            external_ref: None,
            document_id: "file:test".into(),
            document_scope: DocumentScope::File,
            metadata: json!({"shared": "remote", "remote_only": 1}),
            file_hash: None,
            embedding: None,
            vector_kind: None,
            vector_model: None,
            file_name: None,
            line_start: None,
            line_end: None,
            char_start: None,
            char_end: None,
            created_at: Timestamp::now().into(),
            updated_at: Timestamp::now().into(),
        }
    }

    #[test]
    fn merge_concatenates_contents_and_unions_tags() {
        let current = server_chunk("REMOTE");
        let tag_a = Uuid::now_v7();
        let tag_b = Uuid::now_v7();
        let local = SyncChunk {
            id: Some(current.id),
            content: Some("LOCAL".into()),
            tags: Some(vec![tag_b]),
            metadata: Some(json!({"shared": "local", "local_only": 2})),
            ..Default::default()
        };

        let merged = merge_change(&current, &[tag_a], &local);

        let content = merged.patch.content.unwrap();
        assert!(content.contains("REMOTE"));
        assert!(content.contains("LOCAL"));
        assert!(content.contains(MERGE_SEPARATOR.trim()));

        assert_eq!(merged.tags, vec![tag_a, tag_b]);

        let metadata = merged.patch.metadata.unwrap();
        assert_eq!(metadata["shared"], "local");
        assert_eq!(metadata["remote_only"], 1);
        assert_eq!(metadata["local_only"], 2);
    }

    #[test]
    fn merge_skips_identical_content() {
        let current = server_chunk("same");
        let local = SyncChunk {
            id: Some(current.id),
            content: Some("same".into()),
            ..Default::default()
        };

        let merged = merge_change(&current, &[], &local);
        assert!(merged.patch.content.is_none());
    }

    #[test]
    fn conflict_detection_ignores_equal_fields() {
        let current = server_chunk("hello");
        let same = SyncChunk {
            id: Some(current.id),
            content: Some("hello".into()),
            ..Default::default()
        };
        assert!(!has_conflicting_fields(&current, &[], &same));

        let differs = SyncChunk {
            id: Some(current.id),
            content: Some("changed".into()),
            ..Default::default()
        };
        assert!(has_conflicting_fields(&current, &[], &differs));
    }

    #[test]
    fn tag_order_does_not_conflict() {
        let current = server_chunk("hello");
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let local = SyncChunk {
            id: Some(current.id),
            tags: Some(vec![b, a]),
            ..Default::default()
        };

        assert!(!has_conflicting_fields(&current, &[a, b], &local));
    }

    #[test]
    fn batched_mode_collapses_per_chunk() {
        let id = Uuid::now_v7();
        let make = |content: &str| ChunkChange {
            op: SyncOp::Update,
            chunk: SyncChunk {
                id: Some(id),
                content: Some(content.into()),
                ..Default::default()
            },
            client_last_seen_version: None,
        };

        let collapsed = collapse_by_chunk(vec![make("first"), make("second"), make("third")]);

        assert_eq!(collapsed.len(), 1);
        assert_eq!(collapsed[0].chunk.content.as_deref(), Some("third"));
    }

    #[test]
    fn creates_without_ids_survive_collapsing() {
        let create = ChunkChange {
            op: SyncOp::Create,
            chunk: SyncChunk {
                content: Some("new".into()),
                ..Default::default()
            },
            client_last_seen_version: None,
        };

        let collapsed = collapse_by_chunk(vec![create.clone(), create]);
        assert_eq!(collapsed.len(), 2);
    }
}
