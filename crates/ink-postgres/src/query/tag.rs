//! Tag repository: edge listings and tag-membership search.

use std::collections::HashMap;
use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Chunk, ChunkTag};
use crate::{PgConnection, PgError, PgResult, schema};

/// Combinator for multi-tag membership queries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagLogic {
    /// Chunks carrying every listed tag.
    And,
    /// Chunks carrying any listed tag.
    #[default]
    Or,
}

/// Repository for tag-edge reads and tag-membership search.
///
/// Edge writes happen inside chunk transactions (see
/// [`ChunkRepository`]); this trait covers the read side.
///
/// [`ChunkRepository`]: crate::query::ChunkRepository
pub trait TagRepository {
    /// Lists the tag ids of a single chunk.
    fn list_chunk_tags(
        &mut self,
        chunk_id: Uuid,
    ) -> impl Future<Output = PgResult<Vec<Uuid>>> + Send;

    /// Lists the tag edges of many chunks, keyed by source chunk.
    fn list_tags_for_chunks(
        &mut self,
        chunk_ids: &[Uuid],
    ) -> impl Future<Output = PgResult<HashMap<Uuid, Vec<Uuid>>>> + Send;

    /// Returns the chunks whose tag set satisfies the predicate,
    /// ordered by `updated_at` descending then id ascending.
    fn find_chunks_by_tags(
        &mut self,
        tag_ids: &[Uuid],
        logic: TagLogic,
    ) -> impl Future<Output = PgResult<Vec<Chunk>>> + Send;
}

impl TagRepository for PgConnection {
    async fn list_chunk_tags(&mut self, chunk_id: Uuid) -> PgResult<Vec<Uuid>> {
        use schema::chunk_tags::{self, dsl};

        let tags = chunk_tags::table
            .filter(dsl::chunk_id.eq(chunk_id))
            .order(dsl::tag_id.asc())
            .select(dsl::tag_id)
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(tags)
    }

    async fn list_tags_for_chunks(
        &mut self,
        chunk_ids: &[Uuid],
    ) -> PgResult<HashMap<Uuid, Vec<Uuid>>> {
        use schema::chunk_tags::{self, dsl};

        if chunk_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let edges: Vec<ChunkTag> = chunk_tags::table
            .filter(dsl::chunk_id.eq_any(chunk_ids))
            .order((dsl::chunk_id.asc(), dsl::tag_id.asc()))
            .select(ChunkTag::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        let mut by_chunk: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for edge in edges {
            by_chunk.entry(edge.chunk_id).or_default().push(edge.tag_id);
        }

        Ok(by_chunk)
    }

    async fn find_chunks_by_tags(
        &mut self,
        tag_ids: &[Uuid],
        logic: TagLogic,
    ) -> PgResult<Vec<Chunk>> {
        use diesel::dsl::count_star;
        use schema::chunk_tags;
        use schema::chunks::{self, dsl};

        if tag_ids.is_empty() {
            return Ok(vec![]);
        }

        let matching_ids: Vec<Uuid> = match logic {
            TagLogic::Or => chunk_tags::table
                .filter(chunk_tags::tag_id.eq_any(tag_ids))
                .select(chunk_tags::chunk_id)
                .distinct()
                .load(self)
                .await
                .map_err(PgError::from)?,
            TagLogic::And => chunk_tags::table
                .filter(chunk_tags::tag_id.eq_any(tag_ids))
                .group_by(chunk_tags::chunk_id)
                .having(count_star().eq(tag_ids.len() as i64))
                .select(chunk_tags::chunk_id)
                .load(self)
                .await
                .map_err(PgError::from)?,
        };

        if matching_ids.is_empty() {
            return Ok(vec![]);
        }

        let chunks = chunks::table
            .filter(dsl::id.eq_any(&matching_ids))
            .order((dsl::updated_at.desc(), dsl::id.asc()))
            .select(Chunk::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(chunks)
    }
}
