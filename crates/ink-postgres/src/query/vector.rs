//! Vector search repository: cosine ANN and hybrid fusion.

use std::collections::HashMap;
use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pgvector::Vector;
use uuid::Uuid;

use crate::model::{Chunk, ScoredChunk};
use crate::types::VectorKind;
use crate::{PgConnection, PgError, PgResult, schema};

/// Oversampling factor applied to the per-side fetches of a hybrid search
/// so fusion has enough candidates after deduplication.
const HYBRID_OVERSAMPLE: i64 = 4;

/// Repository for approximate-nearest-neighbour search over embeddings.
pub trait VectorSearchRepository {
    /// Cosine ANN over chunks of the given vector kind.
    ///
    /// Results carry `score = 1 - cosine_distance`, are filtered by
    /// `min_similarity`, and tie-break by `updated_at` descending then id
    /// ascending. `kind = None` searches both partitions.
    fn search_similar(
        &mut self,
        query: Vector,
        kind: Option<VectorKind>,
        limit: i64,
        min_similarity: f64,
    ) -> impl Future<Output = PgResult<Vec<ScoredChunk>>> + Send;

    /// Weighted union of per-kind ANN results.
    ///
    /// Evaluates text and image ANN separately, deduplicates by chunk id
    /// taking the maximum per side, scores each survivor as
    /// `w_text * sim_text + w_image * sim_image` and orders by score
    /// descending with the deterministic tie-break.
    fn hybrid_search(
        &mut self,
        text_query: Option<Vector>,
        image_query: Option<Vector>,
        text_weight: f64,
        image_weight: f64,
        limit: i64,
        min_similarity: f64,
    ) -> impl Future<Output = PgResult<Vec<ScoredChunk>>> + Send;

    /// Finds image chunks whose blob carries the given content hash.
    fn find_chunks_by_file_hash(
        &mut self,
        file_hash: &str,
    ) -> impl Future<Output = PgResult<Vec<Chunk>>> + Send;

    /// Lists chunks of the given kind that carry an embedding, oldest first.
    fn list_embedded_chunks(
        &mut self,
        kind: VectorKind,
        limit: i64,
    ) -> impl Future<Output = PgResult<Vec<Chunk>>> + Send;
}

impl VectorSearchRepository for PgConnection {
    async fn search_similar(
        &mut self,
        query: Vector,
        kind: Option<VectorKind>,
        limit: i64,
        min_similarity: f64,
    ) -> PgResult<Vec<ScoredChunk>> {
        use diesel::sql_types::Double;
        use pgvector::VectorExpressionMethods;
        use schema::chunks::{self, dsl};

        // score = 1 - distance, so a similarity floor is a distance ceiling
        let max_distance = 1.0 - min_similarity;

        let mut sql = chunks::table
            .select((
                Chunk::as_select(),
                (1.0.into_sql::<Double>()
                    - dsl::embedding.assume_not_null().cosine_distance(&query)),
            ))
            .into_boxed();

        sql = sql
            .filter(dsl::embedding.is_not_null())
            .filter(
                dsl::embedding
                    .assume_not_null()
                    .cosine_distance(&query)
                    .le(max_distance),
            )
            .order((
                dsl::embedding
                    .assume_not_null()
                    .cosine_distance(&query)
                    .asc(),
                dsl::updated_at.desc(),
                dsl::id.asc(),
            ))
            .limit(limit);

        if let Some(kind) = kind {
            sql = sql.filter(dsl::vector_kind.eq(kind));
        }

        let rows: Vec<(Chunk, f64)> = sql.load(self).await.map_err(PgError::from)?;

        let scored = rows
            .into_iter()
            .map(|(chunk, score)| {
                let kind = chunk.vector_kind.unwrap_or(VectorKind::Text);
                ScoredChunk::single(chunk, score, kind)
            })
            .collect();

        Ok(scored)
    }

    async fn hybrid_search(
        &mut self,
        text_query: Option<Vector>,
        image_query: Option<Vector>,
        text_weight: f64,
        image_weight: f64,
        limit: i64,
        min_similarity: f64,
    ) -> PgResult<Vec<ScoredChunk>> {
        if text_query.is_none() && image_query.is_none() {
            return Err(PgError::validation(
                "hybrid search requires at least one query vector",
            ));
        }

        let side_limit = limit.saturating_mul(HYBRID_OVERSAMPLE).max(limit);

        let text_side = match text_query {
            Some(query) => {
                self.search_similar(query, Some(VectorKind::Text), side_limit, 0.0)
                    .await?
            }
            None => vec![],
        };
        let image_side = match image_query {
            Some(query) => {
                self.search_similar(query, Some(VectorKind::Image), side_limit, 0.0)
                    .await?
            }
            None => vec![],
        };

        let fused = fuse_hybrid(
            text_side,
            image_side,
            text_weight,
            image_weight,
            limit,
            min_similarity,
        );

        Ok(fused)
    }

    async fn find_chunks_by_file_hash(&mut self, file_hash: &str) -> PgResult<Vec<Chunk>> {
        use schema::chunks::{self, dsl};

        let chunks = chunks::table
            .filter(dsl::file_hash.eq(file_hash))
            .order(dsl::created_at.asc())
            .select(Chunk::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(chunks)
    }

    async fn list_embedded_chunks(
        &mut self,
        kind: VectorKind,
        limit: i64,
    ) -> PgResult<Vec<Chunk>> {
        use schema::chunks::{self, dsl};

        let chunks = chunks::table
            .filter(dsl::embedding.is_not_null())
            .filter(dsl::vector_kind.eq(kind))
            .order(dsl::created_at.asc())
            .limit(limit)
            .select(Chunk::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(chunks)
    }
}

/// Pure fusion step of the hybrid search, exposed for direct testing.
pub(crate) fn fuse_hybrid(
    text_side: Vec<ScoredChunk>,
    image_side: Vec<ScoredChunk>,
    text_weight: f64,
    image_weight: f64,
    limit: i64,
    min_similarity: f64,
) -> Vec<ScoredChunk> {
    struct Candidate {
        chunk: Chunk,
        text_similarity: Option<f64>,
        image_similarity: Option<f64>,
    }

    let mut by_id: HashMap<Uuid, Candidate> = HashMap::new();

    for scored in text_side {
        let entry = by_id.entry(scored.chunk.id).or_insert(Candidate {
            chunk: scored.chunk,
            text_similarity: None,
            image_similarity: None,
        });
        entry.text_similarity = max_similarity(entry.text_similarity, scored.text_similarity);
    }
    for scored in image_side {
        let entry = by_id.entry(scored.chunk.id).or_insert(Candidate {
            chunk: scored.chunk,
            text_similarity: None,
            image_similarity: None,
        });
        entry.image_similarity = max_similarity(entry.image_similarity, scored.image_similarity);
    }

    let mut fused: Vec<ScoredChunk> = by_id
        .into_values()
        .map(|candidate| {
            let score = text_weight * candidate.text_similarity.unwrap_or(0.0)
                + image_weight * candidate.image_similarity.unwrap_or(0.0);
            ScoredChunk {
                chunk: candidate.chunk,
                score,
                text_similarity: candidate.text_similarity,
                image_similarity: candidate.image_similarity,
            }
        })
        .filter(|scored| scored.score >= min_similarity)
        .collect();

    fused.sort_by(|a, b| {
        let a_updated: jiff::Timestamp = a.chunk.updated_at.into();
        let b_updated: jiff::Timestamp = b.chunk.updated_at.into();
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b_updated.cmp(&a_updated))
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    fused.truncate(limit.max(0) as usize);

    fused
}

fn max_similarity(current: Option<f64>, incoming: Option<f64>) -> Option<f64> {
    match (current, incoming) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;
    use crate::types::{ChunkRole, DocumentScope};

    fn chunk(kind: VectorKind, updated_offset_secs: i64) -> Chunk {
        let updated = Timestamp::now()
            .checked_add(jiff::Span::new().seconds(updated_offset_secs))
            .unwrap();
        Chunk {
            id: Uuid::now_v7(),
            content: "test".into(),
            role: ChunkRole::Content,
            parent_id: None,
            page_id: None,
            external_ref: None,
            document_id: "file:test".into(),
            document_scope: DocumentScope::File,
            metadata: serde_json::json!({}),
            file_hash: None,
            embedding: Some(Vector::from(vec![0.0; 4])),
            vector_kind: Some(kind),
            vector_model: Some("mock".into()),
            file_name: None,
            line_start: None,
            line_end: None,
            char_start: None,
            char_end: None,
            created_at: Timestamp::now().into(),
            updated_at: updated.into(),
        }
    }

    #[test]
    fn fusion_weights_and_orders() {
        let text_hit = chunk(VectorKind::Text, 0);
        let image_hit = chunk(VectorKind::Image, 0);

        let fused = fuse_hybrid(
            vec![ScoredChunk::single(text_hit.clone(), 0.9, VectorKind::Text)],
            vec![ScoredChunk::single(image_hit.clone(), 0.9, VectorKind::Image)],
            0.6,
            0.4,
            10,
            0.0,
        );

        assert_eq!(fused.len(), 2);
        // text side carries the larger weight
        assert_eq!(fused[0].chunk.id, text_hit.id);
        assert!((fused[0].score - 0.54).abs() <= 1e-9);
        assert!((fused[1].score - 0.36).abs() <= 1e-9);
        assert_eq!(fused[1].chunk.id, image_hit.id);
    }

    #[test]
    fn fusion_deduplicates_by_id_taking_max_per_side() {
        let shared = chunk(VectorKind::Image, 0);

        let fused = fuse_hybrid(
            vec![ScoredChunk::single(shared.clone(), 0.5, VectorKind::Text)],
            vec![
                ScoredChunk::single(shared.clone(), 0.7, VectorKind::Image),
                ScoredChunk::single(shared.clone(), 0.3, VectorKind::Image),
            ],
            0.6,
            0.4,
            10,
            0.0,
        );

        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].text_similarity, Some(0.5));
        assert_eq!(fused[0].image_similarity, Some(0.7));
        assert!((fused[0].score - (0.6 * 0.5 + 0.4 * 0.7)).abs() <= 1e-9);
    }

    #[test]
    fn fusion_ties_break_by_updated_then_id() {
        let newer = chunk(VectorKind::Text, 10);
        let older = chunk(VectorKind::Text, -10);

        let fused = fuse_hybrid(
            vec![
                ScoredChunk::single(older.clone(), 0.8, VectorKind::Text),
                ScoredChunk::single(newer.clone(), 0.8, VectorKind::Text),
            ],
            vec![],
            1.0,
            0.0,
            10,
            0.0,
        );

        assert_eq!(fused[0].chunk.id, newer.id);
        assert_eq!(fused[1].chunk.id, older.id);
    }

    #[test]
    fn fusion_applies_min_similarity_and_limit() {
        let a = chunk(VectorKind::Text, 0);
        let b = chunk(VectorKind::Text, 0);
        let c = chunk(VectorKind::Text, 0);

        let fused = fuse_hybrid(
            vec![
                ScoredChunk::single(a, 0.9, VectorKind::Text),
                ScoredChunk::single(b, 0.8, VectorKind::Text),
                ScoredChunk::single(c, 0.1, VectorKind::Text),
            ],
            vec![],
            1.0,
            0.0,
            2,
            0.5,
        );

        assert_eq!(fused.len(), 2);
        assert!(fused.iter().all(|s| s.score >= 0.5));
    }
}
