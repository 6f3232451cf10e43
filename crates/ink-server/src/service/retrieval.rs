//! Retrieval engine: text, image and hybrid search with post-filters,
//! slide recommendation and duplicate grouping.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ink_core::emb::{ImageEmbedder, TextEmbedder};
use ink_core::RetryConfig;
use ink_postgres::model::{Chunk, ScoredChunk};
use ink_postgres::query::{
    ChunkRepository, HierarchyNode, HierarchyRepository, TagLogic, TagRepository,
    VectorSearchRepository,
};
use ink_postgres::types::VectorKind;
use ink_postgres::PgClient;
use jiff::Timestamp;
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::cache::SearchCache;
use super::fingerprint::vector_signature;
use super::{ServiceError, ServiceResult};

/// Tracing target for retrieval operations.
const TRACING_TARGET: &str = "ink_server::service::retrieval";

/// Headroom multiplier for store fetches so post-filters keep enough rows.
const FILTER_OVERSAMPLE: i64 = 3;

/// Cap on image chunks examined by duplicate grouping.
const DUPLICATE_SCAN_LIMIT: i64 = 1000;

/// Which vector partition a search addresses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    /// Text embeddings only.
    Text,
    /// Image embeddings only.
    Image,
    /// Both partitions.
    #[default]
    All,
}

impl SearchKind {
    fn to_store_kind(self) -> Option<VectorKind> {
        match self {
            Self::Text => Some(VectorKind::Text),
            Self::Image => Some(VectorKind::Image),
            Self::All => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::All => "all",
        }
    }
}

/// Which side(s) of a search contributed to a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Text similarity only.
    Text,
    /// Image similarity only.
    Image,
    /// Both sides contributed.
    Hybrid,
}

/// Post-filters applied after ANN execution.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Required tags.
    pub tags: Vec<Uuid>,
    /// Combinator for `tags`.
    pub tag_logic: TagLogic,
    /// Tags that disqualify a result.
    pub exclude_tags: Vec<Uuid>,
    /// Restricts to page roots (or non-pages).
    pub is_page: Option<bool>,
    /// Lower bound on `last_updated`.
    pub date_from: Option<Timestamp>,
    /// Upper bound on `last_updated`.
    pub date_to: Option<Timestamp>,
}

impl SearchFilters {
    fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.exclude_tags.is_empty()
            && self.is_page.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }

    fn to_request_value(&self) -> Value {
        json!({
            "tags": self.tags.iter().map(Uuid::to_string).collect::<Vec<_>>(),
            "tag_logic": match self.tag_logic { TagLogic::And => "AND", TagLogic::Or => "OR" },
            "exclude_tags": self.exclude_tags.iter().map(Uuid::to_string).collect::<Vec<_>>(),
            "is_page": self.is_page,
            "date_from": self.date_from.map(|t| t.to_string()),
            "date_to": self.date_to.map(|t| t.to_string()),
        })
    }
}

/// A ranked search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matching chunk.
    pub chunk: Chunk,
    /// Fusion or similarity score.
    pub score: f64,
    /// Which side(s) matched.
    pub match_type: MatchType,
    /// Text-side cosine similarity, when any.
    pub text_similarity: Option<f64>,
    /// Image-side cosine similarity, when any.
    pub image_similarity: Option<f64>,
    /// Human-readable reason, for slide recommendations.
    pub match_reason: Option<String>,
}

/// Reference to the image side of a search.
#[derive(Debug, Clone)]
pub enum ImageReference {
    /// A fetchable image URL.
    Url(String),
    /// An existing image chunk whose vector is reused.
    Chunk(Uuid),
}

/// A slide-recommendation request.
#[derive(Debug, Clone)]
pub struct SlideRequest {
    /// Slide title; weighted by repetition when present.
    pub title: Option<String>,
    /// Slide body text.
    pub content: String,
    /// Optional deck context.
    pub context: Option<String>,
    /// Maximum suggestions returned.
    pub max_suggestions: i64,
    /// Minimum relevance score.
    pub min_relevance: f64,
}

/// A group of (near-)duplicate image chunks.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    /// Member chunks, oldest first.
    pub chunks: Vec<Chunk>,
    /// Whether the group shares an identical blob hash.
    pub exact: bool,
}

/// Metadata persisted with cached results so hits rebuild without ANN.
#[derive(Debug, Serialize, Deserialize)]
struct HitMeta {
    id: Uuid,
    score: f64,
    match_type: MatchType,
    text_similarity: Option<f64>,
    image_similarity: Option<f64>,
    match_reason: Option<String>,
}

/// The retrieval engine.
#[derive(Clone)]
pub struct RetrievalEngine {
    pg: PgClient,
    text_embedder: Arc<dyn TextEmbedder>,
    image_embedder: Arc<dyn ImageEmbedder>,
    cache: SearchCache,
    retry: RetryConfig,
}

impl RetrievalEngine {
    /// Creates the engine.
    pub fn new(
        pg: PgClient,
        text_embedder: Arc<dyn TextEmbedder>,
        image_embedder: Arc<dyn ImageEmbedder>,
        cache: SearchCache,
    ) -> Self {
        Self {
            pg,
            text_embedder,
            image_embedder,
            cache,
            retry: RetryConfig::default(),
        }
    }

    /// Text-query search over the selected vector partition.
    #[tracing::instrument(skip_all, fields(limit = limit, kind = %kind.as_str()))]
    pub async fn search_text(
        &self,
        query: &str,
        kind: SearchKind,
        filters: SearchFilters,
        limit: i64,
        min_score: f64,
    ) -> ServiceResult<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(ServiceError::validation("text query must not be empty"));
        }
        validate_limit(limit)?;

        let embedding = self
            .retry
            .retry(|| async {
                self.text_embedder
                    .embed_text(query)
                    .await
                    .map_err(ServiceError::from)
            })
            .await?;

        let request = json!({
            "op": "search_text",
            "vector": vector_signature(&embedding.values),
            "vector_type": kind.as_str(),
            "limit": limit,
            "min_score": min_score,
        });
        let request = merge_filters(request, &filters);

        self.cached(request, || async {
            let mut conn = self.pg.get_connection().await?;
            let scored = conn
                .search_similar(
                    Vector::from(embedding.values.clone()),
                    kind.to_store_kind(),
                    fetch_limit(limit, &filters),
                    min_score,
                )
                .await?;
            let hits = scored.into_iter().map(hit_from_scored).collect();
            self.apply_filters(hits, &filters, limit).await
        })
        .await
    }

    /// Image-reference search over the image partition.
    #[tracing::instrument(skip_all, fields(limit = limit))]
    pub async fn search_image(
        &self,
        reference: ImageReference,
        filters: SearchFilters,
        limit: i64,
        min_score: f64,
    ) -> ServiceResult<Vec<SearchHit>> {
        validate_limit(limit)?;

        let (values, exclude) = self.resolve_image_vector(&reference).await?;

        let request = json!({
            "op": "search_image",
            "vector": vector_signature(&values),
            "vector_type": "image",
            "limit": limit,
            "min_score": min_score,
        });
        let request = merge_filters(request, &filters);

        self.cached(request, || async {
            let mut conn = self.pg.get_connection().await?;
            let scored = conn
                .search_similar(
                    Vector::from(values.clone()),
                    Some(VectorKind::Image),
                    fetch_limit(limit, &filters) + 1,
                    min_score,
                )
                .await?;
            let hits = scored
                .into_iter()
                .filter(|s| Some(s.chunk.id) != exclude)
                .map(hit_from_scored)
                .collect();
            self.apply_filters(hits, &filters, limit).await
        })
        .await
    }

    /// Weighted hybrid search across both partitions.
    ///
    /// Weights are required by the API contract; nothing below the DTO
    /// boundary supplies a default.
    #[tracing::instrument(skip_all, fields(limit = limit))]
    pub async fn hybrid_search(
        &self,
        text_query: Option<&str>,
        image_query: Option<ImageReference>,
        text_weight: f64,
        image_weight: f64,
        filters: SearchFilters,
        limit: i64,
        min_similarity: f64,
    ) -> ServiceResult<Vec<SearchHit>> {
        validate_limit(limit)?;
        if text_query.is_none() && image_query.is_none() {
            return Err(ServiceError::validation(
                "hybrid search requires a text query, an image query, or both",
            ));
        }
        if !(0.0..=1.0).contains(&text_weight) || !(0.0..=1.0).contains(&image_weight) {
            return Err(ServiceError::validation("weights must be within [0, 1]"));
        }

        let text_values = match text_query {
            Some(query) if !query.trim().is_empty() => Some(
                self.retry
                    .retry(|| async {
                        self.text_embedder
                            .embed_text(query)
                            .await
                            .map_err(ServiceError::from)
                    })
                    .await?
                    .values,
            ),
            Some(_) => return Err(ServiceError::validation("text query must not be empty")),
            None => None,
        };

        let (image_values, exclude) = match image_query {
            Some(reference) => {
                let (values, exclude) = self.resolve_image_vector(&reference).await?;
                (Some(values), exclude)
            }
            None => (None, None),
        };

        let request = json!({
            "op": "hybrid_search",
            "text_vector": text_values.as_deref().map(vector_signature),
            "image_vector": image_values.as_deref().map(vector_signature),
            "vector_type": "all",
            "weights": { "text": text_weight, "image": image_weight },
            "limit": limit,
            "min_similarity": min_similarity,
        });
        let request = merge_filters(request, &filters);

        self.cached(request, || async {
            let mut conn = self.pg.get_connection().await?;
            let scored = conn
                .hybrid_search(
                    text_values.clone().map(Vector::from),
                    image_values.clone().map(Vector::from),
                    text_weight,
                    image_weight,
                    fetch_limit(limit, &filters) + 1,
                    min_similarity,
                )
                .await?;
            let hits = scored
                .into_iter()
                .filter(|s| Some(s.chunk.id) != exclude)
                .map(hit_from_scored)
                .collect();
            self.apply_filters(hits, &filters, limit).await
        })
        .await
    }

    /// Finds chunks similar to an existing chunk; the source is excluded.
    #[tracing::instrument(skip_all, fields(chunk_id = %chunk_id, limit = limit))]
    pub async fn similar_to_chunk(
        &self,
        chunk_id: Uuid,
        filters: SearchFilters,
        limit: i64,
        min_score: f64,
    ) -> ServiceResult<Vec<SearchHit>> {
        validate_limit(limit)?;

        let mut conn = self.pg.get_connection().await?;
        let chunk = conn
            .find_chunk_by_id(chunk_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("chunk", chunk_id))?;
        drop(conn);

        let (Some(embedding), Some(kind)) = (chunk.embedding.clone(), chunk.vector_kind) else {
            return Err(ServiceError::validation(
                "source chunk carries no embedding",
            ));
        };
        let values = embedding.to_vec();

        let request = json!({
            "op": "similar_to_chunk",
            "vector": vector_signature(&values),
            "vector_type": match kind { VectorKind::Text => "text", VectorKind::Image => "image" },
            "source": chunk_id.to_string(),
            "limit": limit,
            "min_score": min_score,
        });
        let request = merge_filters(request, &filters);

        self.cached(request, || async {
            let mut conn = self.pg.get_connection().await?;
            let scored = conn
                .search_similar(
                    Vector::from(values.clone()),
                    Some(kind),
                    fetch_limit(limit, &filters) + 1,
                    min_score,
                )
                .await?;
            let hits = scored
                .into_iter()
                .filter(|s| s.chunk.id != chunk_id)
                .map(hit_from_scored)
                .collect();
            self.apply_filters(hits, &filters, limit).await
        })
        .await
    }

    /// Recommends images for a slide.
    #[tracing::instrument(skip_all, fields(max = request.max_suggestions))]
    pub async fn recommend_for_slide(&self, request: SlideRequest) -> ServiceResult<Vec<SearchHit>> {
        if request.content.trim().is_empty() {
            return Err(ServiceError::validation("slide content must not be empty"));
        }
        validate_limit(request.max_suggestions)?;

        // title terms are weighted by repetition ahead of the body
        let mut query = String::new();
        if let Some(title) = &request.title {
            for _ in 0..3 {
                query.push_str(title);
                query.push(' ');
            }
        }
        query.push_str(&request.content);
        if let Some(context) = &request.context {
            query.push(' ');
            query.push_str(context);
        }

        let embedding = self
            .retry
            .retry(|| async {
                self.text_embedder
                    .embed_text(&query)
                    .await
                    .map_err(ServiceError::from)
            })
            .await?;

        let input_tokens = tokenize(&query);

        let cache_request = json!({
            "op": "recommend_for_slide",
            "vector": vector_signature(&embedding.values),
            "vector_type": "image",
            "limit": request.max_suggestions,
            "min_relevance": request.min_relevance,
        });

        self.cached(cache_request, || async {
            let mut conn = self.pg.get_connection().await?;
            let scored = conn
                .search_similar(
                    Vector::from(embedding.values.clone()),
                    Some(VectorKind::Image),
                    request.max_suggestions,
                    request.min_relevance,
                )
                .await?;

            let hits = scored
                .into_iter()
                .map(|scored| {
                    let reason = match_reason(&scored.chunk, &input_tokens);
                    let mut hit = hit_from_scored(scored);
                    hit.match_reason = Some(reason);
                    hit
                })
                .collect();
            Ok(hits)
        })
        .await
    }

    /// Non-vector tag-membership search.
    pub async fn search_by_tags(
        &self,
        tag_ids: &[Uuid],
        logic: TagLogic,
    ) -> ServiceResult<Vec<Chunk>> {
        if tag_ids.is_empty() {
            return Err(ServiceError::validation("tag search requires tag ids"));
        }

        let mut conn = self.pg.get_connection().await?;
        Ok(conn.find_chunks_by_tags(tag_ids, logic).await?)
    }

    /// Hierarchy walk below a root chunk.
    pub async fn search_hierarchy(
        &self,
        root: Uuid,
        max_depth: Option<i32>,
    ) -> ServiceResult<Vec<HierarchyNode>> {
        let mut conn = self.pg.get_connection().await?;
        Ok(conn.find_descendants(root, max_depth).await?)
    }

    /// Groups duplicate and near-duplicate image chunks.
    #[tracing::instrument(skip_all, fields(threshold = similarity_threshold))]
    pub async fn find_duplicates(
        &self,
        similarity_threshold: f64,
        min_group_size: usize,
    ) -> ServiceResult<Vec<DuplicateGroup>> {
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(ServiceError::validation(
                "similarity_threshold must be within [0, 1]",
            ));
        }
        let min_group_size = min_group_size.max(2);

        let mut conn = self.pg.get_connection().await?;
        let chunks = conn
            .list_embedded_chunks(VectorKind::Image, DUPLICATE_SCAN_LIMIT)
            .await?;

        let index_of: HashMap<Uuid, usize> =
            chunks.iter().enumerate().map(|(i, c)| (c.id, i)).collect();
        let mut union = UnionFind::new(chunks.len());

        // exact duplicates share a blob hash
        let mut by_hash: HashMap<&str, usize> = HashMap::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if let Some(hash) = chunk.file_hash.as_deref() {
                match by_hash.get(hash) {
                    Some(&first) => union.join(first, i),
                    None => {
                        by_hash.insert(hash, i);
                    }
                }
            }
        }

        // near-duplicates join through ANN neighbourhoods
        for (i, chunk) in chunks.iter().enumerate() {
            let Some(embedding) = chunk.embedding.clone() else {
                continue;
            };
            let neighbours = conn
                .search_similar(
                    embedding,
                    Some(VectorKind::Image),
                    16,
                    similarity_threshold,
                )
                .await?;
            for neighbour in neighbours {
                if let Some(&j) = index_of.get(&neighbour.chunk.id) {
                    union.join(i, j);
                }
            }
        }

        let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..chunks.len() {
            groups.entry(union.find(i)).or_default().push(i);
        }

        let mut result: Vec<DuplicateGroup> = groups
            .into_values()
            .filter(|members| members.len() >= min_group_size)
            .map(|members| {
                let group_chunks: Vec<Chunk> =
                    members.iter().map(|&i| chunks[i].clone()).collect();
                let exact = group_chunks
                    .windows(2)
                    .all(|pair| pair[0].file_hash == pair[1].file_hash);
                DuplicateGroup {
                    chunks: group_chunks,
                    exact,
                }
            })
            .collect();

        result.sort_by_key(|group| std::cmp::Reverse(group.chunks.len()));

        tracing::info!(
            target: TRACING_TARGET,
            groups = result.len(),
            "Duplicate grouping complete"
        );

        Ok(result)
    }

    /// Runs `compute` under the single-flight cache.
    async fn cached<F, Fut>(&self, request: Value, compute: F) -> ServiceResult<Vec<SearchHit>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ServiceResult<Vec<SearchHit>>>,
    {
        let fingerprint = SearchCache::fingerprint(&request);
        let lock = self.cache.lock_for(&fingerprint).await;
        let _guard = lock.lock().await;

        if let Some(cached) = self.cache.lookup(&fingerprint).await? {
            return self.rehydrate(cached.results_meta).await;
        }

        let hits = compute().await?;

        let chunk_ids: Vec<Uuid> = hits.iter().map(|hit| hit.chunk.id).collect();
        let meta: Vec<HitMeta> = hits
            .iter()
            .map(|hit| HitMeta {
                id: hit.chunk.id,
                score: hit.score,
                match_type: hit.match_type,
                text_similarity: hit.text_similarity,
                image_similarity: hit.image_similarity,
                match_reason: hit.match_reason.clone(),
            })
            .collect();
        let meta = serde_json::to_value(meta)
            .map_err(|e| ServiceError::internal(format!("meta serialization: {e}")))?;

        self.cache
            .store(fingerprint, request, chunk_ids, meta)
            .await?;

        Ok(hits)
    }

    /// Rebuilds hits from cached metadata, re-fetching chunks fresh.
    async fn rehydrate(&self, results_meta: Value) -> ServiceResult<Vec<SearchHit>> {
        let meta: Vec<HitMeta> = serde_json::from_value(results_meta)
            .map_err(|e| ServiceError::internal(format!("meta deserialization: {e}")))?;

        let ids: Vec<Uuid> = meta.iter().map(|m| m.id).collect();
        let mut conn = self.pg.get_connection().await?;
        let chunks = conn.find_chunks_by_ids(&ids).await?;
        let mut by_id: HashMap<Uuid, Chunk> = chunks.into_iter().map(|c| (c.id, c)).collect();

        // ids that vanished since population simply drop out
        Ok(meta
            .into_iter()
            .filter_map(|m| {
                by_id.remove(&m.id).map(|chunk| SearchHit {
                    chunk,
                    score: m.score,
                    match_type: m.match_type,
                    text_similarity: m.text_similarity,
                    image_similarity: m.image_similarity,
                    match_reason: m.match_reason,
                })
            })
            .collect())
    }

    async fn resolve_image_vector(
        &self,
        reference: &ImageReference,
    ) -> ServiceResult<(Vec<f32>, Option<Uuid>)> {
        match reference {
            ImageReference::Url(url) => {
                let embedding = self
                    .retry
                    .retry(|| async {
                        self.image_embedder
                            .embed_image(url)
                            .await
                            .map_err(ServiceError::from)
                    })
                    .await?;
                Ok((embedding.values, None))
            }
            ImageReference::Chunk(chunk_id) => {
                let mut conn = self.pg.get_connection().await?;
                let chunk = conn
                    .find_chunk_by_id(*chunk_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("chunk", chunk_id))?;
                let embedding = chunk.embedding.ok_or_else(|| {
                    ServiceError::validation("referenced chunk carries no embedding")
                })?;
                Ok((embedding.to_vec(), Some(*chunk_id)))
            }
        }
    }

    /// Applies tag/page/date post-filters with deterministic ordering.
    async fn apply_filters(
        &self,
        hits: Vec<SearchHit>,
        filters: &SearchFilters,
        limit: i64,
    ) -> ServiceResult<Vec<SearchHit>> {
        let mut hits = hits;

        if !filters.is_empty() {
            let ids: Vec<Uuid> = hits.iter().map(|hit| hit.chunk.id).collect();
            let tags_by_chunk = if filters.tags.is_empty() && filters.exclude_tags.is_empty() {
                HashMap::new()
            } else {
                let mut conn = self.pg.get_connection().await?;
                conn.list_tags_for_chunks(&ids).await?
            };

            hits.retain(|hit| keep_hit(hit, filters, &tags_by_chunk));
        }

        sort_hits(&mut hits);
        hits.truncate(limit.max(0) as usize);
        Ok(hits)
    }
}

fn keep_hit(
    hit: &SearchHit,
    filters: &SearchFilters,
    tags_by_chunk: &HashMap<Uuid, Vec<Uuid>>,
) -> bool {
    if let Some(is_page) = filters.is_page {
        if hit.chunk.role.is_page() != is_page {
            return false;
        }
    }

    let updated: Timestamp = hit.chunk.updated_at.into();
    if let Some(from) = filters.date_from {
        if updated < from {
            return false;
        }
    }
    if let Some(to) = filters.date_to {
        if updated > to {
            return false;
        }
    }

    let empty = vec![];
    let chunk_tags = tags_by_chunk.get(&hit.chunk.id).unwrap_or(&empty);

    if filters.exclude_tags.iter().any(|t| chunk_tags.contains(t)) {
        return false;
    }

    if !filters.tags.is_empty() {
        let matched = match filters.tag_logic {
            TagLogic::And => filters.tags.iter().all(|t| chunk_tags.contains(t)),
            TagLogic::Or => filters.tags.iter().any(|t| chunk_tags.contains(t)),
        };
        if !matched {
            return false;
        }
    }

    true
}

/// Deterministic result ordering: score desc, last_updated desc, id asc.
fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        let a_updated: Timestamp = a.chunk.updated_at.into();
        let b_updated: Timestamp = b.chunk.updated_at.into();
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b_updated.cmp(&a_updated))
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
}

fn hit_from_scored(scored: ScoredChunk) -> SearchHit {
    let match_type = match (scored.text_similarity, scored.image_similarity) {
        (Some(_), Some(_)) => MatchType::Hybrid,
        (None, Some(_)) => MatchType::Image,
        _ => MatchType::Text,
    };
    SearchHit {
        chunk: scored.chunk,
        score: scored.score,
        match_type,
        text_similarity: scored.text_similarity,
        image_similarity: scored.image_similarity,
        match_reason: None,
    }
}

fn fetch_limit(limit: i64, filters: &SearchFilters) -> i64 {
    if filters.is_empty() {
        limit
    } else {
        limit.saturating_mul(FILTER_OVERSAMPLE)
    }
}

fn validate_limit(limit: i64) -> ServiceResult<()> {
    if limit <= 0 {
        return Err(ServiceError::validation("limit must be positive"));
    }
    Ok(())
}

fn merge_filters(mut request: Value, filters: &SearchFilters) -> Value {
    if let Value::Object(ref mut map) = request {
        if let Value::Object(filter_map) = filters.to_request_value() {
            map.extend(filter_map);
        }
    }
    request
}

/// Derives a human-readable match reason from token overlap between the
/// slide input and the chunk's analysis tags and description.
fn match_reason(chunk: &Chunk, input_tokens: &HashSet<String>) -> String {
    let view = chunk.metadata_view();
    let Some(analysis) = view.ai_analysis() else {
        return "semantic similarity".to_owned();
    };

    let tag_overlap: Vec<String> = analysis
        .tags
        .iter()
        .filter(|tag| input_tokens.contains(&tag.to_ascii_lowercase()))
        .cloned()
        .collect();
    if !tag_overlap.is_empty() {
        return format!("matches tags: {}", tag_overlap.join(", "));
    }

    let description_overlap: Vec<String> = tokenize(&analysis.description)
        .intersection(input_tokens)
        .take(3)
        .cloned()
        .collect();
    if !description_overlap.is_empty() {
        return format!("description mentions: {}", description_overlap.join(", "));
    }

    "semantic similarity".to_owned()
}

fn tokenize(text: &str) -> HashSet<String> {
    // lazily-built tokenizer shared across calls
    static WORD: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let word = WORD.get_or_init(|| regex::Regex::new(r"[a-zA-Z0-9]{3,}").expect("valid regex"));

    word.find_iter(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect()
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    fn join(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

#[cfg(test)]
mod tests {
    use ink_postgres::types::{ChunkRole, DocumentScope};

    use super::*;

    fn chunk_with(role: ChunkRole, updated_offset: i64) -> Chunk {
        let updated = Timestamp::now()
            .checked_add(jiff::Span::new().seconds(updated_offset))
            .unwrap();
        Chunk {
            id: Uuid::now_v7(),
            content: "content".into(),
            role,
            parent_id: None,
            page_id: None,
            external_ref: None,
            document_id: "file:test".into(),
            document_scope: DocumentScope::File,
            metadata: json!({}),
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
            updated_at: updated.into(),
        }
    }

    fn hit(chunk: Chunk, score: f64) -> SearchHit {
        SearchHit {
            chunk,
            score,
            match_type: MatchType::Text,
            text_similarity: Some(score),
            image_similarity: None,
            match_reason: None,
        }
    }

    #[test]
    fn ordering_is_deterministic() {
        let newer = chunk_with(ChunkRole::Content, 10);
        let older = chunk_with(ChunkRole::Content, -10);
        let mut hits = vec![hit(older.clone(), 0.8), hit(newer.clone(), 0.8)];

        sort_hits(&mut hits);

        assert_eq!(hits[0].chunk.id, newer.id);
        assert_eq!(hits[1].chunk.id, older.id);
    }

    #[test]
    fn page_filter_applies() {
        let page = chunk_with(ChunkRole::Page, 0);
        let plain = chunk_with(ChunkRole::Content, 0);

        let filters = SearchFilters {
            is_page: Some(true),
            ..Default::default()
        };

        assert!(keep_hit(&hit(page, 0.9), &filters, &HashMap::new()));
        assert!(!keep_hit(&hit(plain, 0.9), &filters, &HashMap::new()));
    }

    #[test]
    fn tag_filters_apply_with_logic() {
        let chunk = chunk_with(ChunkRole::Content, 0);
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let tags = HashMap::from([(chunk.id, vec![a])]);

        let and_filters = SearchFilters {
            tags: vec![a, b],
            tag_logic: TagLogic::And,
            ..Default::default()
        };
        assert!(!keep_hit(&hit(chunk.clone(), 0.9), &and_filters, &tags));

        let or_filters = SearchFilters {
            tags: vec![a, b],
            tag_logic: TagLogic::Or,
            ..Default::default()
        };
        assert!(keep_hit(&hit(chunk.clone(), 0.9), &or_filters, &tags));

        let exclude_filters = SearchFilters {
            exclude_tags: vec![a],
            ..Default::default()
        };
        assert!(!keep_hit(&hit(chunk, 0.9), &exclude_filters, &tags));
    }

    #[test]
    fn match_reason_prefers_tag_overlap() {
        let mut chunk = chunk_with(ChunkRole::Content, 0);
        let mut view = ink_postgres::types::MetadataView::default();
        view.set_ai_analysis(&ink_postgres::types::AiAnalysis {
            description: "two cats asleep on a sofa".into(),
            tags: vec!["cats".into(), "sofa".into()],
            model: "mock".into(),
            confidence: 0.9,
            analyzed_at: Timestamp::now(),
        });
        chunk.metadata = view.into_value();

        let tokens = tokenize("Cats playing near the window");
        let reason = match_reason(&chunk, &tokens);
        assert_eq!(reason, "matches tags: cats");
    }

    #[test]
    fn match_reason_falls_back_to_description_then_generic() {
        let mut chunk = chunk_with(ChunkRole::Content, 0);
        let mut view = ink_postgres::types::MetadataView::default();
        view.set_ai_analysis(&ink_postgres::types::AiAnalysis {
            description: "a diagram of database sharding".into(),
            tags: vec!["diagram".into()],
            model: "mock".into(),
            confidence: 0.9,
            analyzed_at: Timestamp::now(),
        });
        chunk.metadata = view.into_value();

        let tokens = tokenize("database architecture overview");
        assert!(match_reason(&chunk, &tokens).starts_with("description mentions:"));

        let unrelated = tokenize("medieval history");
        assert_eq!(match_reason(&chunk, &unrelated), "semantic similarity");
    }

    #[test]
    fn union_find_groups_transitively() {
        let mut union = UnionFind::new(4);
        union.join(0, 1);
        union.join(1, 2);

        assert_eq!(union.find(0), union.find(2));
        assert_ne!(union.find(0), union.find(3));
    }

    #[test]
    fn limits_are_validated() {
        assert!(validate_limit(10).is_ok());
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(-3).is_err());
    }
}
