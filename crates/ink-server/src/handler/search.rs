//! Multimodal search handler.

use std::collections::HashMap;

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;
use ink_postgres::query::TagRepository;
use uuid::Uuid;

use crate::extract::{Json, Path, Query, ValidateJson};
use crate::handler::request::{ChunkPathParams, HierarchyQuery, MultimodalSearch, SimilarQuery};
use crate::handler::response::{
    ChunkResponse, ErrorResponse, HierarchyChunkResponse, SearchResponse, SearchResultResponse,
};
use crate::handler::{ErrorKind, Result};
use crate::service::{SearchFilters, SearchHit, ServiceState};

/// Tracing target for search operations.
const TRACING_TARGET: &str = "ink_server::handler::search";

/// Runs a text, image or hybrid search.
#[tracing::instrument(skip_all, fields(limit = request.limit))]
async fn multimodal_search(
    State(state): State<ServiceState>,
    ValidateJson(request): ValidateJson<MultimodalSearch>,
) -> Result<(StatusCode, Json<SearchResponse>)> {
    tracing::debug!(target: TRACING_TARGET, "Dispatching multimodal search");

    let filters = request.filters.clone().into();
    let retrieval = state.retrieval();

    let hits = if request.is_hybrid() {
        // weights are a required parameter of hybrid search: there is no
        // server-side default below this boundary
        let weights = request.weights.ok_or_else(|| {
            ErrorKind::Validation
                .with_message("weights are required when both text_query and image_query are present")
        })?;

        retrieval
            .hybrid_search(
                request.text_query.as_deref(),
                request.image_reference(),
                weights.text,
                weights.image,
                filters,
                request.limit,
                request.min_similarity,
            )
            .await?
    } else if let Some(reference) = request.image_reference() {
        retrieval
            .search_image(reference, filters, request.limit, request.min_similarity)
            .await?
    } else if let Some(query) = request.text_query.as_deref() {
        retrieval
            .search_text(
                query,
                request.vector_type,
                filters,
                request.limit,
                request.min_similarity,
            )
            .await?
    } else {
        return Err(ErrorKind::Validation
            .with_message("either text_query or image_query is required")
            .into_static());
    };

    let response = hits_to_response(&state, hits).await?;

    tracing::debug!(
        target: TRACING_TARGET,
        results = response.total,
        "Search complete"
    );

    Ok((StatusCode::OK, Json(response)))
}

fn multimodal_search_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Multimodal search")
        .description(
            "Searches by text, by image (URL or chunk id), or by a weighted hybrid of both.",
        )
        .response::<200, Json<SearchResponse>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
        .response::<502, Json<ErrorResponse>>()
        .response::<503, Json<ErrorResponse>>()
}

/// Attaches tag sets to search hits and renders the response.
pub(crate) async fn hits_to_response(
    state: &ServiceState,
    hits: Vec<SearchHit>,
) -> Result<SearchResponse> {
    let ids: Vec<Uuid> = hits.iter().map(|hit| hit.chunk.id).collect();

    let mut tags_by_chunk: HashMap<Uuid, Vec<Uuid>> = if ids.is_empty() {
        HashMap::new()
    } else {
        let mut conn = state.pg_client().get_connection().await?;
        conn.list_tags_for_chunks(&ids).await?
    };

    let results: Vec<SearchResultResponse> = hits
        .into_iter()
        .map(|hit| {
            let tags = tags_by_chunk.remove(&hit.chunk.id).unwrap_or_default();
            SearchResultResponse::from_hit(hit, tags)
        })
        .collect();

    Ok(SearchResponse {
        total: results.len(),
        results,
    })
}

/// Finds chunks similar to an existing chunk.
#[tracing::instrument(skip_all, fields(chunk_id = %path_params.id))]
async fn similar_chunks(
    State(state): State<ServiceState>,
    Path(path_params): Path<ChunkPathParams>,
    Query(query): Query<SimilarQuery>,
) -> Result<(StatusCode, Json<SearchResponse>)> {
    let hits = state
        .retrieval()
        .similar_to_chunk(
            path_params.id,
            SearchFilters::default(),
            query.limit,
            query.min_score,
        )
        .await?;

    let response = hits_to_response(&state, hits).await?;
    Ok((StatusCode::OK, Json(response)))
}

fn similar_chunks_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Similar chunks")
        .description("Searches the source chunk's vector partition; the source itself is excluded.")
        .response::<200, Json<SearchResponse>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Walks the hierarchy below a chunk.
#[tracing::instrument(skip_all, fields(chunk_id = %path_params.id))]
async fn chunk_hierarchy(
    State(state): State<ServiceState>,
    Path(path_params): Path<ChunkPathParams>,
    Query(query): Query<HierarchyQuery>,
) -> Result<(StatusCode, Json<Vec<HierarchyChunkResponse>>)> {
    let nodes = state
        .retrieval()
        .search_hierarchy(path_params.id, query.max_depth)
        .await?;

    let ids: Vec<Uuid> = nodes.iter().map(|node| node.chunk.id).collect();
    let mut tags_by_chunk = if ids.is_empty() {
        HashMap::new()
    } else {
        let mut conn = state.pg_client().get_connection().await?;
        conn.list_tags_for_chunks(&ids).await?
    };

    let response: Vec<HierarchyChunkResponse> = nodes
        .into_iter()
        .map(|node| {
            let tags = tags_by_chunk.remove(&node.chunk.id).unwrap_or_default();
            HierarchyChunkResponse {
                chunk: ChunkResponse::from_chunk(node.chunk, tags),
                depth: node.depth,
            }
        })
        .collect();

    Ok((StatusCode::OK, Json(response)))
}

fn chunk_hierarchy_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Chunk hierarchy")
        .description("Returns closure descendants up to max_depth (capped at 100), ordered by depth then position.")
        .response::<200, Json<Vec<HierarchyChunkResponse>>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
}

/// Returns a [`Router`] with all related routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route(
            "/search/multimodal",
            post_with(multimodal_search, multimodal_search_docs),
        )
        .api_route(
            "/chunks/{id}/similar",
            get_with(similar_chunks, similar_chunks_docs),
        )
        .api_route(
            "/chunks/{id}/hierarchy",
            get_with(chunk_hierarchy, chunk_hierarchy_docs),
        )
        .with_path_items(|item| item.tag("Search"))
}
