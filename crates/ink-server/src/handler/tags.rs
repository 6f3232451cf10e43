//! Tag search handler.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;
use ink_postgres::query::TagRepository;
use uuid::Uuid;

use crate::extract::{Json, PgPool, ValidateJson};
use crate::handler::request::TagSearchRequest;
use crate::handler::response::{ChunkResponse, ErrorResponse};
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for tag operations.
const TRACING_TARGET: &str = "ink_server::handler::tags";

/// Finds chunks by tag membership.
#[tracing::instrument(skip_all, fields(tags = request.tags.len()))]
async fn search_by_tags(
    State(state): State<ServiceState>,
    PgPool(mut conn): PgPool,
    ValidateJson(request): ValidateJson<TagSearchRequest>,
) -> Result<(StatusCode, Json<Vec<ChunkResponse>>)> {
    tracing::debug!(target: TRACING_TARGET, "Searching by tags");

    let chunks = state
        .retrieval()
        .search_by_tags(&request.tags, request.logic)
        .await?;

    let ids: Vec<Uuid> = chunks.iter().map(|c| c.id).collect();
    let mut tags_by_chunk = conn.list_tags_for_chunks(&ids).await?;

    let response: Vec<ChunkResponse> = chunks
        .into_iter()
        .map(|chunk| {
            let tags = tags_by_chunk.remove(&chunk.id).unwrap_or_default();
            ChunkResponse::from_chunk(chunk, tags)
        })
        .collect();

    tracing::debug!(
        target: TRACING_TARGET,
        results = response.len(),
        "Tag search complete"
    );

    Ok((StatusCode::OK, Json(response)))
}

fn search_by_tags_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Search by tags")
        .description("Returns chunks whose tag set satisfies the AND/OR predicate, newest first.")
        .response::<200, Json<Vec<ChunkResponse>>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
}

/// Returns a [`Router`] with all related routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/tags/search", post_with(search_by_tags, search_by_tags_docs))
        .with_path_items(|item| item.tag("Tags"))
}
