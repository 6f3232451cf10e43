//! Chunk CRUD handlers.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;
use ink_postgres::query::{ChunkRepository, TagRepository};

use crate::extract::{Json, Path, PgPool, ValidateJson};
use crate::handler::request::{
    BatchCreateChunks, ChangeDocumentScope, ChunkPathParams, CreateChunk, UpdateChunkRequest,
};
use crate::handler::response::{ChunkResponse, ErrorResponse};
use crate::handler::{ErrorKind, Result};
use crate::service::{GatewayEvent, ServiceState, WriteDomain};

/// Tracing target for chunk operations.
const TRACING_TARGET: &str = "ink_server::handler::chunks";

/// Creates a text chunk.
#[tracing::instrument(skip_all)]
async fn create_chunk(
    State(state): State<ServiceState>,
    ValidateJson(request): ValidateJson<CreateChunk>,
) -> Result<(StatusCode, Json<ChunkResponse>)> {
    tracing::debug!(target: TRACING_TARGET, "Creating chunk");

    let tags = request.tags.clone();
    let outcome = state.ingest().ingest_text(request.into_ingest()).await?;

    tracing::info!(
        target: TRACING_TARGET,
        chunk_id = %outcome.chunk.id,
        "Chunk created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ChunkResponse::from_chunk(outcome.chunk, tags)),
    ))
}

fn create_chunk_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Create chunk")
        .description("Creates a text chunk, optionally embedding it for semantic search.")
        .response::<201, Json<ChunkResponse>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
}

/// Creates many chunks in one transaction.
#[tracing::instrument(skip_all)]
async fn create_chunks_batch(
    State(state): State<ServiceState>,
    ValidateJson(request): ValidateJson<BatchCreateChunks>,
) -> Result<(StatusCode, Json<Vec<ChunkResponse>>)> {
    tracing::debug!(
        target: TRACING_TARGET,
        count = request.chunks.len(),
        "Creating chunk batch"
    );

    // all-or-nothing: ingest each chunk through the pipeline would embed
    // serially but commit separately, so the batch goes through the store
    // in one transaction with pre-computed payloads
    let mut prepared = Vec::with_capacity(request.chunks.len());
    for chunk_request in request.chunks {
        let tags = chunk_request.tags.clone();
        let ingest = chunk_request.into_ingest();
        let new_chunk = state.ingest().prepare_text(ingest).await?;
        prepared.push((new_chunk, tags));
    }

    let dimensions = state.ingest().vector_dimensions();
    let mut conn = state.pg_client().get_connection().await?;
    let chunks = conn.create_chunks(prepared.clone(), dimensions).await?;
    drop(conn);

    state.cache().invalidate_for_write(&WriteDomain::default()).await?;
    for chunk in &chunks {
        state.events().publish(GatewayEvent::Ingested {
            chunk_id: chunk.id,
            kind: crate::service::IngestedKind::Text,
        });
    }

    let responses: Vec<ChunkResponse> = chunks
        .into_iter()
        .zip(prepared.into_iter().map(|(_, tags)| tags))
        .map(|(chunk, tags)| ChunkResponse::from_chunk(chunk, tags))
        .collect();

    tracing::info!(
        target: TRACING_TARGET,
        count = responses.len(),
        "Chunk batch created"
    );

    Ok((StatusCode::CREATED, Json(responses)))
}

fn create_chunks_batch_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Create chunks in batch")
        .description("Creates many chunks in one all-or-nothing transaction, ids in input order.")
        .response::<201, Json<Vec<ChunkResponse>>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
}

/// Fetches a chunk by id.
#[tracing::instrument(skip_all, fields(chunk_id = %path_params.id))]
async fn get_chunk(
    PgPool(mut conn): PgPool,
    Path(path_params): Path<ChunkPathParams>,
) -> Result<(StatusCode, Json<ChunkResponse>)> {
    let chunk = conn
        .find_chunk_by_id(path_params.id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.with_message("Chunk not found"))?;
    let tags = conn.list_chunk_tags(path_params.id).await?;

    Ok((StatusCode::OK, Json(ChunkResponse::from_chunk(chunk, tags))))
}

fn get_chunk_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get chunk")
        .description("Returns a chunk with its tag set.")
        .response::<200, Json<ChunkResponse>>()
        .response::<401, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Updates a chunk.
#[tracing::instrument(skip_all, fields(chunk_id = %path_params.id))]
async fn update_chunk(
    State(state): State<ServiceState>,
    PgPool(mut conn): PgPool,
    Path(path_params): Path<ChunkPathParams>,
    ValidateJson(request): ValidateJson<UpdateChunkRequest>,
) -> Result<(StatusCode, Json<ChunkResponse>)> {
    tracing::debug!(target: TRACING_TARGET, "Updating chunk");

    // verify existence for a clean 404 before the store validates the patch
    let current = conn
        .find_chunk_by_id(path_params.id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.with_message("Chunk not found"))?;

    let (patch, tags) = request.into_patch();
    let dimensions = state.ingest().vector_dimensions();
    let chunk = conn
        .update_chunk(path_params.id, patch, tags.clone(), dimensions)
        .await?;
    let tags = match tags {
        Some(tags) => tags,
        None => conn.list_chunk_tags(path_params.id).await?,
    };
    drop(conn);

    state
        .cache()
        .invalidate_for_write(&WriteDomain {
            tags: tags.clone(),
            page: current.page_id,
            kind: current.vector_kind,
        })
        .await?;

    tracing::info!(target: TRACING_TARGET, "Chunk updated");

    Ok((StatusCode::OK, Json(ChunkResponse::from_chunk(chunk, tags))))
}

fn update_chunk_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Update chunk")
        .description("Applies a partial update; absent fields are untouched.")
        .response::<200, Json<ChunkResponse>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Deletes a chunk, cascading through its subtree.
#[tracing::instrument(skip_all, fields(chunk_id = %path_params.id))]
async fn delete_chunk(
    State(state): State<ServiceState>,
    PgPool(mut conn): PgPool,
    Path(path_params): Path<ChunkPathParams>,
) -> Result<StatusCode> {
    tracing::debug!(target: TRACING_TARGET, "Deleting chunk");

    let deleted = conn.delete_chunk(path_params.id).await?;
    drop(conn);

    if deleted.is_empty() {
        return Err(ErrorKind::NotFound.with_message("Chunk not found").into_static());
    }

    state.cache().invalidate_for_write(&WriteDomain::default()).await?;
    state.events().publish(GatewayEvent::Deleted { chunk_ids: deleted });

    tracing::info!(target: TRACING_TARGET, "Chunk deleted");

    Ok(StatusCode::NO_CONTENT)
}

fn delete_chunk_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Delete chunk")
        .description("Deletes the chunk and every descendant, removing tag edges and hierarchy rows.")
        .response_with::<204, (), _>(|res| res.description("Chunk deleted."))
        .response::<401, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Moves a chunk to another document.
#[tracing::instrument(skip_all, fields(chunk_id = %path_params.id))]
async fn change_document_scope(
    PgPool(mut conn): PgPool,
    Path(path_params): Path<ChunkPathParams>,
    ValidateJson(request): ValidateJson<ChangeDocumentScope>,
) -> Result<(StatusCode, Json<ChunkResponse>)> {
    let _ = conn
        .find_chunk_by_id(path_params.id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.with_message("Chunk not found"))?;

    let chunk = conn
        .set_chunk_document_scope(path_params.id, request.document_id, request.scope)
        .await?;
    let tags = conn.list_chunk_tags(path_params.id).await?;

    tracing::info!(target: TRACING_TARGET, "Chunk document scope changed");

    Ok((StatusCode::OK, Json(ChunkResponse::from_chunk(chunk, tags))))
}

fn change_document_scope_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Change document scope")
        .description("Moves a chunk to another document id and scope.")
        .response::<200, Json<ChunkResponse>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Returns a [`Router`] with all related routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route(
            "/chunks",
            post_with(create_chunk, create_chunk_docs),
        )
        .api_route(
            "/chunks/batch",
            post_with(create_chunks_batch, create_chunks_batch_docs),
        )
        .api_route(
            "/chunks/{id}",
            get_with(get_chunk, get_chunk_docs)
                .put_with(update_chunk, update_chunk_docs)
                .delete_with(delete_chunk, delete_chunk_docs),
        )
        .api_route(
            "/chunks/{id}/document-scope",
            put_with(change_document_scope, change_document_scope_docs),
        )
        .with_path_items(|item| item.tag("Chunks"))
}
