//! Media handlers: upload, batch processing, duplicates, slide
//! recommendations.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use ink_postgres::query::TagRepository;

use crate::extract::{Json, Path, PgPool, ValidateJson};
use crate::handler::request::{
    BatchMediaRequest, BatchPathParams, FindDuplicatesRequest, RecommendSlidesRequest,
    UploadMediaRequest,
};
use crate::handler::response::{
    BatchAccepted, DuplicateGroupResponse, ErrorResponse, FindDuplicatesResponse, SearchResponse,
    UploadResponse,
};
use crate::handler::search::hits_to_response;
use crate::handler::response::ChunkResponse;
use crate::handler::{ErrorKind, Result};
use crate::service::{
    BatchItem, BatchJob, BatchOptions, MediaIngest, ServiceState, SlideRequest,
};

/// Tracing target for media operations.
const TRACING_TARGET: &str = "ink_server::handler::media";

fn decode_base64(data: &str) -> Result<Bytes> {
    BASE64
        .decode(data.trim())
        .map(Bytes::from)
        .map_err(|e| {
            ErrorKind::Validation
                .with_message(format!("data is not valid base64: {e}"))
                .into_static()
        })
}

/// Uploads an image, deduplicating by content hash.
#[tracing::instrument(skip_all, fields(file_name = %request.file_name))]
async fn upload_media(
    State(state): State<ServiceState>,
    ValidateJson(request): ValidateJson<UploadMediaRequest>,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    tracing::debug!(target: TRACING_TARGET, "Uploading media");

    if let Some(storage_type) = &request.storage_type {
        let configured = state.blob_store().backend_name();
        if storage_type != configured {
            return Err(ErrorKind::Validation
                .with_message(format!(
                    "storage_type {storage_type} does not match the configured backend {configured}"
                ))
                .into_static());
        }
    }

    let data = decode_base64(&request.data)?;
    let outcome = state
        .ingest()
        .ingest_media(MediaIngest {
            data,
            file_name: request.file_name,
            page: request.page_id,
            tags: request.tags.clone(),
            auto_analyze: request.auto_analyze,
            auto_embed: request.auto_embed,
            language: request.language,
            detail: request.detail,
        })
        .await?;

    // dedup reuses the existing chunk and reports 200 instead of 201
    let status = if outcome.deduplicated {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    let mut conn = state.pg_client().get_connection().await?;
    let tags = conn.list_chunk_tags(outcome.chunk.id).await?;
    drop(conn);

    tracing::info!(
        target: TRACING_TARGET,
        chunk_id = %outcome.chunk.id,
        deduplicated = outcome.deduplicated,
        "Media upload complete"
    );

    Ok((
        status,
        Json(UploadResponse {
            chunk: ChunkResponse::from_chunk(outcome.chunk, tags),
            deduplicated: outcome.deduplicated,
        }),
    ))
}

fn upload_media_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Upload media")
        .description(
            "Stores an image, optionally analysing and embedding it. \
             Identical bytes resolve to the existing chunk with status 200.",
        )
        .response::<201, Json<UploadResponse>>()
        .response::<200, Json<UploadResponse>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
        .response::<502, Json<ErrorResponse>>()
}

/// Starts a batch media ingest.
#[tracing::instrument(skip_all, fields(files = request.files.len()))]
async fn start_media_batch(
    State(state): State<ServiceState>,
    ValidateJson(request): ValidateJson<BatchMediaRequest>,
) -> Result<(StatusCode, Json<BatchAccepted>)> {
    tracing::debug!(target: TRACING_TARGET, "Starting media batch");

    let mut items = Vec::with_capacity(request.files.len());
    for file in request.files {
        items.push(BatchItem::Inline {
            data: decode_base64(&file.data)?,
            file_name: file.file_name,
        });
    }

    let job_id = state
        .batch()
        .start_batch(
            items,
            request.folder.map(Into::into),
            BatchOptions {
                page: request.page_id,
                tags: request.tags,
                auto_analyze: request.auto_analyze,
                auto_embed: request.auto_embed,
                concurrency: request.concurrency,
                language: request.language,
                detail: request.detail,
            },
        )
        .await?;

    Ok((StatusCode::ACCEPTED, Json(BatchAccepted { job_id })))
}

fn start_media_batch_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Start media batch")
        .description("Queues a folder- or list-scale media ingest and returns the job id.")
        .response::<202, Json<BatchAccepted>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
}

/// Returns a batch job's status and progress.
#[tracing::instrument(skip_all, fields(job_id = %path_params.id))]
async fn get_media_batch(
    State(state): State<ServiceState>,
    Path(path_params): Path<BatchPathParams>,
) -> Result<(StatusCode, Json<BatchJob>)> {
    let job = state.batch().job(path_params.id).await?;
    Ok((StatusCode::OK, Json(job)))
}

fn get_media_batch_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get batch status")
        .description("Returns job progress, per-unit results and recoverable errors.")
        .response::<200, Json<BatchJob>>()
        .response::<401, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Cancels a batch job.
#[tracing::instrument(skip_all, fields(job_id = %path_params.id))]
async fn cancel_media_batch(
    State(state): State<ServiceState>,
    Path(path_params): Path<BatchPathParams>,
) -> Result<StatusCode> {
    state.batch().cancel(path_params.id).await?;
    tracing::info!(target: TRACING_TARGET, "Batch cancel requested");
    Ok(StatusCode::ACCEPTED)
}

fn cancel_media_batch_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Cancel batch")
        .description("Stops launching new units; in-flight units finish within the grace window.")
        .response_with::<202, (), _>(|res| res.description("Cancellation requested."))
        .response::<401, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Pauses a batch job.
#[tracing::instrument(skip_all, fields(job_id = %path_params.id))]
async fn pause_media_batch(
    State(state): State<ServiceState>,
    Path(path_params): Path<BatchPathParams>,
) -> Result<StatusCode> {
    state.batch().pause(path_params.id).await?;
    Ok(StatusCode::ACCEPTED)
}

fn pause_media_batch_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Pause batch")
        .description("Stops dispatching new units until resumed.")
        .response_with::<202, (), _>(|res| res.description("Job paused."))
        .response::<401, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Resumes a paused batch job.
#[tracing::instrument(skip_all, fields(job_id = %path_params.id))]
async fn resume_media_batch(
    State(state): State<ServiceState>,
    Path(path_params): Path<BatchPathParams>,
) -> Result<StatusCode> {
    state.batch().resume(path_params.id).await?;
    Ok(StatusCode::ACCEPTED)
}

fn resume_media_batch_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Resume batch")
        .description("Resumes unit dispatching of a paused job.")
        .response_with::<202, (), _>(|res| res.description("Job resumed."))
        .response::<401, Json<ErrorResponse>>()
        .response::<404, Json<ErrorResponse>>()
}

/// Groups duplicate and near-duplicate images.
#[tracing::instrument(skip_all)]
async fn find_duplicates(
    State(state): State<ServiceState>,
    PgPool(mut conn): PgPool,
    ValidateJson(request): ValidateJson<FindDuplicatesRequest>,
) -> Result<(StatusCode, Json<FindDuplicatesResponse>)> {
    tracing::debug!(target: TRACING_TARGET, "Grouping duplicates");

    let groups = state
        .retrieval()
        .find_duplicates(request.similarity_threshold, request.min_group_size)
        .await?;

    let mut response_groups = Vec::with_capacity(groups.len());
    for group in groups {
        let ids: Vec<uuid::Uuid> = group.chunks.iter().map(|c| c.id).collect();
        let mut tags_by_chunk = conn.list_tags_for_chunks(&ids).await?;
        response_groups.push(DuplicateGroupResponse {
            chunks: group
                .chunks
                .into_iter()
                .map(|chunk| {
                    let tags = tags_by_chunk.remove(&chunk.id).unwrap_or_default();
                    ChunkResponse::from_chunk(chunk, tags)
                })
                .collect(),
            exact: group.exact,
        });
    }

    Ok((
        StatusCode::OK,
        Json(FindDuplicatesResponse {
            total_groups: response_groups.len(),
            groups: response_groups,
        }),
    ))
}

fn find_duplicates_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Find duplicate images")
        .description("Groups images whose blobs are identical or whose embeddings exceed the similarity threshold.")
        .response::<200, Json<FindDuplicatesResponse>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
}

/// Recommends images for a slide.
#[tracing::instrument(skip_all)]
async fn recommend_slides(
    State(state): State<ServiceState>,
    ValidateJson(request): ValidateJson<RecommendSlidesRequest>,
) -> Result<(StatusCode, Json<SearchResponse>)> {
    tracing::debug!(target: TRACING_TARGET, "Recommending slide images");

    let hits = state
        .retrieval()
        .recommend_for_slide(SlideRequest {
            title: request.slide_title,
            content: request.slide_content,
            context: request.slide_context,
            max_suggestions: request.max_suggestions,
            min_relevance: request.min_relevance,
        })
        .await?;

    let response = hits_to_response(&state, hits).await?;
    Ok((StatusCode::OK, Json(response)))
}

fn recommend_slides_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Recommend slide images")
        .description(
            "Searches the image partition with a title-weighted text query and \
             annotates every result with a match reason.",
        )
        .response::<200, Json<SearchResponse>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
}

/// Returns a [`Router`] with all related routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/media/upload", post_with(upload_media, upload_media_docs))
        .api_route(
            "/media/batch",
            post_with(start_media_batch, start_media_batch_docs),
        )
        .api_route(
            "/media/batch/{id}",
            get_with(get_media_batch, get_media_batch_docs),
        )
        .api_route(
            "/media/batch/{id}/cancel",
            post_with(cancel_media_batch, cancel_media_batch_docs),
        )
        .api_route(
            "/media/batch/{id}/pause",
            post_with(pause_media_batch, pause_media_batch_docs),
        )
        .api_route(
            "/media/batch/{id}/resume",
            post_with(resume_media_batch, resume_media_batch_docs),
        )
        .api_route(
            "/media/find-duplicates",
            post_with(find_duplicates, find_duplicates_docs),
        )
        .api_route(
            "/media/recommend-slides",
            post_with(recommend_slides, recommend_slides_docs),
        )
        .with_path_items(|item| item.tag("Media"))
}
