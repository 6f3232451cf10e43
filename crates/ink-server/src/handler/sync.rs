//! Sync handler for editor clients.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;

use crate::extract::{Json, ValidateJson};
use crate::handler::request::SyncRequest;
use crate::handler::response::ErrorResponse;
use crate::handler::Result;
use crate::service::{ServiceState, SyncReport};

/// Tracing target for sync operations.
const TRACING_TARGET: &str = "ink_server::handler::sync";

/// Applies a client change stream.
#[tracing::instrument(skip_all, fields(changes = request.changes.len(), batched = request.batched))]
async fn sync_chunks(
    State(state): State<ServiceState>,
    ValidateJson(request): ValidateJson<SyncRequest>,
) -> Result<(StatusCode, Json<SyncReport>)> {
    tracing::debug!(target: TRACING_TARGET, "Applying sync changes");

    let (changes, options) = request.into_parts();
    let report = state.sync().apply_changes(changes, options).await?;

    // unresolved conflicts surface as 409 with the full report attached so
    // the client can pick a resolution
    let status = if report.conflicts.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    };

    Ok((status, Json(report)))
}

fn sync_chunks_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Sync chunk changes")
        .description(
            "Applies a stream of create/update/delete records with optimistic \
             concurrency; conflicts resolve per the requested strategy.",
        )
        .response::<200, Json<SyncReport>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
        .response::<409, Json<SyncReport>>()
}

/// Returns a [`Router`] with all related routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/sync/chunks", post_with(sync_chunks, sync_chunks_docs))
        .with_path_items(|item| item.tag("Sync"))
}
