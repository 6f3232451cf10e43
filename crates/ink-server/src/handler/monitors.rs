//! Liveness and component health.

use std::collections::BTreeMap;

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;

use crate::extract::Json;
use crate::handler::response::{ComponentHealth, HealthResponse};
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for health checks.
const TRACING_TARGET: &str = "ink_server::handler::monitors";

/// Reports liveness plus per-component health.
#[tracing::instrument(skip_all)]
async fn health(
    State(state): State<ServiceState>,
) -> Result<(StatusCode, Json<HealthResponse>)> {
    let mut components: BTreeMap<String, ComponentHealth> = BTreeMap::new();

    let pool = state.pg_client().pool_status();
    components.insert(
        "database".to_owned(),
        ComponentHealth {
            status: if pool.is_under_pressure() {
                "degraded".to_owned()
            } else {
                "healthy".to_owned()
            },
            message: None,
        },
    );

    let blob = match state.blob_store().health_check().await {
        Ok(()) => ComponentHealth {
            status: "healthy".to_owned(),
            message: None,
        },
        Err(e) => ComponentHealth {
            status: "unhealthy".to_owned(),
            message: Some(e.to_string()),
        },
    };
    components.insert("blob_storage".to_owned(), blob);

    components.insert(
        "vision".to_owned(),
        ComponentHealth {
            status: if state.vision().is_some() {
                "healthy".to_owned()
            } else {
                "unavailable".to_owned()
            },
            message: None,
        },
    );

    let degraded = components
        .values()
        .any(|component| component.status == "unhealthy");

    let response = HealthResponse {
        status: if degraded { "degraded" } else { "ok" }.to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        components,
    };

    tracing::trace!(target: TRACING_TARGET, status = %response.status, "Health checked");

    Ok((StatusCode::OK, Json(response)))
}

fn health_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Health")
        .description("Liveness plus per-component health.")
        .response::<200, Json<HealthResponse>>()
}

/// Returns a [`Router`] with all related routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/health", get_with(health, health_docs))
        .with_path_items(|item| item.tag("Monitors"))
}
