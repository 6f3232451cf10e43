//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! Private routes are guarded by the bearer-token middleware; the health
//! endpoint stays public. Everything mounts under `/api/v1`.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod chunks;
mod documents;
mod error;
mod media;
mod monitors;
pub mod request;
pub mod response;
mod search;
mod sync;
mod tags;

use aide::axum::ApiRouter;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::response::ErrorResponse;
use crate::middleware::require_bearer_auth;
use crate::service::ServiceState;

#[inline]
async fn fallback() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns an [`ApiRouter`] with all private routes.
fn private_routes() -> ApiRouter<ServiceState> {
    ApiRouter::new()
        .merge(chunks::routes())
        .merge(search::routes())
        .merge(tags::routes())
        .merge(media::routes())
        .merge(documents::routes())
        .merge(sync::routes())
}

/// Returns an [`ApiRouter`] with all public routes.
fn public_routes() -> ApiRouter<ServiceState> {
    monitors::routes()
}

/// Returns an [`ApiRouter`] with all routes under `/api/v1`.
pub fn routes(state: ServiceState) -> ApiRouter<ServiceState> {
    let require_bearer_auth = from_fn_with_state(state, require_bearer_auth);

    let api = ApiRouter::new()
        .merge(private_routes().route_layer(require_bearer_auth))
        .merge(public_routes());

    ApiRouter::new().nest("/api/v1", api).fallback(fallback)
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum_test::TestServer;
    use ink_core::mock::{MockEmbedder, MockVision};

    use crate::handler::routes;
    use crate::service::{AiPorts, ServiceConfig, ServiceState};

    /// Returns a state wired with mock ports and a temp-dir blob store.
    pub async fn create_test_state(blob_root: &std::path::Path) -> anyhow::Result<ServiceState> {
        let config = ServiceConfig {
            blob: ink_opendal::StorageConfig::Fs(ink_opendal::FsConfig {
                root: blob_root.to_string_lossy().into_owned(),
            }),
            auth_token: "test-token".to_owned(),
            ..Default::default()
        };

        let embedder = Arc::new(MockEmbedder::new(config.db.vector_dimensions));
        let ports = AiPorts {
            text_embedder: embedder.clone(),
            image_embedder: embedder,
            vision: Some(Arc::new(MockVision::new())),
        };

        Ok(ServiceState::from_config(config, ports).await?)
    }

    /// Returns a new [`TestServer`] over the full route tree.
    pub async fn create_test_server(state: ServiceState) -> anyhow::Result<TestServer> {
        let mut api = aide::openapi::OpenApi::default();
        let app = routes(state.clone())
            .finish_api(&mut api)
            .with_state(state);
        Ok(TestServer::new(app)?)
    }

    #[tokio::test]
    async fn health_is_public() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let state = create_test_state(dir.path()).await?;
        let server = create_test_server(state).await?;

        let response = server.get("/api/v1/health").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert!(body["components"]["database"]["status"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn private_routes_require_bearer() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let state = create_test_state(dir.path()).await?;
        let server = create_test_server(state).await?;

        let response = server
            .post("/api/v1/chunks")
            .json(&serde_json::json!({ "content": "hello" }))
            .await;
        response.assert_status_unauthorized();

        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["code"], "AUTH_ERROR");
        Ok(())
    }

    #[tokio::test]
    async fn wrong_bearer_is_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let state = create_test_state(dir.path()).await?;
        let server = create_test_server(state).await?;

        let response = server
            .post("/api/v1/tags/search")
            .authorization_bearer("not-the-token")
            .json(&serde_json::json!({ "tags": [uuid::Uuid::now_v7()] }))
            .await;
        response.assert_status_unauthorized();
        Ok(())
    }

    #[tokio::test]
    async fn unknown_routes_render_the_envelope() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let state = create_test_state(dir.path()).await?;
        let server = create_test_server(state).await?;

        let response = server.get("/api/v1/nope").await;
        response.assert_status_not_found();

        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        Ok(())
    }
}
