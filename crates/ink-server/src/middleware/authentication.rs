//! Bearer-token authentication middleware.
//!
//! The gateway is single-tenant: one opaque bearer token, configured at
//! startup, guards every private route. Token comparison is a plain
//! equality check on the opaque value.

use axum::extract::{FromRef, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use axum_extra::typed_header::TypedHeaderRejection;

use crate::handler::{Error, ErrorKind};
use crate::service::ServiceState;

/// Tracing target for authentication decisions.
const TRACING_TARGET: &str = "ink_server::middleware::authentication";

/// The configured bearer token, opaque to the gateway.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl FromRef<ServiceState> for BearerToken {
    fn from_ref(state: &ServiceState) -> Self {
        state.bearer_token()
    }
}

/// Rejects requests whose bearer token is missing or does not match.
pub async fn require_bearer_auth(
    State(expected): State<BearerToken>,
    header: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    request: Request,
    next: Next,
) -> Result<Response, Error<'static>> {
    let Ok(TypedHeader(authorization)) = header else {
        tracing::debug!(target: TRACING_TARGET, "missing bearer token");
        return Err(ErrorKind::MissingAuthToken.into_error());
    };

    if authorization.token() != expected.0 {
        tracing::debug!(target: TRACING_TARGET, "invalid bearer token");
        return Err(ErrorKind::Unauthorized.into_error());
    }

    Ok(next.run(request).await)
}
