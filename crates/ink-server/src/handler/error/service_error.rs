//! Domain-service error to HTTP error conversion.

use crate::handler::{Error, ErrorKind};
use crate::service::ServiceError;

/// Tracing target for service error mapping.
const TRACING_TARGET: &str = "ink_server::handler::service_error";

impl From<ServiceError> for Error<'static> {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Validation(message) => {
                ErrorKind::Validation.with_message(message).into_static()
            }
            ServiceError::NotFound { resource, id } => {
                let error = ErrorKind::NotFound.with_message(format!("{resource} not found"));
                if id.is_empty() {
                    error.into_static()
                } else {
                    error.with_details(serde_json::json!({ "id": id })).into_static()
                }
            }
            ServiceError::Conflict(message) => {
                ErrorKind::Conflict.with_message(message).into_static()
            }
            ServiceError::Auth(message) => {
                ErrorKind::Unauthorized.with_message(message).into_static()
            }
            ServiceError::UpstreamTransient { service, message } => {
                tracing::error!(
                    target: TRACING_TARGET,
                    service = service,
                    error = %message,
                    "upstream temporarily unavailable"
                );
                ErrorKind::ServiceUnavailable
                    .with_details(serde_json::json!({ "service": service }))
            }
            ServiceError::UpstreamPermanent { service, message } => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    service = service,
                    error = %message,
                    "upstream rejected input"
                );
                ErrorKind::BadGateway
                    .with_message(message)
                    .with_details(serde_json::json!({ "service": service }))
                    .into_static()
            }
            ServiceError::Timeout(message) => {
                tracing::warn!(target: TRACING_TARGET, error = %message, "upstream timeout");
                ErrorKind::GatewayTimeout.into_error()
            }
            ServiceError::Internal(message) => {
                tracing::error!(target: TRACING_TARGET, error = %message, "internal service error");
                ErrorKind::InternalServerError.into_error()
            }
        }
    }
}
