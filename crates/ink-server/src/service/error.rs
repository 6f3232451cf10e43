//! Domain-service error taxonomy.
//!
//! Every failure a domain service can produce maps to one of these kinds.
//! Handlers translate them into HTTP responses, the tool server into
//! JSON-RPC error content, and batch units into per-unit records with a
//! recoverability flag.

use ink_core::Retryable;

/// Result type alias for domain-service operations.
pub type ServiceResult<T, E = ServiceError> = std::result::Result<T, E>;

/// The error type shared by ingest, retrieval, batch and sync services.
#[derive(Debug, thiserror::Error)]
#[must_use = "service errors should be handled appropriately"]
pub enum ServiceError {
    /// Request fails the contract or a store invariant. Not retryable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced id does not exist. Not retryable.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// The resource family (chunk, document, batch job).
        resource: &'static str,
        /// The missing identifier.
        id: String,
    },

    /// Concurrent-update conflict or delete-with-references.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Bearer token missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A dependency is briefly unavailable; retries were already exhausted
    /// at the port layer.
    #[error("{service} temporarily unavailable: {message}")]
    UpstreamTransient {
        /// The failing dependency.
        service: &'static str,
        /// Failure description.
        message: String,
    },

    /// A dependency rejected the input; retrying cannot help.
    #[error("{service} rejected input: {message}")]
    UpstreamPermanent {
        /// The failing dependency.
        service: &'static str,
        /// Failure description.
        message: String,
    },

    /// A deadline was exceeded.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Unexpected condition; details are logged, not surfaced.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a not-found error.
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns whether a batch unit hitting this error may be retried.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTransient { .. } | Self::Timeout(_) | Self::Internal(_)
        )
    }
}

impl Retryable for ServiceError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamTransient { .. })
    }
}

impl From<ink_postgres::PgError> for ServiceError {
    fn from(error: ink_postgres::PgError) -> Self {
        use ink_postgres::PgError;

        match error {
            PgError::Validation(message) => Self::Validation(message.into_owned()),
            error if error.is_constraint_violation() => Self::Validation(error.to_string()),
            error if error.is_transient() => Self::UpstreamTransient {
                service: "database",
                message: error.to_string(),
            },
            PgError::Query(diesel::result::Error::NotFound) => Self::NotFound {
                resource: "record",
                id: String::new(),
            },
            error => Self::Internal(error.to_string()),
        }
    }
}

impl From<ink_core::emb::Error> for ServiceError {
    fn from(error: ink_core::emb::Error) -> Self {
        use ink_core::emb::ErrorKind;

        match error.kind {
            ErrorKind::DimensionMismatch => Self::Validation(error.to_string()),
            ErrorKind::Timeout => Self::Timeout(error.to_string()),
            _ if error.is_retryable() => Self::UpstreamTransient {
                service: "embedding",
                message: error.to_string(),
            },
            _ if error.is_client_error() => Self::UpstreamPermanent {
                service: "embedding",
                message: error.to_string(),
            },
            _ => Self::UpstreamTransient {
                service: "embedding",
                message: error.to_string(),
            },
        }
    }
}

impl From<ink_core::vision::Error> for ServiceError {
    fn from(error: ink_core::vision::Error) -> Self {
        use ink_core::vision::ErrorKind;

        match error.kind {
            ErrorKind::Timeout => Self::Timeout(error.to_string()),
            ErrorKind::UnsupportedImage | ErrorKind::Authentication => Self::UpstreamPermanent {
                service: "vision",
                message: error.to_string(),
            },
            _ => Self::UpstreamTransient {
                service: "vision",
                message: error.to_string(),
            },
        }
    }
}

impl From<ink_opendal::Error> for ServiceError {
    fn from(error: ink_opendal::Error) -> Self {
        use ink_opendal::ErrorKind;

        match error.kind {
            ErrorKind::NotFound => Self::NotFound {
                resource: "blob",
                id: String::new(),
            },
            ErrorKind::Config | ErrorKind::PermissionDenied => Self::UpstreamPermanent {
                service: "blob storage",
                message: error.to_string(),
            },
            ErrorKind::Transient => Self::UpstreamTransient {
                service: "blob storage",
                message: error.to_string(),
            },
            _ => Self::Internal(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverability_classification() {
        assert!(
            ServiceError::UpstreamTransient {
                service: "embedding",
                message: "503".into()
            }
            .is_recoverable()
        );
        assert!(ServiceError::Timeout("unit deadline".into()).is_recoverable());
        assert!(!ServiceError::validation("empty content").is_recoverable());
        assert!(!ServiceError::not_found("chunk", "abc").is_recoverable());
    }

    #[test]
    fn pg_validation_maps_to_validation() {
        let error = ServiceError::from(ink_postgres::PgError::validation("empty content"));
        assert!(matches!(error, ServiceError::Validation(_)));
    }

    #[test]
    fn dimension_mismatch_maps_to_validation() {
        let error = ServiceError::from(ink_core::emb::Error::dimension_mismatch(512, 768));
        assert!(matches!(error, ServiceError::Validation(_)));
    }
}
