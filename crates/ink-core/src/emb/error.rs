//! Error handling for embedding operations.
//!
//! Errors carry a kind that classifies them as transient (worth retrying
//! with backoff) or permanent-input (surface immediately). The retry loop
//! in [`crate::RetryConfig`] consumes this classification through the
//! [`Retryable`] trait.
//!
//! [`Retryable`]: crate::Retryable

use std::time::Duration;

use crate::{BoxedError, Retryable};

/// Result type alias for embedding operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for embedding operations.
#[derive(Debug, thiserror::Error)]
#[error("{}", .message.as_ref().map(|m| format!("{}: {}", .kind, m)).unwrap_or_else(|| .kind.to_string()))]
pub struct Error {
    /// The specific kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional additional message providing more context.
    pub message: Option<String>,
    /// Optional source error for additional context.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: BoxedError) -> Self {
        self.source = Some(source);
        self
    }

    /// Returns true if this is a client error the caller must fix.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Authentication
                | ErrorKind::InvalidInput
                | ErrorKind::UnsupportedFormat
                | ErrorKind::DimensionMismatch
        )
    }

    /// Returns the suggested retry delay for retryable errors.
    pub fn retry_delay(&self) -> Option<Duration> {
        match self.kind {
            ErrorKind::RateLimited => Some(Duration::from_secs(60)),
            ErrorKind::ServiceUnavailable => Some(Duration::from_secs(10)),
            ErrorKind::NetworkError => Some(Duration::from_secs(5)),
            ErrorKind::Timeout => Some(Duration::from_secs(2)),
            _ => None,
        }
    }
}

impl Retryable for Error {
    fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RateLimited
                | ErrorKind::NetworkError
                | ErrorKind::Timeout
                | ErrorKind::ServiceUnavailable
        )
    }
}

/// Specific kinds of embedding errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Authentication with the embedding service failed.
    Authentication,

    /// The input provided to the embedding service is invalid.
    InvalidInput,

    /// The input format is not supported by the embedding service.
    UnsupportedFormat,

    /// The service returned a vector whose dimension differs from the
    /// deployment dimension.
    DimensionMismatch,

    /// Rate limit has been exceeded.
    RateLimited,

    /// A network error occurred during the request.
    NetworkError,

    /// The operation timed out.
    Timeout,

    /// The embedding service is temporarily unavailable.
    ServiceUnavailable,

    /// An internal service error occurred.
    InternalError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "Authentication failed"),
            Self::InvalidInput => write!(f, "Invalid input provided"),
            Self::UnsupportedFormat => write!(f, "Unsupported format"),
            Self::DimensionMismatch => write!(f, "Embedding dimension mismatch"),
            Self::RateLimited => write!(f, "Rate limit exceeded"),
            Self::NetworkError => write!(f, "Network error occurred"),
            Self::Timeout => write!(f, "Operation timed out"),
            Self::ServiceUnavailable => write!(f, "Service unavailable"),
            Self::InternalError => write!(f, "Internal service error"),
        }
    }
}

// Convenience constructors for common error scenarios
impl Error {
    /// Creates an authentication error.
    pub fn authentication() -> Self {
        Self::new(ErrorKind::Authentication)
    }

    /// Creates an invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates an unsupported format error.
    pub fn unsupported_format() -> Self {
        Self::new(ErrorKind::UnsupportedFormat)
    }

    /// Creates a dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::new(ErrorKind::DimensionMismatch)
            .with_message(format!("expected {expected} dimensions, got {actual}"))
    }

    /// Creates a rate limited error.
    pub fn rate_limited() -> Self {
        Self::new(ErrorKind::RateLimited)
    }

    /// Creates a network error.
    pub fn network_error() -> Self {
        Self::new(ErrorKind::NetworkError)
    }

    /// Creates a timeout error.
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout)
    }

    /// Creates a service unavailable error.
    pub fn service_unavailable() -> Self {
        Self::new(ErrorKind::ServiceUnavailable)
    }

    /// Creates an internal error.
    pub fn internal_error() -> Self {
        Self::new(ErrorKind::InternalError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_classification() {
        assert!(Error::rate_limited().is_retryable());
        assert!(Error::network_error().is_retryable());
        assert!(!Error::invalid_input().is_retryable());
        assert!(!Error::dimension_mismatch(512, 1536).is_retryable());
    }

    #[test]
    fn dimension_mismatch_message() {
        let error = Error::dimension_mismatch(512, 768);
        assert!(error.to_string().contains("512"));
        assert!(error.to_string().contains("768"));
    }
}
