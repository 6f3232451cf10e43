//! Error handling for vision analysis operations.

use crate::{BoxedError, Retryable};

/// Result type alias for vision operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for vision operations.
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

/// Specific kinds of vision errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Authentication with the vision service failed.
    Authentication,

    /// The image could not be fetched or decoded by the service.
    UnsupportedImage,

    /// The model response could not be parsed into an analysis.
    MalformedResponse,

    /// Rate limit has been exceeded.
    RateLimited,

    /// A network error occurred during the request.
    NetworkError,

    /// The operation timed out.
    Timeout,

    /// The vision service is temporarily unavailable.
    ServiceUnavailable,

    /// An internal service error occurred.
    InternalError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "Authentication failed"),
            Self::UnsupportedImage => write!(f, "Unsupported or unreadable image"),
            Self::MalformedResponse => write!(f, "Malformed analysis response"),
            Self::RateLimited => write!(f, "Rate limit exceeded"),
            Self::NetworkError => write!(f, "Network error occurred"),
            Self::Timeout => write!(f, "Operation timed out"),
            Self::ServiceUnavailable => write!(f, "Service unavailable"),
            Self::InternalError => write!(f, "Internal service error"),
        }
    }
}

impl Error {
    /// Creates an authentication error.
    pub fn authentication() -> Self {
        Self::new(ErrorKind::Authentication)
    }

    /// Creates an unsupported image error.
    pub fn unsupported_image() -> Self {
        Self::new(ErrorKind::UnsupportedImage)
    }

    /// Creates a malformed response error.
    pub fn malformed_response() -> Self {
        Self::new(ErrorKind::MalformedResponse)
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
