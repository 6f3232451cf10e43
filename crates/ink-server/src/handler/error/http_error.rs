//! HTTP error handling with builder pattern for dynamic error responses.

use std::borrow::Cow;
use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::handler::response::ErrorResponse;

/// The error type for HTTP handlers in the gateway.
///
/// Every error renders as the stable envelope
/// `{"error": {"code", "message", "details?"}}` with the status code of its
/// kind. Custom messages and structured details can be attached with the
/// builder methods.
#[derive(Clone)]
#[must_use = "errors do nothing unless serialized"]
pub struct Error<'a> {
    kind: ErrorKind,
    message: Option<Cow<'a, str>>,
    details: Option<serde_json::Value>,
}

impl Error<'static> {
    /// Creates a new [`Error`] with the specified kind.
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            details: None,
        }
    }
}

impl<'a> Error<'a> {
    /// Sets a custom user-facing message for the error.
    #[inline]
    pub fn with_message(self, message: impl Into<Cow<'a, str>>) -> Self {
        Self {
            message: Some(message.into()),
            ..self
        }
    }

    /// Attaches structured details to the error.
    #[inline]
    pub fn with_details(self, details: serde_json::Value) -> Self {
        Self {
            details: Some(details),
            ..self
        }
    }

    /// Returns the error kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the custom message if present.
    #[inline]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Converts this error into a static version by cloning all borrowed data.
    pub fn into_static(self) -> Error<'static> {
        Error {
            kind: self.kind,
            message: self.message.map(|m| Cow::Owned(m.into_owned())),
            details: self.details,
        }
    }
}

impl Default for Error<'static> {
    #[inline]
    fn default() -> Self {
        Self::new(ErrorKind::default())
    }
}

impl fmt::Debug for Error<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("code", &self.kind.code())
            .field("status", &self.kind.status_code())
            .field("message", &self.message)
            .field("details", &self.details)
            .finish()
    }
}

impl fmt::Display for Error<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind.code(), self.kind.status_code())?;
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error<'_> {}

impl IntoResponse for Error<'_> {
    fn into_response(self) -> Response {
        let mut response = self.kind.response();

        if let Some(message) = self.message {
            response = response.with_message(message);
        }

        if let Some(details) = self.details {
            response = response.with_details(details);
        }

        response.into_response()
    }
}

impl From<ErrorKind> for Error<'static> {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// A specialized [`Result`] type for HTTP operations.
///
/// [`Result`]: std::result::Result
pub type Result<T, E = Error<'static>> = std::result::Result<T, E>;

/// Enumeration of all HTTP error kinds the facade can return.
///
/// Each variant corresponds to one stable error code and HTTP status from
/// the API contract.
#[must_use = "error kinds do nothing unless used to create errors"]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // 4xx Client Errors
    /// 400 Bad Request - request fails contract or a store invariant
    Validation,
    /// 401 Unauthorized - bearer token missing
    MissingAuthToken,
    /// 401 Unauthorized - bearer token invalid
    Unauthorized,
    /// 404 Not Found - referenced id does not exist
    NotFound,
    /// 408 Request Timeout - inbound deadline exceeded
    RequestTimeout,
    /// 409 Conflict - concurrent update or delete-with-references
    Conflict,
    /// 429 Too Many Requests - rate limit exceeded
    TooManyRequests,

    // 5xx Server Errors
    /// 500 Internal Server Error - unexpected condition
    #[default]
    InternalServerError,
    /// 502 Bad Gateway - upstream rejected the input
    BadGateway,
    /// 503 Service Unavailable - dependent service outage
    ServiceUnavailable,
    /// 504 Gateway Timeout - upstream deadline exceeded
    GatewayTimeout,
}

impl ErrorKind {
    /// Converts this error kind into a full [`Error`].
    #[inline]
    pub fn into_error(self) -> Error<'static> {
        Error::new(self)
    }

    /// Creates an [`Error`] with the specified message.
    #[inline]
    pub fn with_message<'a>(self, message: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_message(message)
    }

    /// Creates an [`Error`] with the specified details.
    #[inline]
    pub fn with_details(self, details: serde_json::Value) -> Error<'static> {
        Error::new(self).with_details(details)
    }

    /// Returns the HTTP status code for this error kind.
    #[inline]
    pub fn status_code(self) -> StatusCode {
        self.response().status
    }

    /// Returns the stable error code for this error kind.
    #[inline]
    pub fn code(self) -> &'static str {
        self.response().code()
    }

    /// Returns the canned response for this error kind.
    #[inline]
    pub fn response(self) -> ErrorResponse<'static> {
        match self {
            Self::Validation => ErrorResponse::VALIDATION_ERROR,
            Self::MissingAuthToken => ErrorResponse::MISSING_AUTH_TOKEN,
            Self::Unauthorized => ErrorResponse::AUTH_ERROR,
            Self::NotFound => ErrorResponse::NOT_FOUND,
            Self::RequestTimeout => ErrorResponse::REQUEST_TIMEOUT,
            Self::Conflict => ErrorResponse::CONFLICT,
            Self::TooManyRequests => ErrorResponse::RATE_LIMITED,
            Self::InternalServerError => ErrorResponse::INTERNAL_ERROR,
            Self::BadGateway => ErrorResponse::UPSTREAM_REJECTED,
            Self::ServiceUnavailable => ErrorResponse::UPSTREAM_UNAVAILABLE,
            Self::GatewayTimeout => ErrorResponse::UPSTREAM_TIMEOUT,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl IntoResponse for ErrorKind {
    #[inline]
    fn into_response(self) -> Response {
        self.response().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_http_error() {
        let error = Error::default();
        assert_eq!(error.kind(), ErrorKind::InternalServerError);
        let _ = error.into_response();
    }

    #[test]
    fn error_with_message() {
        let error = ErrorKind::NotFound.with_message("Chunk not found");
        assert_eq!(error.message(), Some("Chunk not found"));
        let _ = error.into_response();
    }

    #[test]
    fn status_mapping_matches_contract() {
        assert_eq!(ErrorKind::Validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorKind::RequestTimeout.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(ErrorKind::TooManyRequests.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ErrorKind::BadGateway.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorKind::ServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ErrorKind::GatewayTimeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn codes_are_screaming_snake() {
        let kinds = [
            ErrorKind::Validation,
            ErrorKind::MissingAuthToken,
            ErrorKind::Unauthorized,
            ErrorKind::NotFound,
            ErrorKind::RequestTimeout,
            ErrorKind::Conflict,
            ErrorKind::TooManyRequests,
            ErrorKind::InternalServerError,
            ErrorKind::BadGateway,
            ErrorKind::ServiceUnavailable,
            ErrorKind::GatewayTimeout,
        ];

        for kind in kinds {
            let code = kind.code();
            assert!(!code.is_empty());
            assert!(
                code.chars().all(|c| c.is_ascii_uppercase() || c == '_'),
                "code {code} is not SCREAMING_SNAKE"
            );
        }
    }

    #[test]
    fn std_error_trait() {
        let error = Error::new(ErrorKind::Validation);
        let _: &dyn std::error::Error = &error;
    }
}
