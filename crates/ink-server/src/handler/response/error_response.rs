//! The stable JSON error envelope.

use std::borrow::Cow;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use schemars::JsonSchema;
use serde::Serialize;

/// HTTP error response rendering the envelope
/// `{"error": {"code", "message", "details?"}}`.
#[must_use = "error responses do nothing unless serialized"]
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ErrorResponse<'a> {
    /// The error body.
    pub error: ErrorBody<'a>,
    /// HTTP status code (not serialized in JSON)
    #[serde(skip)]
    #[schemars(skip)]
    pub status: StatusCode,
}

/// Body of the error envelope.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ErrorBody<'a> {
    /// Stable SCREAMING_SNAKE error code.
    pub code: Cow<'a, str>,
    /// Human-readable message safe for client display.
    pub message: Cow<'a, str>,
    /// Optional structured context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl<'a> ErrorResponse<'a> {
    // 4xx Client Errors
    pub const AUTH_ERROR: Self = Self::new(
        "AUTH_ERROR",
        "Invalid or expired bearer token",
        StatusCode::UNAUTHORIZED,
    );
    pub const CONFLICT: Self = Self::new(
        "CONFLICT",
        "The request conflicts with the current state of the resource",
        StatusCode::CONFLICT,
    );
    pub const MISSING_AUTH_TOKEN: Self = Self::new(
        "AUTH_ERROR",
        "Authentication is required to access this resource",
        StatusCode::UNAUTHORIZED,
    );
    pub const NOT_FOUND: Self = Self::new(
        "NOT_FOUND",
        "The requested resource was not found",
        StatusCode::NOT_FOUND,
    );
    pub const RATE_LIMITED: Self = Self::new(
        "RATE_LIMITED",
        "Too many requests. Please slow down and try again later",
        StatusCode::TOO_MANY_REQUESTS,
    );
    pub const REQUEST_TIMEOUT: Self = Self::new(
        "REQUEST_TIMEOUT",
        "The request did not complete within its deadline",
        StatusCode::REQUEST_TIMEOUT,
    );
    pub const VALIDATION_ERROR: Self = Self::new(
        "VALIDATION_ERROR",
        "The request could not be processed due to invalid data",
        StatusCode::BAD_REQUEST,
    );
    // 5xx Server Errors
    pub const INTERNAL_ERROR: Self = Self::new(
        "INTERNAL_ERROR",
        "An internal server error occurred. Please try again later",
        StatusCode::INTERNAL_SERVER_ERROR,
    );
    pub const UPSTREAM_REJECTED: Self = Self::new(
        "UPSTREAM_REJECTED",
        "A dependent service rejected the request input",
        StatusCode::BAD_GATEWAY,
    );
    pub const UPSTREAM_TIMEOUT: Self = Self::new(
        "UPSTREAM_TIMEOUT",
        "A dependent service did not respond in time",
        StatusCode::GATEWAY_TIMEOUT,
    );
    pub const UPSTREAM_UNAVAILABLE: Self = Self::new(
        "UPSTREAM_UNAVAILABLE",
        "A dependent service is temporarily unavailable",
        StatusCode::SERVICE_UNAVAILABLE,
    );

    /// Creates a new error response.
    #[inline]
    pub const fn new(code: &'a str, message: &'a str, status: StatusCode) -> Self {
        Self {
            error: ErrorBody {
                code: Cow::Borrowed(code),
                message: Cow::Borrowed(message),
                details: None,
            },
            status,
        }
    }

    /// Returns the stable code.
    #[inline]
    pub fn code(&self) -> &'a str {
        match self.error.code {
            Cow::Borrowed(code) => code,
            Cow::Owned(_) => "INTERNAL_ERROR",
        }
    }

    /// Replaces the user-facing message.
    pub fn with_message(mut self, message: impl Into<Cow<'a, str>>) -> Self {
        self.error.message = message.into();
        self
    }

    /// Attaches structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }
}

impl Default for ErrorResponse<'_> {
    #[inline]
    fn default() -> Self {
        Self::INTERNAL_ERROR
    }
}

impl IntoResponse for ErrorResponse<'_> {
    #[inline]
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shape() {
        let response = ErrorResponse::VALIDATION_ERROR
            .with_message("pageSize must be positive")
            .with_details(serde_json::json!({"pageSize": 0}));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["message"], "pageSize must be positive");
        assert_eq!(json["error"]["details"]["pageSize"], 0);
        // status never leaks into the body
        assert!(json.get("status").is_none());
    }

    #[test]
    fn details_are_omitted_when_absent() {
        let json = serde_json::to_value(&ErrorResponse::NOT_FOUND).unwrap();
        assert!(json["error"].get("details").is_none());
    }
}
