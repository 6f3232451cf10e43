//! JSON-RPC 2.0 wire types with newline-delimited framing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The protocol revision announced by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Parse error (malformed JSON).
pub const CODE_PARSE_ERROR: i64 = -32700;
/// The request object is not a valid JSON-RPC request.
pub const CODE_INVALID_REQUEST: i64 = -32600;
/// Unknown method.
pub const CODE_METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const CODE_INVALID_PARAMS: i64 = -32602;
/// Internal server error.
pub const CODE_INTERNAL_ERROR: i64 = -32603;

/// An inbound JSON-RPC request or notification.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol marker; must be `"2.0"`.
    pub jsonrpc: String,
    /// Request id; absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Returns whether this is a notification (no response expected).
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// An outbound JSON-RPC response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Protocol marker.
    pub jsonrpc: &'static str,
    /// Echoed request id.
    pub id: Value,
    /// Successful result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    /// Builds a success response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Renders the response as one NDJSON frame (no inner newlines).
    pub fn to_frame(&self) -> String {
        let mut frame = serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"serialization failed"}}"#.to_owned());
        frame.push('\n');
        frame
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Creates an error object.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Parse error.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(CODE_PARSE_ERROR, message)
    }

    /// Unknown method.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(CODE_METHOD_NOT_FOUND, format!("method not found: {method}"))
    }

    /// Invalid parameters.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(CODE_INVALID_PARAMS, message)
    }

    /// Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CODE_INTERNAL_ERROR, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_detection() {
        let request: JsonRpcRequest = serde_json::from_str(
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .unwrap();
        assert!(request.is_notification());

        let request: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).unwrap();
        assert!(!request.is_notification());
    }

    #[test]
    fn frames_are_single_lines() {
        let response = JsonRpcResponse::success(
            serde_json::json!(1),
            serde_json::json!({"text": "line one\nline two"}),
        );
        let frame = response.to_frame();

        assert!(frame.ends_with('\n'));
        // embedded newlines must be escaped, not literal
        assert_eq!(frame.matches('\n').count(), 1);
    }

    #[test]
    fn error_responses_echo_the_id() {
        let response =
            JsonRpcResponse::failure(serde_json::json!(7), RpcError::method_not_found("nope"));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["error"]["code"], CODE_METHOD_NOT_FOUND);
        assert!(value.get("result").is_none());
    }
}
