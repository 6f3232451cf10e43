//! The NDJSON transport loop and protocol method dispatch.

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, RpcError, PROTOCOL_VERSION};
use crate::registry::ToolRegistry;
use crate::TRACING_TARGET;

/// Server name announced in `initialize`.
const SERVER_NAME: &str = "ink-gateway";

/// The single static resource the server exposes.
const HEALTH_RESOURCE_URI: &str = "ink://health";

/// The tool server.
///
/// Single-client and single-threaded with respect to the transport: one
/// request is read, dispatched and answered at a time. Internal dispatch
/// may fan out through the shared gateway services.
pub struct McpServer {
    state: ink_server::service::ServiceState,
    registry: ToolRegistry,
}

impl McpServer {
    /// Creates a server over the given state and registry.
    pub fn new(state: ink_server::service::ServiceState, registry: ToolRegistry) -> Self {
        Self { state, registry }
    }

    /// Runs the request loop until the input stream closes.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(
            target: TRACING_TARGET,
            tools = self.registry.len(),
            "Tool server started"
        );

        let mut lines = BufReader::new(reader).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some(response) = self.handle_line(line).await else {
                continue;
            };

            writer.write_all(response.to_frame().as_bytes()).await?;
            writer.flush().await?;
        }

        tracing::info!(target: TRACING_TARGET, "Transport closed, tool server stopping");
        Ok(())
    }

    /// Handles one frame; `None` means no response is due (notification).
    async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(error) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    RpcError::parse_error(error.to_string()),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::failure(
                request.id.unwrap_or(Value::Null),
                RpcError::new(
                    crate::protocol::CODE_INVALID_REQUEST,
                    "jsonrpc must be \"2.0\"",
                ),
            ));
        }

        if request.is_notification() {
            tracing::trace!(
                target: TRACING_TARGET,
                method = %request.method,
                "Notification received"
            );
            return None;
        }

        let id = request.id.clone().unwrap_or(Value::Null);
        let params = request.params.unwrap_or(Value::Null);

        tracing::debug!(
            target: TRACING_TARGET,
            method = %request.method,
            "Dispatching request"
        );

        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "tools/list" => Ok(self.registry.list()),
            "tools/call" => self.tools_call(params).await,
            "resources/list" => Ok(self.resources_list()),
            "resources/read" => self.resources_read(params).await,
            "prompts/list" => Ok(self.prompts_list()),
            "prompts/get" => self.prompts_get(params),
            method => Err(RpcError::method_not_found(method)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": {},
                "prompts": {},
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    async fn tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires a name"))?;
        let args = params.get("arguments").cloned().unwrap_or(json!({}));

        self.registry
            .call(name, args)
            .await
            .ok_or_else(|| RpcError::invalid_params(format!("unknown tool: {name}")))
    }

    fn resources_list(&self) -> Value {
        json!({
            "resources": [{
                "uri": HEALTH_RESOURCE_URI,
                "name": "Gateway health",
                "description": "Component health of the Ink gateway",
                "mimeType": "application/json",
            }],
        })
    }

    async fn resources_read(&self, params: Value) -> Result<Value, RpcError> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("resources/read requires a uri"))?;

        if uri != HEALTH_RESOURCE_URI {
            return Err(RpcError::invalid_params(format!("unknown resource: {uri}")));
        }

        let pool = self.state.pg_client().pool_status();
        let body = json!({
            "database": {
                "size": pool.size,
                "available": pool.available,
                "waiting": pool.waiting,
            },
            "vision": self.state.vision().is_some(),
        });

        Ok(json!({
            "contents": [{
                "uri": uri,
                "mimeType": "application/json",
                "text": body.to_string(),
            }],
        }))
    }

    fn prompts_list(&self) -> Value {
        json!({
            "prompts": [{
                "name": "summarize_search",
                "description": "Summarize the results of a knowledge-base search",
                "arguments": [{
                    "name": "query",
                    "description": "The search query to run and summarize",
                    "required": true,
                }],
            }],
        })
    }

    fn prompts_get(&self, params: Value) -> Result<Value, RpcError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("prompts/get requires a name"))?;

        if name != "summarize_search" {
            return Err(RpcError::invalid_params(format!("unknown prompt: {name}")));
        }

        let query = params
            .get("arguments")
            .and_then(|args| args.get("query"))
            .and_then(Value::as_str)
            .unwrap_or("");

        Ok(json!({
            "description": "Summarize the results of a knowledge-base search",
            "messages": [{
                "role": "user",
                "content": {
                    "type": "text",
                    "text": format!(
                        "Search the knowledge base with ink_search_text for \"{query}\" \
                         and summarize the top results in a few bullet points."
                    ),
                },
            }],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // protocol-level tests drive handle_line directly; transport framing is
    // covered by the protocol module

    async fn test_server() -> (McpServer, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let server = McpServer::new(state.clone(), crate::register_tools(&state));
        (server, dir)
    }

    async fn test_state(blob_root: &std::path::Path) -> ink_server::service::ServiceState {
        use std::sync::Arc;

        use ink_core::mock::{MockEmbedder, MockVision};
        use ink_server::service::{AiPorts, ServiceConfig, ServiceState};

        let config = ServiceConfig {
            blob: ink_opendal_config(blob_root),
            auth_token: "test".into(),
            ..Default::default()
        };
        let embedder = Arc::new(MockEmbedder::new(config.db.vector_dimensions));
        ServiceState::from_config(
            config,
            AiPorts {
                text_embedder: embedder.clone(),
                image_embedder: embedder,
                vision: Some(Arc::new(MockVision::new())),
            },
        )
        .await
        .unwrap()
    }

    fn ink_opendal_config(root: &std::path::Path) -> ink_opendal::StorageConfig {
        ink_opendal::StorageConfig::Fs(ink_opendal::FsConfig {
            root: root.to_string_lossy().into_owned(),
        })
    }

    #[tokio::test]
    async fn initialize_announces_capabilities() {
        let (server, _dir) = test_server().await;

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["result"]["serverInfo"]["name"], "ink-gateway");
        assert_eq!(value["result"]["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn tools_list_contains_stable_names() {
        let (server, _dir) = test_server().await;

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        let names: Vec<&str> = value["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();

        for expected in [
            "ink_search_text",
            "ink_create_text_chunk",
            "ink_get_chunk",
            "ink_search_chunks",
            "ink_analyze_image",
            "ink_upload_image",
            "ink_batch_process_images",
            "ink_search_images",
            "ink_hybrid_search",
            "ink_get_images_for_slides",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
    }

    #[tokio::test]
    async fn unknown_methods_error() {
        let (server, _dir) = test_server().await;

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"shutdown"}"#)
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["error"]["code"], crate::protocol::CODE_METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let (server, _dir) = test_server().await;

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn malformed_frames_yield_parse_errors() {
        let (server, _dir) = test_server().await;

        let response = server.handle_line("{not json").await.unwrap();
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["error"]["code"], crate::protocol::CODE_PARSE_ERROR);
    }

    #[tokio::test]
    async fn prompts_round_trip() {
        let (server, _dir) = test_server().await;

        let response = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":4,"method":"prompts/get","params":{"name":"summarize_search","arguments":{"query":"cats"}}}"#,
            )
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        let text = value["result"]["messages"][0]["content"]["text"]
            .as_str()
            .unwrap();

        assert!(text.contains("cats"));
    }
}
