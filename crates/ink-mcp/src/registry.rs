//! Tool trait and registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::TRACING_TARGET;

/// A failure produced by a tool call.
///
/// Tool failures are content, not protocol errors: they render inside the
/// call result with `isError: true` so the host model can read them.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ToolError {
    /// Human-readable failure description.
    pub message: String,
}

impl ToolError {
    /// Creates a tool error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ink_server::service::ServiceError> for ToolError {
    fn from(error: ink_server::service::ServiceError) -> Self {
        Self::new(error.to_string())
    }
}

impl From<ink_postgres::PgError> for ToolError {
    fn from(error: ink_postgres::PgError) -> Self {
        Self::new(error.to_string())
    }
}

/// A named capability exposed to assistant hosts.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable tool name.
    fn name(&self) -> &'static str;

    /// Human description shown to the host model.
    fn description(&self) -> &'static str;

    /// JSON schema of the tool input.
    fn input_schema(&self) -> Value;

    /// Executes the tool; the returned string becomes the text content.
    async fn call(&self, args: Value) -> Result<String, ToolError>;
}

/// Registry of available tools, keyed by stable name.
///
/// Registration happens once at startup; a tool is only registered when
/// the services it transitively requires are ready, so listing never
/// advertises a capability that would fail on first use.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        tracing::debug!(target: TRACING_TARGET, tool = tool.name(), "Tool registered");
        self.tools.insert(tool.name(), tool);
    }

    /// Returns the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Renders the `tools/list` result.
    pub fn list(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .values()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect();

        json!({ "tools": tools })
    }

    /// Executes a `tools/call`, wrapping the outcome as a content array.
    pub async fn call(&self, name: &str, args: Value) -> Option<Value> {
        let tool = self.tools.get(name)?;

        let (text, is_error) = match tool.call(args).await {
            Ok(text) => (text, false),
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    tool = name,
                    error = %error,
                    "Tool call failed"
                );
                (error.to_string(), true)
            }
        };

        Some(json!({
            "content": [{ "type": "text", "text": text }],
            "isError": is_error,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echoes its input"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn call(&self, args: Value) -> Result<String, ToolError> {
            if args.get("fail").is_some() {
                return Err(ToolError::new("requested failure"));
            }
            Ok(args.to_string())
        }
    }

    #[tokio::test]
    async fn list_and_call() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let listed = registry.list();
        assert_eq!(listed["tools"][0]["name"], "echo");

        let result = registry.call("echo", json!({"x": 1})).await.unwrap();
        assert_eq!(result["isError"], false);
        assert!(result["content"][0]["text"].as_str().unwrap().contains("\"x\":1"));
    }

    #[tokio::test]
    async fn failures_render_as_error_content() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let result = registry.call("echo", json!({"fail": true})).await.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "requested failure");
    }

    #[tokio::test]
    async fn unknown_tools_are_none() {
        let registry = ToolRegistry::new();
        assert!(registry.call("missing", json!({})).await.is_none());
    }
}
