#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for tool-server operations.
pub const TRACING_TARGET: &str = "ink_mcp";

mod protocol;
mod registry;
mod server;
mod tools;

pub use protocol::{JsonRpcRequest, JsonRpcResponse, RpcError};
pub use registry::{Tool, ToolError, ToolRegistry};
pub use server::McpServer;
pub use tools::register_tools;
