//! MCP stdio transport and tool execution.
//!
//! Newline-delimited JSON-RPC 2.0 on stdin/stdout. Each request runs in its
//! own task; a single writer task owns stdout so responses never interleave.

pub mod codec;
pub mod executor;
pub mod handlers;
pub mod protocol;
pub mod router;
pub mod server;

pub use executor::{extract_deployment_id, ActivationSource, ToolExecutor, ToolOutput};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallResult};
pub use router::route_request;
pub use server::McpServer;
