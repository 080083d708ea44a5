//! JSON-RPC method router: maps MCP methods onto the tool executor.

use serde_json::{json, Value};

use crate::mcp::executor::ToolExecutor;
use crate::mcp::protocol::{initialize_result, JsonRpcError, ToolCallResult};
use crate::types::{Error, Result};

/// Route one MCP request. Errors become the JSON-RPC `error` member.
pub async fn route_request(
    executor: &ToolExecutor,
    method: &str,
    params: Value,
) -> std::result::Result<Value, JsonRpcError> {
    match method {
        "initialize" => Ok(initialize_result()),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": executor.list_tools() })),
        "tools/call" => call_tool(executor, params).await,
        _ => Err(JsonRpcError::method_not_found(method)),
    }
}

/// Caller mistakes (unknown or disabled tool, bad arguments, bad
/// configuration) are JSON-RPC errors. Remote failures are reported inside
/// the tool result with `isError: true`.
async fn call_tool(
    executor: &ToolExecutor,
    params: Value,
) -> std::result::Result<Value, JsonRpcError> {
    let name = str_field(&params, "name")?;
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

    let result = match executor.call(&name, arguments).await {
        Ok(output) => output.into_result(),
        Err(e) if e.is_remote() => {
            tracing::warn!("Tool {} failed: {}", name, e);
            ToolCallResult::error(format!("❌ Error: {}", e))
        }
        Err(e) => return Err(JsonRpcError::from(e)),
    };
    serde_json::to_value(result).map_err(|e| JsonRpcError::from(Error::from(e)))
}

// =============================================================================
// Shared helpers
// =============================================================================

pub fn str_field(body: &Value, key: &str) -> Result<String> {
    body.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::validation(format!("Missing required field: {}", key)))
}
