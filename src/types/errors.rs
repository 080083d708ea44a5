//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the Guepard MCP server.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad profile, module or tool name at resolve time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Tool name not present in the registry.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Unrecognized `action` value on a management call.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// Tool exists but the active policy does not expose it.
    #[error("tool disabled by configuration: {0}")]
    ToolDisabled(String),

    /// Malformed or missing caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Notification gateway call failed.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Per-deployment status lookup failed.
    #[error("status lookup error: {0}")]
    StatusLookup(String),

    /// Remote call exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Remote platform API failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// Internal errors.
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Convert to a JSON-RPC error code.
    pub fn to_rpc_code(&self) -> i64 {
        match self {
            Error::Validation(_) | Error::UnknownAction(_) => -32602,
            Error::UnknownTool(_) | Error::ToolDisabled(_) => -32601,
            Error::Configuration(_) => -32001,
            Error::Gateway(_) | Error::StatusLookup(_) | Error::Backend(_) => -32002,
            Error::Timeout(_) => -32003,
            Error::Serialization(_) => -32700,
            Error::Internal(_) | Error::Io(_) => -32603,
        }
    }

    /// Whether the error came from a remote collaborator (gateway, status
    /// provider or platform API) rather than from caller input.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Gateway(_) | Error::StatusLookup(_) | Error::Timeout(_) | Error::Backend(_)
        )
    }
}

// Convenience constructors
impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool(name.into())
    }

    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction(action.into())
    }

    pub fn tool_disabled(name: impl Into<String>) -> Self {
        Self::ToolDisabled(name.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    pub fn status_lookup(msg: impl Into<String>) -> Self {
        Self::StatusLookup(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
