//! Core types for the Guepard MCP server.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (DeploymentId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for the API client, subscriptions and transport

mod config;
mod errors;
mod ids;

pub use config::{
    parse_duration, ApiConfig, Config, McpConfig, ObservabilityConfig, SubscriptionConfig,
};
pub use errors::{Error, Result};
pub use ids::DeploymentId;
