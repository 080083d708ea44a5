//! # Guepard MCP - Tool Activation and Deployment Subscriptions
//!
//! Rust implementation of the Guepard MCP server core providing:
//! - A static tool catalog grouped into modules
//! - Activation policy resolution (profiles, enable/disable lists) with reload
//! - Deployment notification subscriptions with per-tool auto-subscribe
//! - A tool execution facade that gates, validates and post-processes calls
//! - Newline-delimited JSON-RPC transport over stdio
//!
//! ## Architecture
//!
//! ```text
//!                  ┌───────────────────────────────────────────┐
//!   stdin/stdout → │  McpServer → router → ToolExecutor        │
//!                  │                           │               │
//!                  │      ┌────────────┬───────┴──────┐        │
//!                  │  PolicyHandle  Subscription  ToolBackend  │
//!                  │  (registry)      Manager     (ApiClient)  │
//!                  │                     │                     │
//!                  │        NotificationGateway/StatusProvider │
//!                  └───────────────────────────────────────────┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

// Re-export public API
pub mod api;
pub mod mcp;
pub mod subscriptions;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
