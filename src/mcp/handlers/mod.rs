//! Locally handled tool modules.

pub mod configuration;
pub mod subscriptions;
