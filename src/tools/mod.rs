//! Tool infrastructure: catalog, activation profiles, policy resolution.
//!
//! The registry owns tool metadata and parameter validation. The policy layer
//! decides which of those tools are exposed; nothing here executes a tool.

pub mod builtin;
pub mod catalog;
pub mod policy;
pub mod profiles;

pub use builtin::{builtin_registry, CONFIGURATION_MODULE, SUBSCRIPTIONS_MODULE};
pub use catalog::{
    ModuleDescriptor, ParamDef, ParamType, ToolDescriptor, ToolRegistry, AUTO_SUBSCRIBE_PARAM,
};
pub use policy::{resolve, ActivationInputs, PolicyHandle, PolicyMode, ResolvedPolicy};
pub use profiles::ActivationProfile;
