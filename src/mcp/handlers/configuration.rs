//! Configuration tools: profile listing, current policy, reload.

use serde_json::{json, Map, Value};

use crate::mcp::executor::{ToolExecutor, ToolOutput};
use crate::tools::profiles::ActivationProfile;
use crate::types::{Error, Result};

pub fn handle(executor: &ToolExecutor, tool: &str, _arguments: &Value) -> Result<ToolOutput> {
    match tool {
        "list_configurations" => {
            let profiles: Vec<Value> = ActivationProfile::ALL
                .iter()
                .map(|p| {
                    json!({
                        "name": p.name(),
                        "description": p.description(),
                        "enabled_modules": p.enabled_modules(),
                        "enabled_tools": p.enabled_tools(),
                        "disabled_tools": p.disabled_tools(),
                    })
                })
                .collect();
            Ok(ToolOutput::success(
                "Available configurations",
                Some(json!({
                    "current": executor.policy().current().mode().label(),
                    "configurations": profiles,
                })),
            ))
        }

        "get_configuration" => Ok(ToolOutput::success(
            "Current configuration",
            Some(summary(executor)),
        )),

        "reload_configuration" => {
            let policy = executor.reload_policy()?;
            Ok(ToolOutput::success(
                format!(
                    "Configuration reloaded: {} ({}/{} tools enabled)",
                    policy.mode().label(),
                    policy.enabled_count(),
                    policy.len()
                ),
                Some(summary(executor)),
            ))
        }

        other => Err(Error::unknown_tool(other)),
    }
}

/// Per-module enabled counts plus the inputs the policy was built from.
fn summary(executor: &ToolExecutor) -> Value {
    let policy = executor.policy().current();
    let inputs = policy.inputs();

    let mut modules = Map::new();
    for module in executor.registry().modules() {
        let enabled = module.tools.iter().filter(|t| policy.is_enabled(t)).count();
        modules.insert(
            module.name.clone(),
            json!({ "enabled": enabled, "total": module.tools.len() }),
        );
    }

    json!({
        "configuration_mode": policy.mode().label(),
        "profile": inputs.profile.map(|p| p.name()),
        "enabled_tools": policy.enabled_count(),
        "total_tools": policy.len(),
        "enabled_modules": inputs.enabled_modules,
        "disabled_modules": inputs.disabled_modules,
        "disabled_tools": inputs.disabled_tools,
        "modules": modules,
    })
}
