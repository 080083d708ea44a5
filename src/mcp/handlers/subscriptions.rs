//! Subscription tools: subscribe/unsubscribe/list/manage and test_connection.

use serde_json::Value;

use crate::mcp::executor::{ToolExecutor, ToolOutput};
use crate::subscriptions::{AutoSubscribeUpdate, ManageAction, SubscriptionRecord};
use crate::types::{DeploymentId, Error, Result};

pub async fn handle(executor: &ToolExecutor, tool: &str, arguments: &Value) -> Result<ToolOutput> {
    let manager = executor.subscriptions();
    match tool {
        "subscribe_deployment" => {
            let id = deployment_id(arguments)?;
            let outcome = manager.subscribe(&id).await?;
            Ok(ToolOutput::success(
                format!("{}\nTotal subscriptions: {}", outcome, outcome.total),
                None,
            ))
        }

        "unsubscribe_deployment" => {
            let id = deployment_id(arguments)?;
            let outcome = manager.unsubscribe(&id).await?;
            Ok(ToolOutput::success(
                format!("{}\nTotal subscriptions: {}", outcome, outcome.total),
                None,
            )
            .with_warnings(outcome.warnings))
        }

        "list_subscriptions" => {
            let include_status = bool_arg(arguments, "include_status");
            let include_compute = bool_arg(arguments, "include_compute_status");
            let records = manager
                .list_subscriptions(include_status, include_compute)
                .await;
            Ok(ToolOutput::new(render_records(&records, include_status)))
        }

        "manage_subscriptions" => manage(executor, ManageAction::from_arguments(arguments)?).await,

        "test_connection" => {
            let info = executor.backend().call("test_connection", arguments).await?;
            let policy = executor.policy().current();
            let modules: Vec<&str> = executor
                .registry()
                .modules()
                .filter(|m| m.tools.iter().any(|t| policy.is_enabled(t)))
                .map(|m| m.name.as_str())
                .collect();
            let text = format!(
                "✅ Guepard MCP Server connected successfully!\nAPI URL: {}\nToken: {}\n\n\
                 Available Tools: {}\nModules: {}\nConfiguration: {}",
                info.get("api_url").and_then(Value::as_str).unwrap_or("unknown"),
                info.get("token").and_then(Value::as_str).unwrap_or("<not set>"),
                policy.enabled_count(),
                modules.join(", "),
                policy.mode().label(),
            );
            Ok(ToolOutput::new(text))
        }

        other => Err(Error::unknown_tool(other)),
    }
}

async fn manage(executor: &ToolExecutor, action: ManageAction) -> Result<ToolOutput> {
    let manager = executor.subscriptions();
    tracing::debug!("manage_subscriptions action={}", action);
    match action {
        ManageAction::Status => {
            let status = manager.status().await;
            Ok(ToolOutput::success(
                "Subscription status retrieved",
                Some(serde_json::to_value(status)?),
            ))
        }
        ManageAction::Enable { enabled } => {
            manager.configure(AutoSubscribeUpdate::global(enabled)).await?;
            Ok(ToolOutput::success(
                format!("Auto-subscription {}", on_off(enabled)),
                Some(serde_json::json!({ "enabled": enabled })),
            ))
        }
        ManageAction::Disable => {
            manager.configure(AutoSubscribeUpdate::global(false)).await?;
            Ok(ToolOutput::success(
                "Auto-subscription disabled",
                Some(serde_json::json!({ "enabled": false })),
            ))
        }
        ManageAction::Configure { tool_name, enabled } => {
            manager
                .configure(AutoSubscribeUpdate::tool(tool_name.clone(), enabled))
                .await?;
            Ok(ToolOutput::success(
                format!("Auto-subscription for {} {}", tool_name, on_off(enabled)),
                Some(serde_json::json!({ "tool_name": tool_name, "enabled": enabled })),
            ))
        }
        ManageAction::ClearAll => {
            let outcome = manager.clear_all().await?;
            Ok(ToolOutput::success(
                format!("Cleared {} subscriptions", outcome.cleared.len()),
                Some(serde_json::json!({ "cleared_count": outcome.cleared.len() })),
            )
            .with_warnings(outcome.warnings))
        }
        ManageAction::Unsubscribe { deployment_id } => {
            let outcome = manager.unsubscribe(&deployment_id).await?;
            Ok(ToolOutput::success(
                outcome.to_string(),
                Some(serde_json::json!({
                    "deployment_id": deployment_id,
                    "was_subscribed": outcome.was_subscribed,
                })),
            )
            .with_warnings(outcome.warnings))
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

fn deployment_id(arguments: &Value) -> Result<DeploymentId> {
    arguments
        .get("deployment_id")
        .and_then(Value::as_str)
        .and_then(DeploymentId::recognize)
        .ok_or_else(|| Error::validation("deployment_id is required"))
}

fn bool_arg(arguments: &Value, key: &str) -> bool {
    arguments.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn render_records(records: &[SubscriptionRecord], include_status: bool) -> String {
    if records.is_empty() {
        return "📋 No active subscriptions".to_string();
    }

    if !include_status {
        let lines: Vec<String> = records
            .iter()
            .map(|r| format!("• {}", r.deployment_id))
            .collect();
        return format!("📋 Active subscriptions ({}):\n{}", records.len(), lines.join("\n"));
    }

    let lines: Vec<String> = records
        .iter()
        .map(|r| match &r.error {
            Some(error) => format!("❌ {}: Error - {}", r.deployment_id, error),
            None => {
                let mut line = format!(
                    "✅ {} ({}): {}",
                    r.deployment_id,
                    r.name.as_deref().unwrap_or(DeploymentId::UNKNOWN),
                    r.status.as_deref().unwrap_or("unknown")
                );
                if let Some(compute) = &r.compute_status {
                    line.push_str(&format!(" [Compute: {}]", compute));
                }
                line
            }
        })
        .collect();
    format!(
        "📊 Subscribed Deployments Status ({}):\n{}",
        records.len(),
        lines.join("\n")
    )
}
