//! `manage_subscriptions` action decoding.

use serde_json::Value;
use std::fmt;

use crate::types::{DeploymentId, Error, Result};

/// One management operation, decoded once from the tool arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManageAction {
    /// Report global/per-tool settings and current subscriptions.
    Status,
    /// Set the global auto-subscribe switch (`enabled` defaults to true).
    Enable { enabled: bool },
    /// Turn global auto-subscribe off.
    Disable,
    /// Per-tool override.
    Configure { tool_name: String, enabled: bool },
    Unsubscribe { deployment_id: DeploymentId },
    ClearAll,
}

impl ManageAction {
    pub const NAMES: [&'static str; 6] = [
        "status",
        "enable",
        "disable",
        "configure",
        "clear_all",
        "unsubscribe",
    ];

    /// Decode from `manage_subscriptions` arguments.
    ///
    /// Unknown `action` values fail with `UnknownAction`; missing per-variant
    /// fields fail with `Validation`.
    pub fn from_arguments(arguments: &Value) -> Result<Self> {
        let action = match arguments.get("action") {
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return Err(Error::validation(format!(
                    "action must be a string, got {}",
                    other
                )))
            }
            None => return Err(Error::validation("action is required")),
        };

        match action {
            "status" => Ok(Self::Status),
            "enable" => Ok(Self::Enable {
                enabled: bool_field(arguments, "enabled")?.unwrap_or(true),
            }),
            "disable" => Ok(Self::Disable),
            "configure" => {
                let tool_name = str_field(arguments, "tool_name").ok_or_else(|| {
                    Error::validation("tool_name is required for configure action")
                })?;
                let enabled = bool_field(arguments, "enabled")?
                    .ok_or_else(|| Error::validation("enabled is required for configure action"))?;
                Ok(Self::Configure {
                    tool_name: tool_name.to_string(),
                    enabled,
                })
            }
            "unsubscribe" => {
                let deployment_id = str_field(arguments, "deployment_id")
                    .and_then(DeploymentId::recognize)
                    .ok_or_else(|| {
                        Error::validation("deployment_id is required for unsubscribe action")
                    })?;
                Ok(Self::Unsubscribe { deployment_id })
            }
            "clear_all" => Ok(Self::ClearAll),
            other => Err(Error::unknown_action(other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Enable { .. } => "enable",
            Self::Disable => "disable",
            Self::Configure { .. } => "configure",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::ClearAll => "clear_all",
        }
    }
}

impl fmt::Display for ManageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn str_field<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn bool_field(arguments: &Value, key: &str) -> Result<Option<bool>> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(Error::validation(format!(
            "{} must be a boolean, got {}",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_each_action() {
        assert_eq!(
            ManageAction::from_arguments(&json!({"action": "status"})).unwrap(),
            ManageAction::Status
        );
        assert_eq!(
            ManageAction::from_arguments(&json!({"action": "enable"})).unwrap(),
            ManageAction::Enable { enabled: true }
        );
        assert_eq!(
            ManageAction::from_arguments(&json!({"action": "enable", "enabled": false})).unwrap(),
            ManageAction::Enable { enabled: false }
        );
        assert_eq!(
            ManageAction::from_arguments(&json!({"action": "disable"})).unwrap(),
            ManageAction::Disable
        );
        assert_eq!(
            ManageAction::from_arguments(
                &json!({"action": "configure", "tool_name": "start_compute", "enabled": false})
            )
            .unwrap(),
            ManageAction::Configure {
                tool_name: "start_compute".to_string(),
                enabled: false
            }
        );
        assert_eq!(
            ManageAction::from_arguments(&json!({
                "action": "unsubscribe",
                "deployment_id": "dep-1"
            }))
            .unwrap()
            .name(),
            "unsubscribe"
        );
        assert_eq!(
            ManageAction::from_arguments(&json!({"action": "clear_all"})).unwrap(),
            ManageAction::ClearAll
        );
    }

    #[test]
    fn test_unknown_action_names_value() {
        let err = ManageAction::from_arguments(&json!({"action": "explode"})).unwrap_err();
        assert!(matches!(err, Error::UnknownAction(ref a) if a == "explode"));
    }

    #[test]
    fn test_missing_action() {
        let err = ManageAction::from_arguments(&json!({})).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_configure_requires_both_fields() {
        let err = ManageAction::from_arguments(&json!({"action": "configure", "enabled": true}))
            .unwrap_err();
        assert!(err.to_string().contains("tool_name"));

        let err = ManageAction::from_arguments(&json!({
            "action": "configure",
            "tool_name": "get_deployment"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("enabled"));
    }

    #[test]
    fn test_unsubscribe_requires_real_id() {
        let err = ManageAction::from_arguments(&json!({"action": "unsubscribe"})).unwrap_err();
        assert!(err.to_string().contains("deployment_id"));

        let err = ManageAction::from_arguments(
            &json!({"action": "unsubscribe", "deployment_id": "Unknown"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_enabled_must_be_boolean() {
        let err = ManageAction::from_arguments(&json!({"action": "enable", "enabled": "yes"}))
            .unwrap_err();
        assert!(err.to_string().contains("enabled must be a boolean"));
    }
}
