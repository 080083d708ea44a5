//! Predefined activation profiles.
//!
//! A profile is a fixed bundle of module/tool enablement decisions selected by
//! name. The set is closed; unknown names are a configuration error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::Error;

/// Named activation preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationProfile {
    Minimal,
    ReadOnly,
    Production,
    Development,
    Monitoring,
}

impl ActivationProfile {
    pub const ALL: [ActivationProfile; 5] = [
        ActivationProfile::Minimal,
        ActivationProfile::ReadOnly,
        ActivationProfile::Production,
        ActivationProfile::Development,
        ActivationProfile::Monitoring,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActivationProfile::Minimal => "minimal",
            ActivationProfile::ReadOnly => "read_only",
            ActivationProfile::Production => "production",
            ActivationProfile::Development => "development",
            ActivationProfile::Monitoring => "monitoring",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ActivationProfile::Minimal => "Minimal deployment management only",
            ActivationProfile::ReadOnly => "Read-only access to deployments and monitoring",
            ActivationProfile::Production => "Production environment without dangerous operations",
            ActivationProfile::Development => "Full development environment with all tools",
            ActivationProfile::Monitoring => "Monitoring and observability only",
        }
    }

    /// Modules whose tools the profile enables.
    pub fn enabled_modules(self) -> &'static [&'static str] {
        match self {
            ActivationProfile::Development => &[
                "auth",
                "deployments",
                "branches",
                "snapshots",
                "compute",
                "users",
                "subscriptions",
            ],
            _ => &[],
        }
    }

    /// Individual tools the profile enables on top of its modules.
    pub fn enabled_tools(self) -> &'static [&'static str] {
        match self {
            ActivationProfile::Minimal => &[
                "test_connection",
                "list_deployments",
                "get_deployment",
                "start_compute",
                "stop_compute",
                "get_compute_status",
            ],
            ActivationProfile::ReadOnly => &[
                "test_connection",
                "list_deployments",
                "get_deployment",
                "get_deployment_status",
                "get_deployment_logs",
                "get_deployment_metrics",
                "get_compute_status",
                "list_performance_profiles",
            ],
            ActivationProfile::Monitoring => &[
                "test_connection",
                "get_deployment_status",
                "get_deployment_logs",
                "get_deployment_metrics",
                "get_compute_status",
                "list_subscriptions",
            ],
            ActivationProfile::Production | ActivationProfile::Development => &[],
        }
    }

    /// Tools the profile always removes.
    pub fn disabled_tools(self) -> &'static [&'static str] {
        match self {
            ActivationProfile::Production => {
                &["delete_deployment", "delete_database_user", "revoke_token"]
            }
            _ => &[],
        }
    }
}

impl fmt::Display for ActivationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivationProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                Error::configuration(format!(
                    "unknown profile '{}', expected one of: {}",
                    wanted,
                    Self::ALL.map(|p| p.name()).join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::builtin_registry;

    #[test]
    fn test_parse_names() {
        for profile in ActivationProfile::ALL {
            assert_eq!(profile.name().parse::<ActivationProfile>().unwrap(), profile);
        }
        assert_eq!(
            " READ_ONLY ".parse::<ActivationProfile>().unwrap(),
            ActivationProfile::ReadOnly
        );
    }

    #[test]
    fn test_unknown_profile_names_offender() {
        let err = "staging".parse::<ActivationProfile>().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("'staging'"));
    }

    #[test]
    fn test_profiles_reference_registered_names() {
        let registry = builtin_registry().unwrap();
        for profile in ActivationProfile::ALL {
            for module in profile.enabled_modules() {
                assert!(registry.has_module(module), "{profile}: {module}");
            }
            for tool in profile.enabled_tools().iter().chain(profile.disabled_tools()) {
                assert!(registry.has_tool(tool), "{profile}: {tool}");
            }
        }
    }
}
