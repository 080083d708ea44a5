//! Tool activation policy: which tools are exposed to the calling agent.
//!
//! Layered inputs (profile, enabled/disabled modules, enabled/disabled tools)
//! resolve into one immutable [`ResolvedPolicy`]. Precedence:
//!
//! 1. base set: the profile if one is set, else the explicit enables, else
//!    every registered tool
//! 2. minus every tool of a disabled module
//! 3. minus every disabled tool
//!
//! An explicit disable always wins. Resolution is all-or-nothing: any unknown
//! identifier fails the whole call.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::sync::{Arc, RwLock};

use crate::tools::catalog::ToolRegistry;
use crate::tools::profiles::ActivationProfile;
use crate::types::{Error, Result};

// =============================================================================
// Inputs
// =============================================================================

/// Recognized activation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActivationKey {
    Profile,
    /// `GUEPARD_CONFIG`, the legacy spelling of the profile key.
    ProfileAlias,
    EnabledModules,
    EnabledTools,
    DisabledModules,
    DisabledTools,
}

impl ActivationKey {
    fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        let (bare, prefixed) = match key.strip_prefix("GUEPARD_") {
            Some(rest) => (rest.to_ascii_lowercase(), true),
            None => (key.to_string(), false),
        };
        match bare.as_str() {
            "profile" => Some(Self::Profile),
            "config" if prefixed => Some(Self::ProfileAlias),
            "enabled_modules" => Some(Self::EnabledModules),
            "enabled_tools" => Some(Self::EnabledTools),
            "disabled_modules" => Some(Self::DisabledModules),
            "disabled_tools" => Some(Self::DisabledTools),
            _ => None,
        }
    }
}

/// Strongly-typed activation configuration. Empty sets mean "not specified".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationInputs {
    pub profile: Option<ActivationProfile>,
    pub enabled_modules: BTreeSet<String>,
    pub enabled_tools: BTreeSet<String>,
    pub disabled_modules: BTreeSet<String>,
    pub disabled_tools: BTreeSet<String>,
}

impl ActivationInputs {
    /// Parse activation inputs from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_os_pairs(std::env::vars_os())
    }

    /// Like [`from_pairs`](Self::from_pairs) over raw OS strings. Variables
    /// whose name is not valid Unicode are skipped, as are unrelated variables
    /// with a non-Unicode value. An activation key with a non-Unicode value is
    /// a configuration error.
    pub fn from_os_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut decoded = Vec::new();
        for (key, value) in pairs {
            let Ok(key) = key.into_string() else {
                continue;
            };
            if ActivationKey::from_key(&key).is_none() {
                continue;
            }
            let value = value.into_string().map_err(|raw| {
                Error::configuration(format!("{} is not valid UTF-8: {:?}", key, raw))
            })?;
            decoded.push((key, value));
        }
        Self::from_pairs(decoded)
    }

    /// Parse activation inputs from key/value pairs. Unrecognized keys are
    /// ignored; an unknown profile name is a configuration error.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut inputs = Self::default();
        let mut profile: Option<String> = None;
        let mut profile_alias: Option<String> = None;

        for (key, value) in pairs {
            let Some(key) = ActivationKey::from_key(key.as_ref()) else {
                continue;
            };
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            match key {
                ActivationKey::Profile => profile = Some(value.to_string()),
                ActivationKey::ProfileAlias => profile_alias = Some(value.to_string()),
                ActivationKey::EnabledModules => inputs.enabled_modules = split_list(value),
                ActivationKey::EnabledTools => inputs.enabled_tools = split_list(value),
                ActivationKey::DisabledModules => inputs.disabled_modules = split_list(value),
                ActivationKey::DisabledTools => inputs.disabled_tools = split_list(value),
            }
        }

        if let Some(name) = profile.or(profile_alias) {
            inputs.profile = Some(name.parse()?);
        }
        Ok(inputs)
    }

    pub fn with_profile(mut self, profile: ActivationProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn enable_modules<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.enabled_modules.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn enable_tools<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.enabled_tools.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn disable_modules<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.disabled_modules.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn disable_tools<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.disabled_tools.extend(names.into_iter().map(Into::into));
        self
    }

    /// How the base set is chosen.
    pub fn mode(&self) -> PolicyMode {
        if let Some(profile) = self.profile {
            PolicyMode::Profile(profile)
        } else if !self.enabled_modules.is_empty() || !self.enabled_tools.is_empty() {
            PolicyMode::Selective
        } else {
            PolicyMode::All
        }
    }
}

/// Comma-separated list, whitespace trimmed, empty entries dropped.
fn split_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Where the base set of a policy came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "profile")]
pub enum PolicyMode {
    /// No enables configured: every registered tool is the base set.
    All,
    /// Explicit enabled modules/tools.
    Selective,
    /// A predefined profile.
    Profile(ActivationProfile),
}

impl PolicyMode {
    pub fn label(&self) -> String {
        match self {
            PolicyMode::All => "all".to_string(),
            PolicyMode::Selective => "selective".to_string(),
            PolicyMode::Profile(p) => format!("profile:{}", p),
        }
    }
}

// =============================================================================
// Resolved policy
// =============================================================================

/// Final tool name → enabled decision. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPolicy {
    decisions: BTreeMap<String, bool>,
    inputs: ActivationInputs,
}

impl ResolvedPolicy {
    /// Whether the tool is exposed. Unknown names are never enabled.
    pub fn is_enabled(&self, tool_name: &str) -> bool {
        self.decisions.get(tool_name).copied().unwrap_or(false)
    }

    /// Enabled tool names, sorted.
    pub fn enabled_tools(&self) -> impl Iterator<Item = &str> {
        self.decisions
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
    }

    /// Disabled tool names, sorted.
    pub fn disabled_tools(&self) -> impl Iterator<Item = &str> {
        self.decisions
            .iter()
            .filter(|(_, enabled)| !**enabled)
            .map(|(name, _)| name.as_str())
    }

    pub fn enabled_count(&self) -> usize {
        self.decisions.values().filter(|e| **e).count()
    }

    /// Number of tools with a decision (= registry size).
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn inputs(&self) -> &ActivationInputs {
        &self.inputs
    }

    pub fn mode(&self) -> PolicyMode {
        self.inputs.mode()
    }
}

/// Resolve activation inputs against the registry.
pub fn resolve(registry: &ToolRegistry, inputs: &ActivationInputs) -> Result<ResolvedPolicy> {
    validate_names(registry, inputs)?;

    let mut enabled: BTreeSet<String> = match inputs.profile {
        Some(profile) => {
            if !inputs.enabled_modules.is_empty() || !inputs.enabled_tools.is_empty() {
                tracing::warn!(
                    "Profile '{}' selected; explicit enabled modules/tools are ignored",
                    profile
                );
            }
            let mut base = expand(
                registry,
                profile.enabled_modules().iter().copied(),
                profile.enabled_tools().iter().copied(),
            )?;
            if base.is_empty() {
                base = registry.tool_names().map(str::to_string).collect();
            }
            for tool in profile.disabled_tools() {
                base.remove(*tool);
            }
            base
        }
        None if !inputs.enabled_modules.is_empty() || !inputs.enabled_tools.is_empty() => expand(
            registry,
            inputs.enabled_modules.iter().map(String::as_str),
            inputs.enabled_tools.iter().map(String::as_str),
        )?,
        None => registry.tool_names().map(str::to_string).collect(),
    };

    for module in &inputs.disabled_modules {
        if let Some(descriptor) = registry.module(module) {
            for tool in &descriptor.tools {
                enabled.remove(tool);
            }
        }
    }
    for tool in &inputs.disabled_tools {
        enabled.remove(tool);
    }

    let decisions = registry
        .tool_names()
        .map(|name| (name.to_string(), enabled.contains(name)))
        .collect();

    Ok(ResolvedPolicy {
        decisions,
        inputs: inputs.clone(),
    })
}

fn validate_names(registry: &ToolRegistry, inputs: &ActivationInputs) -> Result<()> {
    for module in inputs.enabled_modules.iter().chain(&inputs.disabled_modules) {
        if !registry.has_module(module) {
            return Err(Error::configuration(format!("unknown module '{}'", module)));
        }
    }
    for tool in inputs.enabled_tools.iter().chain(&inputs.disabled_tools) {
        if !registry.has_tool(tool) {
            return Err(Error::configuration(format!("unknown tool '{}'", tool)));
        }
    }
    Ok(())
}

/// Union of the tools of `modules` and the literally named `tools`.
fn expand<'a>(
    registry: &ToolRegistry,
    modules: impl Iterator<Item = &'a str>,
    tools: impl Iterator<Item = &'a str>,
) -> Result<BTreeSet<String>> {
    let mut set = BTreeSet::new();
    for module in modules {
        let descriptor = registry
            .module(module)
            .ok_or_else(|| Error::configuration(format!("unknown module '{}'", module)))?;
        set.extend(descriptor.tools.iter().cloned());
    }
    for tool in tools {
        if !registry.has_tool(tool) {
            return Err(Error::configuration(format!("unknown tool '{}'", tool)));
        }
        set.insert(tool.to_string());
    }
    Ok(set)
}

// =============================================================================
// Published policy
// =============================================================================

/// Shared handle to the currently published policy.
///
/// Readers get an `Arc` snapshot; [`PolicyHandle::reload`] swaps in a new
/// policy atomically and leaves the old one in place on error.
#[derive(Debug, Clone)]
pub struct PolicyHandle {
    registry: Arc<ToolRegistry>,
    current: Arc<RwLock<Arc<ResolvedPolicy>>>,
}

impl PolicyHandle {
    pub fn new(registry: Arc<ToolRegistry>, inputs: &ActivationInputs) -> Result<Self> {
        let policy = resolve(&registry, inputs)?;
        log_summary(&policy);
        Ok(Self {
            registry,
            current: Arc::new(RwLock::new(Arc::new(policy))),
        })
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Snapshot of the published policy.
    pub fn current(&self) -> Arc<ResolvedPolicy> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }

    pub fn is_enabled(&self, tool_name: &str) -> bool {
        self.current().is_enabled(tool_name)
    }

    /// Resolve `inputs` and publish the result.
    pub fn reload(&self, inputs: &ActivationInputs) -> Result<Arc<ResolvedPolicy>> {
        let policy = match resolve(&self.registry, inputs) {
            Ok(policy) => Arc::new(policy),
            Err(e) => {
                tracing::warn!("Policy reload rejected, keeping previous policy: {}", e);
                return Err(e);
            }
        };
        log_summary(&policy);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::clone(&policy);
        Ok(policy)
    }
}

fn log_summary(policy: &ResolvedPolicy) {
    tracing::info!(
        "Tool policy resolved: mode={} enabled={}/{}",
        policy.mode().label(),
        policy.enabled_count(),
        policy.len()
    );
    let inputs = policy.inputs();
    if !inputs.disabled_modules.is_empty() {
        tracing::info!(
            "Disabled modules: {}",
            inputs.disabled_modules.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    if !inputs.disabled_tools.is_empty() {
        tracing::info!(
            "Disabled tools: {}",
            inputs.disabled_tools.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::builtin_registry;
    use pretty_assertions::assert_eq;

    fn enabled(policy: &ResolvedPolicy) -> Vec<&str> {
        policy.enabled_tools().collect()
    }

    #[test]
    fn test_no_configuration_enables_everything() {
        let registry = builtin_registry().unwrap();
        let policy = resolve(&registry, &ActivationInputs::default()).unwrap();
        assert_eq!(policy.enabled_count(), registry.len());
        assert_eq!(policy.len(), registry.len());
        assert_eq!(policy.mode(), PolicyMode::All);
    }

    #[test]
    fn test_enabled_modules_and_tools_union() {
        let registry = builtin_registry().unwrap();
        let inputs = ActivationInputs::default()
            .enable_modules(["tokens"])
            .enable_tools(["get_deployment"]);
        let policy = resolve(&registry, &inputs).unwrap();
        assert_eq!(
            enabled(&policy),
            vec!["generate_token", "get_deployment", "list_tokens", "revoke_token"]
        );
        assert_eq!(policy.mode(), PolicyMode::Selective);
    }

    #[test]
    fn test_disabled_tool_wins_over_enabled_tool() {
        let registry = builtin_registry().unwrap();
        let inputs = ActivationInputs::default()
            .enable_tools(["get_deployment", "list_deployments"])
            .disable_tools(["get_deployment"]);
        let policy = resolve(&registry, &inputs).unwrap();
        assert_eq!(enabled(&policy), vec!["list_deployments"]);
        assert!(!policy.is_enabled("get_deployment"));
    }

    #[test]
    fn test_disabled_module_wins_over_enabled_tool() {
        let registry = builtin_registry().unwrap();
        let inputs = ActivationInputs::default()
            .enable_tools(["list_tokens", "list_nodes"])
            .disable_modules(["tokens"]);
        let policy = resolve(&registry, &inputs).unwrap();
        assert_eq!(enabled(&policy), vec!["list_nodes"]);
    }

    #[test]
    fn test_disables_narrow_the_all_default() {
        let registry = builtin_registry().unwrap();
        let inputs = ActivationInputs::default()
            .disable_modules(["auth"])
            .disable_tools(["delete_deployment"]);
        let policy = resolve(&registry, &inputs).unwrap();
        assert!(!policy.is_enabled("login_supabase"));
        assert!(!policy.is_enabled("delete_deployment"));
        assert!(policy.is_enabled("create_deployment"));
        assert_eq!(policy.enabled_count(), registry.len() - 7 - 1);
    }

    #[test]
    fn test_read_only_profile_disables_create_deployment() {
        let registry = builtin_registry().unwrap();
        let inputs = ActivationInputs::default().with_profile(ActivationProfile::ReadOnly);
        let policy = resolve(&registry, &inputs).unwrap();
        assert!(!policy.is_enabled("create_deployment"));
        assert!(policy.is_enabled("get_deployment"));
        assert_eq!(policy.enabled_count(), 8);
    }

    #[test]
    fn test_production_profile_starts_from_all() {
        let registry = builtin_registry().unwrap();
        let inputs = ActivationInputs::default().with_profile(ActivationProfile::Production);
        let policy = resolve(&registry, &inputs).unwrap();
        assert_eq!(policy.enabled_count(), registry.len() - 3);
        assert!(!policy.is_enabled("revoke_token"));
        assert!(policy.is_enabled("create_deployment"));
    }

    #[test]
    fn test_profile_ignores_explicit_enables_but_honors_disables() {
        let registry = builtin_registry().unwrap();
        let inputs = ActivationInputs::default()
            .with_profile(ActivationProfile::Minimal)
            .enable_tools(["list_tokens"])
            .disable_tools(["stop_compute"]);
        let policy = resolve(&registry, &inputs).unwrap();
        assert!(!policy.is_enabled("list_tokens"));
        assert!(!policy.is_enabled("stop_compute"));
        assert!(policy.is_enabled("start_compute"));
    }

    #[test]
    fn test_unknown_names_fail_whole_resolution() {
        let registry = builtin_registry().unwrap();

        let err =
            resolve(&registry, &ActivationInputs::default().enable_tools(["nope"])).unwrap_err();
        assert!(err.to_string().contains("'nope'"));

        let err = resolve(
            &registry,
            &ActivationInputs::default().disable_modules(["ghosts"]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("'ghosts'"));
    }

    #[test]
    fn test_is_enabled_unknown_tool_is_false() {
        let registry = builtin_registry().unwrap();
        let policy = resolve(&registry, &ActivationInputs::default()).unwrap();
        assert!(!policy.is_enabled("does_not_exist"));
    }

    #[test]
    fn test_from_pairs_parses_lists() {
        let inputs = ActivationInputs::from_pairs([
            ("GUEPARD_ENABLED_MODULES", " deployments, compute ,,"),
            ("GUEPARD_DISABLED_TOOLS", "delete_deployment"),
            ("GUEPARD_ENABLED_TOOLS", ""),
            ("ACCESS_TOKEN", "ignored"),
        ])
        .unwrap();
        assert_eq!(
            inputs.enabled_modules.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["compute", "deployments"]
        );
        assert!(inputs.enabled_tools.is_empty());
        assert!(inputs.disabled_tools.contains("delete_deployment"));
        assert_eq!(inputs.profile, None);
    }

    #[test]
    fn test_from_pairs_bare_keys_and_profile_alias() {
        let inputs = ActivationInputs::from_pairs([("profile", "monitoring")]).unwrap();
        assert_eq!(inputs.profile, Some(ActivationProfile::Monitoring));

        let inputs = ActivationInputs::from_pairs([
            ("GUEPARD_PROFILE", "production"),
            ("GUEPARD_CONFIG", "minimal"),
        ])
        .unwrap();
        assert_eq!(inputs.profile, Some(ActivationProfile::Production));

        let inputs = ActivationInputs::from_pairs([("GUEPARD_CONFIG", "read_only")]).unwrap();
        assert_eq!(inputs.profile, Some(ActivationProfile::ReadOnly));
    }

    #[test]
    fn test_from_pairs_unknown_profile() {
        let err = ActivationInputs::from_pairs([("GUEPARD_PROFILE", "everything")]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_from_os_pairs_skips_non_unicode_noise() {
        use std::os::unix::ffi::OsStringExt;

        let junk = || OsString::from_vec(vec![0x66, 0x6f, 0xff]);
        let inputs = ActivationInputs::from_os_pairs([
            (OsString::from("UNRELATED"), junk()),
            (junk(), OsString::from("whatever")),
            (OsString::from("GUEPARD_PROFILE"), OsString::from("minimal")),
        ])
        .unwrap();
        assert_eq!(inputs.profile, Some(ActivationProfile::Minimal));
    }

    #[cfg(unix)]
    #[test]
    fn test_from_os_pairs_rejects_non_unicode_activation_value() {
        use std::os::unix::ffi::OsStringExt;

        let err = ActivationInputs::from_os_pairs([(
            OsString::from("GUEPARD_DISABLED_TOOLS"),
            OsString::from_vec(vec![0xc3, 0x28]),
        )])
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("GUEPARD_DISABLED_TOOLS"));
    }

    #[test]
    fn test_handle_reload_keeps_previous_on_error() {
        let registry = Arc::new(builtin_registry().unwrap());
        let handle = PolicyHandle::new(registry, &ActivationInputs::default()).unwrap();
        assert!(handle.is_enabled("delete_deployment"));

        let err = handle
            .reload(&ActivationInputs::default().disable_tools(["delete_deployment", "bogus"]))
            .unwrap_err();
        assert!(err.to_string().contains("bogus"));
        assert!(handle.is_enabled("delete_deployment"));

        handle
            .reload(&ActivationInputs::default().disable_tools(["delete_deployment"]))
            .unwrap();
        assert!(!handle.is_enabled("delete_deployment"));
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let registry = Arc::new(builtin_registry().unwrap());
        let handle = PolicyHandle::new(registry, &ActivationInputs::default()).unwrap();
        let before = handle.current();
        handle
            .reload(&ActivationInputs::default().with_profile(ActivationProfile::Monitoring))
            .unwrap();
        assert!(before.is_enabled("create_deployment"));
        assert!(!handle.is_enabled("create_deployment"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use proptest::sample::subsequence;

        fn tool_names() -> Vec<String> {
            builtin_registry().unwrap().tool_names().map(str::to_string).collect()
        }

        fn module_names() -> Vec<String> {
            builtin_registry().unwrap().modules().map(|m| m.name.clone()).collect()
        }

        fn arb_inputs() -> impl Strategy<Value = ActivationInputs> {
            let tools = tool_names();
            let modules = module_names();
            let profiles = prop::option::of(prop::sample::select(ActivationProfile::ALL.to_vec()));
            (
                profiles,
                subsequence(modules.clone(), 0..4),
                subsequence(tools.clone(), 0..8),
                subsequence(modules, 0..3),
                subsequence(tools, 0..8),
            )
                .prop_map(|(profile, em, et, dm, dt)| ActivationInputs {
                    profile,
                    enabled_modules: em.into_iter().collect(),
                    enabled_tools: et.into_iter().collect(),
                    disabled_modules: dm.into_iter().collect(),
                    disabled_tools: dt.into_iter().collect(),
                })
        }

        proptest! {
            #[test]
            fn disabled_tools_are_never_enabled(inputs in arb_inputs()) {
                let registry = builtin_registry().unwrap();
                let policy = resolve(&registry, &inputs).unwrap();
                for tool in &inputs.disabled_tools {
                    prop_assert!(!policy.is_enabled(tool));
                }
                for module in &inputs.disabled_modules {
                    for tool in &registry.module(module).unwrap().tools {
                        prop_assert!(!policy.is_enabled(tool));
                    }
                }
            }

            #[test]
            fn resolution_is_deterministic(inputs in arb_inputs()) {
                let registry = builtin_registry().unwrap();
                let first = resolve(&registry, &inputs).unwrap();
                let second = resolve(&registry, &inputs).unwrap();
                prop_assert_eq!(first, second);
            }

            #[test]
            fn every_registered_tool_has_a_decision(inputs in arb_inputs()) {
                let registry = builtin_registry().unwrap();
                let policy = resolve(&registry, &inputs).unwrap();
                prop_assert_eq!(policy.len(), registry.len());
            }
        }
    }
}
