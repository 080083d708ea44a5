//! Tool execution facade.
//!
//! Every `tools/call` goes through [`ToolExecutor::call`]:
//!
//! 1. reject unknown tools and tools the published policy disables, before
//!    anything remote happens
//! 2. fill defaults and validate arguments against the registry
//! 3. run the tool (local subscription/configuration handlers, or the remote
//!    backend)
//! 4. run the auto-subscribe hook; its failures become warnings on the
//!    output and never turn a successful call into an error

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::api::ToolBackend;
use crate::mcp::handlers;
use crate::mcp::protocol::ToolCallResult;
use crate::subscriptions::{AutoSubscribeOutcome, SubscriptionManager};
use crate::tools::builtin::{CONFIGURATION_MODULE, SUBSCRIPTIONS_MODULE};
use crate::tools::catalog::{ToolRegistry, AUTO_SUBSCRIBE_PARAM};
use crate::tools::policy::{ActivationInputs, PolicyHandle, ResolvedPolicy};
use crate::types::{DeploymentId, Error, Result};

/// Produces fresh activation inputs for `reload_configuration`.
pub type ActivationSource = Arc<dyn Fn() -> Result<ActivationInputs> + Send + Sync>;

// =============================================================================
// Tool output
// =============================================================================

/// Primary result of a tool call plus best-effort side-effect reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub notices: Vec<String>,
    pub warnings: Vec<String>,
}

impl ToolOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// `✅ message`, followed by pretty-printed details when given.
    pub fn success(message: impl fmt::Display, details: Option<Value>) -> Self {
        let mut text = format!("✅ {}", message);
        if let Some(details) = details {
            let rendered =
                serde_json::to_string_pretty(&details).unwrap_or_else(|_| details.to_string());
            text.push('\n');
            text.push_str(&rendered);
        }
        Self::new(text)
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    /// Final user-visible text.
    pub fn render(&self) -> String {
        let mut out = self.text.clone();
        for notice in &self.notices {
            out.push('\n');
            out.push_str(notice);
        }
        for warning in &self.warnings {
            out.push_str("\n⚠️ Warning: ");
            out.push_str(warning);
        }
        out
    }

    /// Warnings never flip `isError`.
    pub fn into_result(self) -> ToolCallResult {
        ToolCallResult::text(self.render())
    }
}

// =============================================================================
// Executor
// =============================================================================

pub struct ToolExecutor {
    policy: PolicyHandle,
    subscriptions: Arc<SubscriptionManager>,
    backend: Arc<dyn ToolBackend>,
    activation_source: ActivationSource,
}

impl fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("policy", &self.policy.current().mode())
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

impl ToolExecutor {
    /// `reload_configuration` re-reads the process environment by default.
    pub fn new(
        policy: PolicyHandle,
        subscriptions: Arc<SubscriptionManager>,
        backend: Arc<dyn ToolBackend>,
    ) -> Self {
        Self {
            policy,
            subscriptions,
            backend,
            activation_source: Arc::new(ActivationInputs::from_env),
        }
    }

    pub fn with_activation_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> Result<ActivationInputs> + Send + Sync + 'static,
    {
        self.activation_source = Arc::new(source);
        self
    }

    pub fn policy(&self) -> &PolicyHandle {
        &self.policy
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.policy.registry()
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    pub fn backend(&self) -> &dyn ToolBackend {
        self.backend.as_ref()
    }

    /// Re-read activation inputs and publish a new policy. On failure the
    /// previous policy stays in effect.
    pub fn reload_policy(&self) -> Result<Arc<ResolvedPolicy>> {
        let inputs = (self.activation_source)()?;
        self.policy.reload(&inputs)
    }

    /// `tools/list` entries for every enabled tool, sorted by name.
    pub fn list_tools(&self) -> Vec<Value> {
        let policy = self.policy.current();
        self.registry()
            .tools()
            .filter(|tool| policy.is_enabled(&tool.name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Execute one tool call.
    pub async fn call(&self, tool_name: &str, arguments: Value) -> Result<ToolOutput> {
        let registry = self.registry();
        let tool = registry
            .get(tool_name)
            .ok_or_else(|| Error::unknown_tool(tool_name))?;
        if !self.policy.is_enabled(tool_name) {
            tracing::warn!("Rejected call to disabled tool {}", tool_name);
            return Err(Error::tool_disabled(tool_name));
        }

        let mut arguments = match arguments {
            Value::Null => Value::Object(serde_json::Map::new()),
            obj @ Value::Object(_) => obj,
            other => {
                return Err(Error::validation(format!(
                    "Arguments must be a JSON object, got {}",
                    other
                )))
            }
        };
        registry.fill_defaults(tool_name, &mut arguments)?;
        let errors = registry.validate_params(tool_name, &arguments)?;
        if !errors.is_empty() {
            return Err(Error::validation(errors.join("; ")));
        }

        tracing::debug!("Executing tool {} (module={})", tool_name, tool.module);
        let (mut output, remote_result) = match tool.module.as_str() {
            SUBSCRIPTIONS_MODULE => (
                handlers::subscriptions::handle(self, tool_name, &arguments).await?,
                None,
            ),
            CONFIGURATION_MODULE => (
                handlers::configuration::handle(self, tool_name, &arguments)?,
                None,
            ),
            _ => {
                let mut forwarded = arguments.clone();
                if let Some(map) = forwarded.as_object_mut() {
                    map.remove(AUTO_SUBSCRIBE_PARAM);
                }
                let result = self.backend.call(tool_name, &forwarded).await?;
                let text = serde_json::to_string_pretty(&result)?;
                (ToolOutput::new(text), Some(result))
            }
        };

        if tool.supports_auto_subscribe {
            let deployment_id = extract_deployment_id(&arguments, remote_result.as_ref());
            let explicit = arguments.get(AUTO_SUBSCRIBE_PARAM).and_then(Value::as_bool);
            match self
                .subscriptions
                .on_tool_invoked(tool_name, deployment_id.as_ref(), explicit)
                .await
            {
                Ok(AutoSubscribeOutcome::Subscribed(outcome)) if outcome.newly_subscribed => {
                    output.notices.push(format!(
                        "📌 Automatically subscribed to deployment {} (via {})\n\
                         📋 Total subscriptions: {}",
                        outcome.deployment_id, tool_name, outcome.total
                    ));
                }
                Ok(_) => {}
                Err(e) => {
                    let id = deployment_id
                        .as_ref()
                        .map(DeploymentId::as_str)
                        .unwrap_or(DeploymentId::UNKNOWN);
                    tracing::warn!("Auto-subscribe to {} via {} failed: {}", id, tool_name, e);
                    output
                        .warnings
                        .push(format!("auto-subscribe to deployment {} failed: {}", id, e));
                }
            }
        }

        Ok(output)
    }
}

/// Deployment the call acted on: the `deployment_id` argument, else the
/// remote result's `deployment_id` or `id` field.
pub fn extract_deployment_id(arguments: &Value, result: Option<&Value>) -> Option<DeploymentId> {
    let from_args = arguments
        .get("deployment_id")
        .and_then(Value::as_str)
        .and_then(DeploymentId::recognize);
    from_args.or_else(|| {
        let result = result?;
        ["deployment_id", "id"]
            .iter()
            .filter_map(|key| result.get(*key))
            .find_map(|v| match v {
                Value::String(s) => DeploymentId::recognize(s),
                Value::Number(n) => DeploymentId::recognize(&n.to_string()),
                _ => None,
            })
    })
}
