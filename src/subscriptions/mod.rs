//! Deployment subscription state and auto-subscription.
//!
//! [`SubscriptionManager`] is the single owner of [`SubscriptionState`]. All
//! mutations (`subscribe`, `unsubscribe`, `configure`, `clear_all`,
//! `on_tool_invoked`) run under one write lock, including the gateway call
//! they make, so read-modify-write sequences never interleave. Readers take a
//! snapshot under the read lock.
//!
//! Adds and removes are deliberately asymmetric:
//!   - **subscribe** is strict: the id is recorded only after the gateway
//!     accepted it
//!   - **unsubscribe / clear_all** are best-effort: the local removal always
//!     happens, gateway failures come back as warnings

pub mod actions;
pub mod gateway;
pub mod store;

pub use actions::ManageAction;
pub use gateway::{DeploymentStatus, LocalGateway, NotificationGateway, StatusProvider};
pub use store::{StateStore, STATE_VERSION};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{timeout, Duration};

use crate::tools::catalog::{ToolDescriptor, ToolRegistry};
use crate::types::{DeploymentId, Error, Result};

/// Default deadline for a single gateway or status call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// State
// =============================================================================

/// Mutable subscription state. Only the manager holds a live copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionState {
    pub global_auto_subscribe: bool,
    /// Per-tool override; absent = the tool's default.
    pub per_tool_auto_subscribe: BTreeMap<String, bool>,
    pub subscribed_deployments: BTreeSet<DeploymentId>,
}

impl Default for SubscriptionState {
    fn default() -> Self {
        Self {
            global_auto_subscribe: true,
            per_tool_auto_subscribe: BTreeMap::new(),
            subscribed_deployments: BTreeSet::new(),
        }
    }
}

impl SubscriptionState {
    /// Effective auto-subscribe decision for one invocation of `tool`.
    ///
    /// Most specific wins: per-call override, then per-tool override, then
    /// global switch AND the tool's default.
    pub fn auto_subscribe_enabled(&self, tool: &ToolDescriptor, explicit: Option<bool>) -> bool {
        if !tool.supports_auto_subscribe {
            return false;
        }
        explicit
            .or_else(|| self.per_tool_auto_subscribe.get(&tool.name).copied())
            .unwrap_or(self.global_auto_subscribe && tool.default_auto_subscribe)
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Read-only view returned by [`SubscriptionManager::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionStatus {
    pub global_auto_subscribe: bool,
    pub per_tool_auto_subscribe: BTreeMap<String, bool>,
    /// Effective setting for every auto-subscribe capable tool.
    pub auto_subscribe_tools: BTreeMap<String, bool>,
    pub subscription_count: usize,
    pub subscribed_deployments: Vec<DeploymentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribeOutcome {
    pub deployment_id: DeploymentId,
    /// False when the id was already subscribed (no gateway call made).
    pub newly_subscribed: bool,
    pub total: usize,
}

impl fmt::Display for SubscribeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.newly_subscribed {
            write!(f, "Subscribed to notifications for deployment: {}", self.deployment_id)
        } else {
            write!(f, "Already subscribed to deployment: {}", self.deployment_id)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsubscribeOutcome {
    pub deployment_id: DeploymentId,
    pub was_subscribed: bool,
    pub total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl fmt::Display for UnsubscribeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.was_subscribed {
            write!(f, "Unsubscribed from notifications for deployment: {}", self.deployment_id)
        } else {
            write!(f, "Deployment {} was not subscribed", self.deployment_id)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearOutcome {
    pub cleared: Vec<DeploymentId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// One entry of [`SubscriptionManager::list_subscriptions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRecord {
    pub deployment_id: DeploymentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubscriptionRecord {
    fn bare(deployment_id: DeploymentId) -> Self {
        Self {
            deployment_id,
            name: None,
            status: None,
            compute_status: None,
            error: None,
        }
    }
}

/// Requested change to auto-subscribe settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoSubscribeUpdate {
    pub global: Option<bool>,
    pub per_tool: BTreeMap<String, bool>,
}

impl AutoSubscribeUpdate {
    pub fn global(enabled: bool) -> Self {
        Self {
            global: Some(enabled),
            ..Self::default()
        }
    }

    pub fn tool(tool_name: impl Into<String>, enabled: bool) -> Self {
        Self {
            global: None,
            per_tool: BTreeMap::from([(tool_name.into(), enabled)]),
        }
    }
}

/// Result of the post-call hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSubscribeOutcome {
    /// No usable deployment id, or the tool does not auto-subscribe.
    NotApplicable,
    /// Settings resolved to "don't subscribe".
    Declined,
    Subscribed(SubscribeOutcome),
}

// =============================================================================
// Manager
// =============================================================================

pub struct SubscriptionManager {
    registry: Arc<ToolRegistry>,
    gateway: Arc<dyn NotificationGateway>,
    status_provider: Arc<dyn StatusProvider>,
    state: RwLock<SubscriptionState>,
    store: Option<StateStore>,
    call_timeout: Duration,
}

impl fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("tools", &self.registry.len())
            .field("store", &self.store)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl SubscriptionManager {
    pub fn new(
        registry: Arc<ToolRegistry>,
        gateway: Arc<dyn NotificationGateway>,
        status_provider: Arc<dyn StatusProvider>,
    ) -> Self {
        Self {
            registry,
            gateway,
            status_provider,
            state: RwLock::new(SubscriptionState::default()),
            store: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Attach persistence and load any stored state.
    ///
    /// Per-tool overrides for tools this build does not know are dropped.
    pub async fn with_store(mut self, store: StateStore) -> Result<Self> {
        if let Some(mut loaded) = store.load().await? {
            let registry = &self.registry;
            loaded.per_tool_auto_subscribe.retain(|tool, _| {
                let known = registry.has_tool(tool);
                if !known {
                    tracing::warn!(
                        "Dropping stored auto-subscribe override for unknown tool '{}'",
                        tool
                    );
                }
                known
            });
            tracing::info!(
                "Restored {} subscriptions from {}",
                loaded.subscribed_deployments.len(),
                store.path().display()
            );
            self.state = RwLock::new(loaded);
        }
        self.store = Some(store);
        Ok(self)
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    // =========================================================================
    // Membership
    // =========================================================================

    /// Subscribe to a deployment. Idempotent; the id is recorded only if the
    /// gateway accepts it.
    pub async fn subscribe(&self, deployment_id: &DeploymentId) -> Result<SubscribeOutcome> {
        let mut state = self.state.write().await;
        self.subscribe_locked(&mut state, deployment_id).await
    }

    async fn subscribe_locked(
        &self,
        state: &mut SubscriptionState,
        deployment_id: &DeploymentId,
    ) -> Result<SubscribeOutcome> {
        if state.subscribed_deployments.contains(deployment_id) {
            return Ok(SubscribeOutcome {
                deployment_id: deployment_id.clone(),
                newly_subscribed: false,
                total: state.subscribed_deployments.len(),
            });
        }

        self.gateway_call("subscribe", deployment_id, self.gateway.subscribe(deployment_id))
            .await?;

        state.subscribed_deployments.insert(deployment_id.clone());
        self.persist(state).await;
        tracing::info!(
            "Subscribed to deployment {} (total={})",
            deployment_id,
            state.subscribed_deployments.len()
        );

        Ok(SubscribeOutcome {
            deployment_id: deployment_id.clone(),
            newly_subscribed: true,
            total: state.subscribed_deployments.len(),
        })
    }

    /// Unsubscribe from a deployment. The local removal always applies; a
    /// gateway failure is logged and returned as a warning.
    pub async fn unsubscribe(&self, deployment_id: &DeploymentId) -> Result<UnsubscribeOutcome> {
        let mut state = self.state.write().await;

        if !state.subscribed_deployments.remove(deployment_id) {
            return Ok(UnsubscribeOutcome {
                deployment_id: deployment_id.clone(),
                was_subscribed: false,
                total: state.subscribed_deployments.len(),
                warnings: Vec::new(),
            });
        }
        self.persist(&state).await;

        let mut warnings = Vec::new();
        if let Err(e) = self
            .gateway_call("unsubscribe", deployment_id, self.gateway.unsubscribe(deployment_id))
            .await
        {
            tracing::warn!("Gateway unsubscribe failed for {}: {}", deployment_id, e);
            warnings.push(format!("gateway unsubscribe for {} failed: {}", deployment_id, e));
        }
        tracing::info!(
            "Unsubscribed from deployment {} (total={})",
            deployment_id,
            state.subscribed_deployments.len()
        );

        Ok(UnsubscribeOutcome {
            deployment_id: deployment_id.clone(),
            was_subscribed: true,
            total: state.subscribed_deployments.len(),
            warnings,
        })
    }

    /// Drop every subscription. Always succeeds locally; per-id gateway
    /// failures come back as warnings.
    pub async fn clear_all(&self) -> Result<ClearOutcome> {
        let mut state = self.state.write().await;
        let cleared: Vec<DeploymentId> = std::mem::take(&mut state.subscribed_deployments)
            .into_iter()
            .collect();
        self.persist(&state).await;

        let results = join_all(cleared.iter().map(|id| async move {
            (id, self.gateway_call("unsubscribe", id, self.gateway.unsubscribe(id)).await)
        }))
        .await;

        let mut warnings = Vec::new();
        for (id, result) in results {
            if let Err(e) = result {
                tracing::warn!("Gateway unsubscribe failed for {} during clear: {}", id, e);
                warnings.push(format!("gateway unsubscribe for {} failed: {}", id, e));
            }
        }
        tracing::info!("Cleared {} subscriptions", cleared.len());

        Ok(ClearOutcome { cleared, warnings })
    }

    pub async fn is_subscribed(&self, deployment_id: &DeploymentId) -> bool {
        self.state.read().await.subscribed_deployments.contains(deployment_id)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Enumerate subscriptions in id order, optionally enriched with status.
    ///
    /// `include_compute_status` is ignored unless `include_status` is set. A
    /// failed lookup marks that record only.
    pub async fn list_subscriptions(
        &self,
        include_status: bool,
        include_compute_status: bool,
    ) -> Vec<SubscriptionRecord> {
        let ids: Vec<DeploymentId> = {
            let state = self.state.read().await;
            state.subscribed_deployments.iter().cloned().collect()
        };

        if !include_status {
            return ids.into_iter().map(SubscriptionRecord::bare).collect();
        }

        let lookups = ids.into_iter().map(|id| async move {
            let lookup = timeout(
                self.call_timeout,
                self.status_provider.get_status(&id, include_compute_status),
            )
            .await
            .unwrap_or_else(|_| {
                Err(Error::timeout(format!(
                    "status lookup for {} exceeded {:?}",
                    id, self.call_timeout
                )))
            });

            match lookup {
                Ok(status) => SubscriptionRecord {
                    deployment_id: id,
                    name: status.name,
                    status: Some(status.status),
                    compute_status: status.compute_status.filter(|_| include_compute_status),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!("Status lookup failed for {}: {}", id, e);
                    SubscriptionRecord {
                        status: Some("error".to_string()),
                        error: Some(e.to_string()),
                        ..SubscriptionRecord::bare(id)
                    }
                }
            }
        });

        join_all(lookups).await
    }

    pub async fn status(&self) -> SubscriptionStatus {
        let state = self.state.read().await;
        self.snapshot(&state)
    }

    fn snapshot(&self, state: &SubscriptionState) -> SubscriptionStatus {
        SubscriptionStatus {
            global_auto_subscribe: state.global_auto_subscribe,
            per_tool_auto_subscribe: state.per_tool_auto_subscribe.clone(),
            auto_subscribe_tools: self
                .registry
                .tools()
                .filter(|t| t.supports_auto_subscribe)
                .map(|t| (t.name.clone(), state.auto_subscribe_enabled(t, None)))
                .collect(),
            subscription_count: state.subscribed_deployments.len(),
            subscribed_deployments: state.subscribed_deployments.iter().cloned().collect(),
        }
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Apply an auto-subscribe settings change. Unknown tool names reject the
    /// whole update and leave state unchanged.
    pub async fn configure(&self, update: AutoSubscribeUpdate) -> Result<SubscriptionStatus> {
        for tool_name in update.per_tool.keys() {
            let tool = self
                .registry
                .get(tool_name)
                .ok_or_else(|| Error::unknown_tool(tool_name))?;
            if !tool.supports_auto_subscribe {
                tracing::debug!(
                    "Override for '{}' stored but the tool never auto-subscribes",
                    tool_name
                );
            }
        }

        let mut state = self.state.write().await;
        if let Some(enabled) = update.global {
            state.global_auto_subscribe = enabled;
        }
        state.per_tool_auto_subscribe.extend(update.per_tool);
        self.persist(&state).await;

        tracing::info!(
            "Auto-subscription configured: enabled={} overrides={:?}",
            state.global_auto_subscribe,
            state.per_tool_auto_subscribe
        );
        Ok(self.snapshot(&state))
    }

    // =========================================================================
    // Post-call hook
    // =========================================================================

    /// Called after every successful tool call.
    pub async fn on_tool_invoked(
        &self,
        tool_name: &str,
        deployment_id: Option<&DeploymentId>,
        explicit_override: Option<bool>,
    ) -> Result<AutoSubscribeOutcome> {
        let Some(deployment_id) = deployment_id.filter(|id| id.as_str() != DeploymentId::UNKNOWN)
        else {
            return Ok(AutoSubscribeOutcome::NotApplicable);
        };
        let Some(tool) = self.registry.get(tool_name).filter(|t| t.supports_auto_subscribe) else {
            return Ok(AutoSubscribeOutcome::NotApplicable);
        };

        let mut state = self.state.write().await;
        if !state.auto_subscribe_enabled(tool, explicit_override) {
            tracing::debug!(
                "Auto-subscribe declined for {} via {} (override={:?})",
                deployment_id,
                tool_name,
                explicit_override
            );
            return Ok(AutoSubscribeOutcome::Declined);
        }

        let outcome = self.subscribe_locked(&mut state, deployment_id).await?;
        tracing::debug!("Auto-subscribe for {} via {}", deployment_id, tool_name);
        Ok(AutoSubscribeOutcome::Subscribed(outcome))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn gateway_call<F>(&self, op: &str, deployment_id: &DeploymentId, call: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        match timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!(
                "gateway {} for {} exceeded {:?}",
                op, deployment_id, self.call_timeout
            ))),
        }
    }

    async fn persist(&self, state: &SubscriptionState) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(state).await {
                tracing::warn!(
                    "Failed to persist subscription state to {}: {}",
                    store.path().display(),
                    e
                );
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
