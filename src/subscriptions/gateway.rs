//! Remote collaborators of the subscription manager.
//!
//! The manager never talks to the network directly: notification delivery
//! goes through a [`NotificationGateway`], per-deployment status enrichment
//! through a [`StatusProvider`]. Both are object-safe so they can be swapped
//! for fakes in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{DeploymentId, Result};

/// Accepts subscribe/unsubscribe requests for a deployment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn subscribe(&self, deployment_id: &DeploymentId) -> Result<()>;

    async fn unsubscribe(&self, deployment_id: &DeploymentId) -> Result<()>;
}

/// Status of one deployment as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_status: Option<String>,
}

/// Looks up deployment status for `list_subscriptions` enrichment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusProvider: Send + Sync {
    /// `include_compute` additionally fetches the compute status. A failed
    /// compute lookup leaves `compute_status` empty rather than failing.
    async fn get_status(
        &self,
        deployment_id: &DeploymentId,
        include_compute: bool,
    ) -> Result<DeploymentStatus>;
}

/// In-process gateway: membership lives only in the manager's state.
///
/// This is the default for the stdio server, where the MCP client itself
/// is the notification consumer.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalGateway;

#[async_trait]
impl NotificationGateway for LocalGateway {
    async fn subscribe(&self, deployment_id: &DeploymentId) -> Result<()> {
        tracing::debug!("Local gateway: subscribe {}", deployment_id);
        Ok(())
    }

    async fn unsubscribe(&self, deployment_id: &DeploymentId) -> Result<()> {
        tracing::debug!("Local gateway: unsubscribe {}", deployment_id);
        Ok(())
    }
}
