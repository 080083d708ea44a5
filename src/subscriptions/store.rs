//! Versioned on-disk record of the subscription state.
//!
//! One JSON document per server instance. Writes go to a sibling temp file
//! that is then renamed over the record, so a crash mid-write leaves the
//! previous record intact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::SubscriptionState;
use crate::types::{DeploymentId, Error, Result};

/// Highest record version this build can read.
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StateRecord {
    version: u32,
    global_auto_subscribe: bool,
    #[serde(default)]
    per_tool_auto_subscribe: BTreeMap<String, bool>,
    #[serde(default)]
    subscribed_deployments: BTreeSet<DeploymentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
}

/// File-backed store for [`SubscriptionState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored state. `Ok(None)` when no record exists yet.
    pub async fn load(&self) -> Result<Option<SubscriptionState>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let raw: serde_json::Value = serde_json::from_slice(&bytes)?;
        let version = raw
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "subscription state {} has no version",
                    self.path.display()
                ))
            })?;
        if version > u64::from(STATE_VERSION) {
            return Err(Error::configuration(format!(
                "subscription state {} has version {}, newest supported is {}",
                self.path.display(),
                version,
                STATE_VERSION
            )));
        }

        let record: StateRecord = serde_json::from_value(raw)?;
        let subscribed_deployments = record
            .subscribed_deployments
            .into_iter()
            .filter_map(|stored| {
                let id = DeploymentId::recognize(stored.as_str());
                if id.is_none() {
                    tracing::warn!(
                        "Dropping invalid deployment id {:?} from {}",
                        stored.as_str(),
                        self.path.display()
                    );
                }
                id
            })
            .collect();
        Ok(Some(SubscriptionState {
            global_auto_subscribe: record.global_auto_subscribe,
            per_tool_auto_subscribe: record.per_tool_auto_subscribe,
            subscribed_deployments,
        }))
    }

    /// Atomically replace the stored record with `state`.
    pub async fn save(&self, state: &SubscriptionState) -> Result<()> {
        let record = StateRecord {
            version: STATE_VERSION,
            global_auto_subscribe: state.global_auto_subscribe,
            per_tool_auto_subscribe: state.per_tool_auto_subscribe.clone(),
            subscribed_deployments: state.subscribed_deployments.clone(),
            saved_at: Some(Utc::now()),
        };
        let bytes = serde_json::to_vec_pretty(&record)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(
            "Saved subscription state to {} ({} deployments)",
            self.path.display(),
            state.subscribed_deployments.len()
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "subscriptions.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
