//! Guepard platform API client.
//!
//! Per-endpoint tool bodies sit behind the [`ToolBackend`] seam. [`ApiClient`]
//! implements the read-only endpoints needed for status enrichment and
//! connectivity checks; everything else is reported as unsupported.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::subscriptions::{DeploymentStatus, StatusProvider};
use crate::types::{ApiConfig, DeploymentId, Error, Result};

/// User agent for API requests
const USER_AGENT: &str = concat!("guepard-mcp/", env!("CARGO_PKG_VERSION"));

/// Executes a remote platform tool and returns its JSON result.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    async fn call(&self, tool_name: &str, arguments: &Value) -> Result<Value>;
}

/// Client for the Guepard platform REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the JSON body. Non-2xx becomes `Error::Backend`.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http_client.get(&url).query(query);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::backend(format!("GET {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::backend(format!(
                "GET {} returned {}: {}",
                path,
                status.as_u16(),
                body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::backend(format!("GET {} returned invalid JSON: {}", path, e)))
    }

    fn masked_token(&self) -> String {
        match &self.access_token {
            Some(token) => format!("{}...", token.chars().take(20).collect::<String>()),
            None => "<not set>".to_string(),
        }
    }
}

fn deployment_path(arguments: &Value) -> Result<String> {
    let id = arguments
        .get("deployment_id")
        .and_then(Value::as_str)
        .and_then(DeploymentId::recognize)
        .ok_or_else(|| Error::validation("Missing required parameter: deployment_id"))?;
    Ok(format!("/deploy/{}", id))
}

#[async_trait]
impl ToolBackend for ApiClient {
    async fn call(&self, tool_name: &str, arguments: &Value) -> Result<Value> {
        tracing::debug!("API call for tool {}", tool_name);
        match tool_name {
            "test_connection" => {
                self.get("/deploy", &[("limit", "1".to_string())]).await?;
                Ok(serde_json::json!({
                    "api_url": self.base_url,
                    "token": self.masked_token(),
                }))
            }
            "list_deployments" => {
                let mut query = Vec::new();
                if let Some(status) = arguments.get("status").and_then(Value::as_str) {
                    query.push(("status", status.to_string()));
                }
                if let Some(limit) = arguments.get("limit").and_then(Value::as_u64) {
                    query.push(("limit", limit.to_string()));
                }
                self.get("/deploy", &query).await
            }
            "get_deployment" | "get_deployment_status" => {
                self.get(&deployment_path(arguments)?, &[]).await
            }
            "get_compute_status" => {
                let path = format!("{}/compute", deployment_path(arguments)?);
                self.get(&path, &[]).await
            }
            other => Err(Error::backend(format!(
                "tool '{}' is not available in this build",
                other
            ))),
        }
    }
}

#[async_trait]
impl StatusProvider for ApiClient {
    async fn get_status(
        &self,
        deployment_id: &DeploymentId,
        include_compute: bool,
    ) -> Result<DeploymentStatus> {
        let path = format!("/deploy/{}", deployment_id);
        let deployment = self
            .get(&path, &[])
            .await
            .map_err(|e| Error::status_lookup(e.to_string()))?;

        let compute_status = if include_compute {
            match self.get(&format!("{}/compute", path), &[]).await {
                Ok(compute) => Some(
                    compute
                        .get("status")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                ),
                Err(e) => {
                    tracing::debug!("Compute status unavailable for {}: {}", deployment_id, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(DeploymentStatus {
            name: deployment
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
            status: deployment
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            compute_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "Bearer test-token")
            .unwrap_or(false)
    }

    async fn spawn_fake_api() -> String {
        let app = Router::new()
            .route(
                "/deploy",
                get(|headers: HeaderMap| async move {
                    if authorized(&headers) {
                        Ok(Json(serde_json::json!([{"id": "dep-1"}])))
                    } else {
                        Err((StatusCode::UNAUTHORIZED, "bad token"))
                    }
                }),
            )
            .route(
                "/deploy/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "missing" {
                        Err((StatusCode::NOT_FOUND, "no such deployment"))
                    } else {
                        Ok(Json(serde_json::json!({
                            "id": id,
                            "name": "orders",
                            "status": "running"
                        })))
                    }
                }),
            )
            .route(
                "/deploy/{id}/compute",
                get(|Path(id): Path<String>| async move {
                    if id == "nocompute" {
                        Err((StatusCode::INTERNAL_SERVER_ERROR, "boom"))
                    } else {
                        Ok(Json(serde_json::json!({"status": "started"})))
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String, token: Option<&str>) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url,
            access_token: token.map(str::to_string),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn dep(id: &str) -> DeploymentId {
        DeploymentId::from_string(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_status_lookup_with_compute() {
        let api = client(spawn_fake_api().await, Some("test-token"));
        let status = api.get_status(&dep("dep-1"), true).await.unwrap();
        assert_eq!(
            status,
            DeploymentStatus {
                name: Some("orders".to_string()),
                status: "running".to_string(),
                compute_status: Some("started".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_status_lookup_compute_failure_is_tolerated() {
        let api = client(spawn_fake_api().await, Some("test-token"));
        let status = api.get_status(&dep("nocompute"), true).await.unwrap();
        assert_eq!(status.status, "running");
        assert_eq!(status.compute_status, None);
    }

    #[tokio::test]
    async fn test_status_lookup_not_found() {
        let api = client(spawn_fake_api().await, Some("test-token"));
        let err = api.get_status(&dep("missing"), false).await.unwrap_err();
        assert!(matches!(err, Error::StatusLookup(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_connection_requires_token() {
        let base = spawn_fake_api().await;

        let ok = client(base.clone(), Some("test-token"))
            .call("test_connection", &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(ok["token"], "test-token...");

        let err = client(base, None)
            .call("test_connection", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_get_deployment_tool() {
        let api = client(spawn_fake_api().await, Some("test-token"));
        let value = api
            .call("get_deployment", &serde_json::json!({"deployment_id": "dep-5"}))
            .await
            .unwrap();
        assert_eq!(value["id"], "dep-5");
    }

    #[tokio::test]
    async fn test_unsupported_tool() {
        let api = client("http://127.0.0.1:9".to_string(), None);
        let err = api
            .call("delete_deployment", &serde_json::json!({"deployment_id": "dep-1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
    }
}
