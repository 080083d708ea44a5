//! MCP stdio server: read loop, per-request tasks and a single writer.

use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::mcp::codec::{read_message, write_message, Inbound};
use crate::mcp::executor::ToolExecutor;
use crate::mcp::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use crate::mcp::router;
use crate::types::McpConfig;

/// MCP server wrapping the tool executor.
#[derive(Debug)]
pub struct McpServer {
    executor: Arc<ToolExecutor>,
    config: McpConfig,
    cancel: CancellationToken,
}

impl McpServer {
    pub fn new(executor: Arc<ToolExecutor>, config: McpConfig) -> Self {
        Self {
            executor,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Serve on the process stdin/stdout.
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Run until EOF on `reader` or shutdown. In-flight requests are allowed
    /// to finish and their responses are flushed before returning.
    pub async fn serve<R, W>(&self, mut reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Value>(self.config.response_channel_capacity.max(1));
        let writer_task = tokio::spawn(write_responses(writer, rx));
        tracing::info!(
            "MCP server ready (max_message_bytes={})",
            self.config.max_message_bytes
        );

        let result = loop {
            let inbound = tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("MCP server shutting down");
                    break Ok(());
                }
                read = read_message(&mut reader, self.config.max_message_bytes) => read,
            };

            match inbound {
                Ok(Some(Inbound::Message(bytes))) => self.dispatch(bytes, &tx).await,
                Ok(Some(Inbound::Oversized(dropped))) => {
                    tracing::warn!("Dropped oversized message ({} bytes)", dropped);
                    let error = JsonRpcError::parse_error(format!(
                        "message exceeds {} bytes",
                        self.config.max_message_bytes
                    ));
                    send(&tx, JsonRpcResponse::failure(Value::Null, error)).await;
                }
                Ok(None) => {
                    tracing::info!("Client closed input");
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };

        drop(tx);
        match writer_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Response writer stopped: {}", e),
            Err(e) => tracing::error!("Response writer panicked: {}", e),
        }
        result
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Decode one message and spawn its handling; parse failures are
    /// answered inline.
    async fn dispatch(&self, bytes: Vec<u8>, tx: &mpsc::Sender<Value>) {
        let raw: Value = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!("Unparseable message: {}", e);
                send(tx, JsonRpcResponse::failure(Value::Null, JsonRpcError::parse_error(e))).await;
                return;
            }
        };
        let id = raw.get("id").cloned().unwrap_or(Value::Null);

        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(r) => r,
            Err(e) => {
                send(tx, JsonRpcResponse::failure(id, JsonRpcError::invalid_request(e.to_string())))
                    .await;
                return;
            }
        };
        if request.jsonrpc != JSONRPC_VERSION {
            send(
                tx,
                JsonRpcResponse::failure(
                    id,
                    JsonRpcError::invalid_request(format!(
                        "unsupported jsonrpc version '{}'",
                        request.jsonrpc
                    )),
                ),
            )
            .await;
            return;
        }

        let executor = Arc::clone(&self.executor);
        let tx = tx.clone();
        tokio::spawn(async move {
            let JsonRpcRequest {
                id, method, params, ..
            } = request;
            tracing::debug!("MCP request method={}", method);
            let outcome = router::route_request(&executor, &method, params).await;

            // Notifications never get a response.
            let Some(id) = id else {
                if let Err(e) = outcome {
                    tracing::debug!("Notification {} failed: {}", method, e.message);
                }
                return;
            };
            let response = match outcome {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(error) => JsonRpcResponse::failure(id, error),
            };
            send(&tx, response).await;
        });
    }
}

async fn send(tx: &mpsc::Sender<Value>, response: JsonRpcResponse) {
    match serde_json::to_value(&response) {
        Ok(value) => {
            if tx.send(value).await.is_err() {
                tracing::warn!("Response dropped: writer has stopped");
            }
        }
        Err(e) => tracing::error!("Failed to encode response: {}", e),
    }
}

/// Sole owner of the output stream; serializes whole lines.
async fn write_responses<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut rx: mpsc::Receiver<Value>,
) -> std::io::Result<()> {
    while let Some(message) = rx.recv().await {
        write_message(&mut writer, &message).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ToolBackend;
    use crate::mcp::protocol::{INVALID_REQUEST, PARSE_ERROR};
    use crate::subscriptions::gateway::MockStatusProvider;
    use crate::subscriptions::{LocalGateway, SubscriptionManager};
    use crate::tools::builtin::builtin_registry;
    use crate::tools::policy::{ActivationInputs, PolicyHandle};
    use crate::types::Result;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

    #[derive(Debug)]
    struct EchoBackend;

    #[async_trait]
    impl ToolBackend for EchoBackend {
        async fn call(&self, tool_name: &str, arguments: &Value) -> Result<Value> {
            Ok(json!({"tool": tool_name, "arguments": arguments}))
        }
    }

    fn server(config: McpConfig) -> McpServer {
        let registry = Arc::new(builtin_registry().unwrap());
        let policy =
            PolicyHandle::new(Arc::clone(&registry), &ActivationInputs::default()).unwrap();
        let manager = Arc::new(SubscriptionManager::new(
            registry,
            Arc::new(LocalGateway),
            Arc::new(MockStatusProvider::new()),
        ));
        let executor = ToolExecutor::new(policy, manager, Arc::new(EchoBackend));
        McpServer::new(Arc::new(executor), config)
    }

    /// Feed `input` to a server and collect every response line.
    async fn exchange(config: McpConfig, input: &str) -> Vec<Value> {
        let (mut client, server_side) = tokio::io::duplex(64 * 1024);
        let (read_half, write_half) = tokio::io::split(server_side);
        let server = server(config);

        client.write_all(input.as_bytes()).await.unwrap();
        client.shutdown().await.unwrap();

        server.serve(BufReader::new(read_half), write_half).await.unwrap();
        drop(server);

        let mut lines = BufReader::new(client).lines();
        let mut out = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            out.push(serde_json::from_str(&line).unwrap());
        }
        out
    }

    fn by_id(responses: &[Value], id: i64) -> &Value {
        responses.iter().find(|r| r["id"] == id).unwrap()
    }

    #[tokio::test]
    async fn test_requests_answered_and_notifications_silent() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#, "\n",
        );
        let responses = exchange(McpConfig::default(), input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(by_id(&responses, 1)["result"]["serverInfo"]["name"], "guepard-mcp");
        assert_eq!(by_id(&responses, 2)["result"], json!({}));
    }

    #[tokio::test]
    async fn test_null_id_request_is_answered() {
        let responses = exchange(
            McpConfig::default(),
            "{\"jsonrpc\":\"2.0\",\"id\":null,\"method\":\"ping\"}\n",
        )
        .await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let responses = exchange(McpConfig::default(), "{not json\n").await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_wrong_version_is_invalid_request() {
        let responses = exchange(
            McpConfig::default(),
            "{\"jsonrpc\":\"1.0\",\"id\":7,\"method\":\"ping\"}\n",
        )
        .await;
        assert_eq!(responses[0]["id"], 7);
        assert_eq!(responses[0]["error"]["code"], INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_message_then_recovery() {
        let config = McpConfig {
            max_message_bytes: 64,
            ..McpConfig::default()
        };
        let big = format!(
            "{{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\",\"params\":{{\"pad\":\"{}\"}}}}\n",
            "x".repeat(200)
        );
        let input = format!("{}{}", big, "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n");
        let responses = exchange(config, &input).await;
        assert_eq!(responses.len(), 2);
        assert!(responses
            .iter()
            .any(|r| r["id"] == Value::Null && r["error"]["code"] == PARSE_ERROR));
        assert_eq!(by_id(&responses, 2)["result"], json!({}));
    }

    #[tokio::test]
    async fn test_tools_call_round_trip() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"list_deployments","arguments":{"limit":5}}}"#,
            "\n",
        );
        let responses = exchange(McpConfig::default(), input).await;
        let result = &responses[0]["result"];
        assert_eq!(responses[0]["id"], "a");
        assert_eq!(result["isError"], false);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("\"tool\": \"list_deployments\""));
    }

    #[tokio::test]
    async fn test_shutdown_stops_read_loop() {
        let (_client, server_side) = tokio::io::duplex(1024);
        let (read_half, write_half) = tokio::io::split(server_side);
        let server = Arc::new(server(McpConfig::default()));

        let running = Arc::clone(&server);
        let handle = tokio::spawn(async move {
            running.serve(BufReader::new(read_half), write_half).await
        });
        server.shutdown();
        handle.await.unwrap().unwrap();
    }
}
