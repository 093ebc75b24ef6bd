//! Line-delimited JSON-RPC server over stdio.
//!
//! stdout carries only the JSON-RPC stream; all logging goes to stderr.

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::context::ToolContext;
use super::protocol::{InitializeResult, JsonRpcRequest, JsonRpcResponse, McpError};
use super::registry::McpRegistry;

pub struct McpServer {
    registry: Arc<McpRegistry>,
    context: ToolContext,
    server_name: String,
    initialized: bool,
    shutdown_requested: bool,
}

impl McpServer {
    pub fn new(registry: Arc<McpRegistry>, context: ToolContext, server_name: &str) -> Self {
        Self {
            registry,
            context,
            server_name: server_name.to_string(),
            initialized: false,
            shutdown_requested: false,
        }
    }

    pub async fn serve_stdio(&mut self, token: CancellationToken) -> anyhow::Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout(), token)
            .await
    }

    /// Serve requests line by line until EOF, shutdown or cancellation.
    pub async fn serve<R, W>(
        &mut self,
        reader: R,
        mut writer: W,
        token: CancellationToken,
    ) -> anyhow::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        info!(server = %self.server_name, "Serving MCP requests");
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Serve loop cancelled");
                    break;
                }
                line = lines.next_line() => {
                    let line = match line? {
                        Some(line) => line,
                        None => {
                            info!("Input stream closed");
                            break;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Some(response) = self.handle_line(&line).await {
                        let mut encoded = serde_json::to_string(&response)?;
                        encoded.push('\n');
                        writer.write_all(encoded.as_bytes()).await?;
                        writer.flush().await?;
                    }
                    if self.shutdown_requested {
                        info!("Shutdown requested");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    &McpError::ParseError(e.to_string()),
                ))
            }
        };

        let id = request.id.clone();
        let result = self.dispatch(&request).await;
        match id {
            Some(id) => Some(match result {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => JsonRpcResponse::error(id, &e),
            }),
            // Notifications never get a response, even on failure.
            None => {
                if let Err(e) = result {
                    warn!(method = %request.method, error = %e, "Notification handling failed");
                }
                None
            }
        }
    }

    async fn dispatch(&mut self, request: &JsonRpcRequest) -> Result<Value, McpError> {
        let op_id = Uuid::new_v4();
        debug!(%op_id, method = %request.method, "Handling request");

        if !self.initialized && !matches!(request.method.as_str(), "initialize" | "ping") {
            return Err(McpError::NotInitialized);
        }

        match request.method.as_str() {
            "initialize" => {
                self.initialized = true;
                info!(%op_id, "Client initialized");
                to_value(InitializeResult::new(
                    &self.server_name,
                    &self.context.server_version,
                ))
            }
            "notifications/initialized" => Ok(Value::Null),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({"tools": self.registry.list_tools()})),
            "tools/call" => {
                let name = request
                    .params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| McpError::InvalidParams("missing tool name".to_string()))?;
                let arguments = request
                    .params
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| json!({}));
                info!(%op_id, tool = name, "Tool call");
                let result = self
                    .registry
                    .call_tool(name, self.context.clone(), arguments)
                    .await?;
                to_value(result)
            }
            "resources/list" => Ok(json!({"resources": self.registry.list_resources()})),
            "resources/read" => {
                let uri = request
                    .params
                    .get("uri")
                    .and_then(Value::as_str)
                    .ok_or_else(|| McpError::InvalidParams("missing resource uri".to_string()))?;
                info!(%op_id, uri, "Resource read");
                let contents = self
                    .registry
                    .read_resource(uri, self.context.clone())
                    .await?;
                Ok(json!({"contents": contents}))
            }
            "shutdown" => {
                self.shutdown_requested = true;
                Ok(Value::Null)
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}
