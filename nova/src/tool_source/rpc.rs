//! JSON-RPC tool source over HTTP.
//!
//! Speaks the tool server wire: `initialize` once at connect, then
//! `tools/list` and `tools/call` POSTed as JSON-RPC 2.0 envelopes to a single
//! endpoint. Server-reported errors surface as [`ToolSourceError::JsonRpc`]
//! with the server's code and message intact so callers can feed the message
//! back to the model.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::tool_source::{ToolCallContent, ToolSource, ToolSourceError, ToolSpec};

/// Protocol revision sent during the initialize handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Client for one remote tool server.
#[derive(Debug)]
pub struct RpcToolSource {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcToolSource {
    /// Connects to the tool server at `url` and performs the initialize
    /// handshake. Fails when the server is unreachable or rejects the
    /// handshake, so a half-wired deployment dies at startup instead of on
    /// the first user query.
    pub async fn connect(url: impl Into<String>) -> Result<Self, ToolSourceError> {
        let source = Self {
            client: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        };
        let result = source
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "clientInfo": {
                        "name": "nova",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
            .await?;
        let server = result["serverInfo"]["name"].as_str().unwrap_or("unknown");
        debug!(url = %source.url, server, "tool server initialized");
        Ok(source)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ToolSourceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("{method} request failed: {e}")))?;
        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("{method} response invalid: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(ToolSourceError::JsonRpc {
                code: error.code,
                message: error.message,
            });
        }
        parsed.result.ok_or_else(|| {
            ToolSourceError::Transport(format!("{method} response has neither result nor error"))
        })
    }
}

#[async_trait]
impl ToolSource for RpcToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .cloned()
            .ok_or_else(|| ToolSourceError::Transport("tools/list result missing tools".into()))?;
        serde_json::from_value(tools)
            .map_err(|e| ToolSourceError::Transport(format!("tools/list result invalid: {e}")))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let result = self
            .request(
                "tools/call",
                json!({"name": name, "arguments": arguments}),
            )
            .await?;
        let text = result["content"]
            .as_array()
            .and_then(|items| items.first())
            .and_then(|item| item["text"].as_str())
            .ok_or_else(|| {
                ToolSourceError::Transport("tools/call result missing text content".into())
            })?;
        Ok(ToolCallContent {
            text: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: connecting to a closed port fails with a transport
    /// error naming the failed method.
    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let err = RpcToolSource::connect("http://127.0.0.1:1/")
            .await
            .unwrap_err();
        match err {
            ToolSourceError::Transport(msg) => assert!(msg.contains("initialize")),
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    /// **Scenario**: a result envelope parses into result, an error envelope
    /// into code and message.
    #[test]
    fn rpc_envelopes_parse() {
        let ok: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc": "2.0", "id": 1, "result": {"tools": []}}"#)
                .unwrap();
        assert!(ok.error.is_none());
        assert_eq!(ok.result.unwrap()["tools"], json!([]));

        let err: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc": "2.0", "id": 2, "error": {"code": -32601, "message": "method not found: x"}}"#,
        )
        .unwrap();
        let body = err.error.unwrap();
        assert_eq!(body.code, -32601);
        assert!(body.message.contains("method not found"));
    }
}
