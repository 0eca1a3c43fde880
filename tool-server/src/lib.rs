//! JSON-RPC 2.0 HTTP server over a [`ToolSource`].
//!
//! Serving side of the transport `nova::RpcToolSource` speaks: one `POST /`
//! endpoint dispatching `initialize`, `tools/list`, and `tools/call`. Each
//! tool family runs as its own process (`math-server`, `joke-server`); the
//! orchestrator discovers both at startup.
//!
//! Error codes: unknown method `-32601`, unknown tool `-32602`, invalid tool
//! input `-32000` with the tool's message verbatim (the orchestrator feeds
//! that text back to the model), anything else `-32603`.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, info};

use nova::tool_source::{ToolSource, ToolSourceError, PROTOCOL_VERSION};

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Clone)]
struct ServerState {
    source: Arc<dyn ToolSource>,
    name: String,
}

fn ok(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn err(id: Value, code: i64, message: String) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}

fn tool_error(id: Value, error: ToolSourceError) -> Value {
    match error {
        ToolSourceError::NotFound(name) => err(id, -32602, format!("tool not found: {name}")),
        ToolSourceError::InvalidInput(message) => err(id, -32000, message),
        ToolSourceError::JsonRpc { code, message } => err(id, code, message),
        ToolSourceError::Transport(message) => err(id, -32603, message),
    }
}

async fn rpc(State(state): State<ServerState>, Json(request): Json<RpcRequest>) -> Json<Value> {
    let RpcRequest { id, method, params } = request;
    debug!(server = %state.name, %method, "rpc request");

    let response = match method.as_str() {
        "initialize" => ok(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": state.name,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ),
        "tools/list" => match state.source.list_tools().await {
            Ok(tools) => ok(id, json!({"tools": tools})),
            Err(error) => tool_error(id, error),
        },
        "tools/call" => {
            let name = params["name"].as_str().unwrap_or_default().to_string();
            let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
            match state.source.call_tool(&name, arguments).await {
                Ok(content) => ok(
                    id,
                    json!({"content": [{"type": "text", "text": content.text}]}),
                ),
                Err(error) => tool_error(id, error),
            }
        }
        other => err(id, -32601, format!("method not found: {other}")),
    };
    Json(response)
}

/// Serves `source` as a JSON-RPC endpoint on `listener` until the process
/// exits. `name` is reported in the initialize handshake and in logs.
pub async fn run_tool_server(
    listener: TcpListener,
    source: Arc<dyn ToolSource>,
    name: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!(server = name, "tool server listening on http://{}", addr);
    let app = Router::new().route("/", post(rpc)).with_state(ServerState {
        source,
        name: name.to_string(),
    });
    axum::serve(listener, app).await?;
    Ok(())
}
