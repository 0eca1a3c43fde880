//! Wire tests: spin a tool server on an ephemeral port and drive it both
//! through `nova::RpcToolSource` (the real client) and raw reqwest.

use std::sync::Arc;

use serde_json::json;

use nova::tool_source::{
    JokeToolSource, MathToolSource, RpcToolSource, ToolSource, ToolSourceError,
};

async fn spawn(source: Arc<dyn ToolSource>, name: &'static str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        tool_server::run_tool_server(listener, source, name)
            .await
            .unwrap();
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn math_server_round_trip() {
    let url = spawn(Arc::new(MathToolSource::new()), "math-server").await;
    let client = RpcToolSource::connect(&url).await.unwrap();

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), MathToolSource::NAMES.len());
    assert!(tools.iter().any(|t| t.name == "multiply"));

    let out = client
        .call_tool("multiply", json!({"a": 12, "b": 7}))
        .await
        .unwrap();
    assert_eq!(out.text, "84");
}

#[tokio::test]
async fn divide_by_zero_keeps_its_message_over_the_wire() {
    let url = spawn(Arc::new(MathToolSource::new()), "math-server").await;
    let client = RpcToolSource::connect(&url).await.unwrap();

    let err = client
        .call_tool("divide", json!({"a": 5, "b": 0}))
        .await
        .unwrap_err();
    match err {
        ToolSourceError::JsonRpc { code, message } => {
            assert_eq!(code, -32000);
            assert_eq!(message, "Cannot divide by zero");
        }
        other => panic!("expected JsonRpc, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_tool_and_method_map_to_rpc_codes() {
    let url = spawn(Arc::new(MathToolSource::new()), "math-server").await;
    let client = RpcToolSource::connect(&url).await.unwrap();

    let err = client.call_tool("get_random_joke", json!({})).await.unwrap_err();
    match err {
        ToolSourceError::JsonRpc { code, message } => {
            assert_eq!(code, -32602);
            assert!(message.contains("tool not found: get_random_joke"));
        }
        other => panic!("expected JsonRpc, got {other:?}"),
    }

    let body: serde_json::Value = reqwest::Client::new()
        .post(&url)
        .json(&json!({"jsonrpc": "2.0", "id": 9, "method": "tools/uninstall", "params": {}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["id"], 9);
    assert_eq!(body["error"]["code"], -32601);
}

#[tokio::test]
async fn joke_server_serves_the_catalog() {
    let url = spawn(Arc::new(JokeToolSource::new()), "joke-server").await;
    let client = RpcToolSource::connect(&url).await.unwrap();

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), JokeToolSource::NAMES.len());

    let categories = client.call_tool("list_joke_categories", json!({})).await.unwrap();
    assert!(categories.text.contains("programming"));

    let joke = client
        .call_tool("get_joke_by_category", json!({"category": "programming"}))
        .await
        .unwrap();
    assert!(!joke.text.is_empty());

    // An unknown category is a normal result the model can relay, not an
    // RPC-level error.
    let unknown = client
        .call_tool("get_joke_by_category", json!({"category": "dad"}))
        .await
        .unwrap();
    assert!(unknown.text.contains("Category 'dad' not found"));
    assert!(unknown.text.contains("programming"));
}

#[tokio::test]
async fn initialize_reports_server_info() {
    let url = spawn(Arc::new(MathToolSource::new()), "math-server").await;
    let body: serde_json::Value = reqwest::Client::new()
        .post(&url)
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"protocolVersion": "2024-11-05", "clientInfo": {"name": "test"}}
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["result"]["serverInfo"]["name"], "math-server");
    assert!(body["result"]["protocolVersion"].is_string());
}
