//! Tool source abstraction: list tools and call a tool.
//!
//! The tool pipeline depends on `ToolSource` instead of a concrete registry;
//! implementations here are `MathToolSource` and `JokeToolSource` (in-process)
//! plus `RpcToolSource` (JSON-RPC over HTTP, the deployed shape). The
//! [`ToolRegistry`] aggregates several sources behind one name space.

mod joke;
mod math;
mod registry;
mod rpc;

pub use joke::JokeToolSource;
pub use math::MathToolSource;
pub use registry::ToolRegistry;
pub use rpc::{RpcToolSource, PROTOCOL_VERSION};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Tool specification, aligned with a `tools/list` result item.
///
/// The schema rides along to the model as the function-calling parameter
/// schema. Serialized with `inputSchema` so the wire matches what tool
/// servers publish.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    /// Tool name (used in tools/call).
    pub name: String,
    /// Human-readable description for the LLM.
    #[serde(default)]
    pub description: Option<String>,
    /// JSON Schema for arguments.
    #[serde(rename = "inputSchema", alias = "input_schema")]
    pub input_schema: Value,
}

/// Result of a single tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallContent {
    /// Result text (from result.content[].text on the wire).
    pub text: String,
}

/// Errors from listing or calling tools.
///
/// `InvalidInput` keeps the raw message because the text is fed back to the
/// model verbatim for self-correction.
#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("tool error {code}: {message}")]
    JsonRpc { code: i64, message: String },
}

impl ToolSourceError {
    /// Message suitable for feeding back to the model: remote errors unwrap
    /// to the server's message, local ones use their Display form.
    pub fn model_message(&self) -> String {
        match self {
            ToolSourceError::JsonRpc { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Tool source: list available tools and call one by name.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// List available tools.
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;

    /// Call a tool by name with JSON arguments.
    async fn call_tool(&self, name: &str, arguments: Value)
        -> Result<ToolCallContent, ToolSourceError>;
}
