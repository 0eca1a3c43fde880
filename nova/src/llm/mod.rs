//! LLM client abstraction for graph nodes.
//!
//! Router, chat, and tool nodes depend on a callable that returns assistant
//! text and optional tool_calls; this module defines the trait plus the Groq
//! client and a mock implementation.
//!
//! # Streaming Support
//!
//! The `LlmClient` trait supports streaming via `invoke_stream()`, which
//! accepts an optional `Sender<MessageChunk>` for emitting tokens as they
//! arrive. Implementations that support streaming (like `ChatGroq`) send
//! chunks through the channel; others can use the default implementation
//! that calls `invoke()` and sends the full content as one chunk.

mod groq;
mod mock;

pub use groq::{ChatGroq, DEFAULT_API_BASE};
pub use mock::MockLlm;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AgentError;
use crate::message::{Message, ToolCall};

/// One streamed token of assistant output.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageChunk {
    pub content: String,
}

/// Token usage for one LLM call (prompt + completion).
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    /// Tokens in the prompt (input).
    pub prompt_tokens: u32,
    /// Tokens in the completion (output).
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion).
    pub total_tokens: u32,
}

/// Response from an LLM completion: assistant message text and optional tool calls.
#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    /// Assistant message content (plain text).
    pub content: String,
    /// Tool calls from this turn; empty means the model answered directly.
    pub tool_calls: Vec<ToolCall>,
    /// Token usage for this call, when the provider returns it.
    pub usage: Option<LlmUsage>,
}

/// LLM client: given messages, returns assistant text and optional tool_calls.
///
/// Implementations: `MockLlm` (scripted responses for tests), `ChatGroq`
/// (OpenAI-compatible API).
///
/// # Streaming
///
/// When `chunk_tx` is `Some`, implementations should send `MessageChunk`
/// tokens through the channel as they arrive. The method still returns the
/// complete `LlmResponse` at the end.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Invoke one turn: read messages, return assistant content and optional tool_calls.
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, AgentError>;

    /// Streaming variant: invoke with optional chunk sender for token streaming.
    ///
    /// Default implementation calls `invoke()` and sends the full content as
    /// one chunk.
    async fn invoke_stream(
        &self,
        messages: &[Message],
        chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    ) -> Result<LlmResponse, AgentError> {
        let response = self.invoke(messages).await?;

        if let Some(tx) = chunk_tx {
            if !response.content.is_empty() {
                let _ = tx
                    .send(MessageChunk {
                        content: response.content.clone(),
                    })
                    .await;
            }
        }

        Ok(response)
    }
}
