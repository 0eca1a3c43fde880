//! Mock LLM client for tests.
//!
//! Plays back a script of responses in order, repeating the last one when
//! the script runs out. A failing mock errors on every call; a by-char mock
//! streams its content one character per chunk so token forwarding can be
//! observed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse, MessageChunk};
use crate::message::{Message, ToolCall};

/// Scripted LLM for tests: fixed or sequenced responses, optional failure.
pub struct MockLlm {
    script: Mutex<VecDeque<LlmResponse>>,
    fallback: LlmResponse,
    failure: Option<String>,
    stream_by_char: bool,
    invocations: AtomicUsize,
}

impl MockLlm {
    /// Always returns `content` with no tool calls.
    pub fn fixed(content: impl Into<String>) -> Self {
        Self::scripted(vec![LlmResponse {
            content: content.into(),
            ..LlmResponse::default()
        }])
    }

    /// Plays `responses` in order; once exhausted, repeats the last one.
    pub fn scripted(responses: Vec<LlmResponse>) -> Self {
        let fallback = responses.last().cloned().unwrap_or_default();
        Self {
            script: Mutex::new(responses.into()),
            fallback,
            failure: None,
            stream_by_char: false,
            invocations: AtomicUsize::new(0),
        }
    }

    /// First requests one tool call, then answers with `answer`.
    pub fn tool_call_then_answer(
        name: impl Into<String>,
        arguments: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self::scripted(vec![
            LlmResponse {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    name: name.into(),
                    arguments: arguments.into(),
                    id: Some("call_1".to_string()),
                }],
                usage: None,
            },
            LlmResponse {
                content: answer.into(),
                ..LlmResponse::default()
            },
        ])
    }

    /// Fails every call with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: LlmResponse::default(),
            failure: Some(message.into()),
            stream_by_char: false,
            invocations: AtomicUsize::new(0),
        }
    }

    /// Streams content one character per chunk instead of one full chunk.
    pub fn with_stream_by_char(mut self) -> Self {
        self.stream_by_char = true;
        self
    }

    /// Number of invoke/invoke_stream calls so far.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Result<LlmResponse, AgentError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(AgentError::ExecutionFailed(message.clone()));
        }
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        Ok(script.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, _messages: &[Message]) -> Result<LlmResponse, AgentError> {
        self.next_response()
    }

    async fn invoke_stream(
        &self,
        messages: &[Message],
        chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    ) -> Result<LlmResponse, AgentError> {
        if !self.stream_by_char {
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
            return Ok(response);
        }

        let response = self.next_response()?;
        if let Some(tx) = chunk_tx {
            for ch in response.content.chars() {
                let _ = tx
                    .send(MessageChunk {
                        content: ch.to_string(),
                    })
                    .await;
            }
        }
        Ok(response)
    }
}
