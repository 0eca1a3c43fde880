//! Groq chat client over the OpenAI-compatible API.
//!
//! One `ChatGroq` instance is one model configuration: model name, optional
//! bound tools, sampling settings. The engine builds a separate instance per
//! role (router, chat, tool, title) and hands each to its node, so nothing
//! here is process-global.
//!
//! Tool calls round-trip through the transcript: assistant messages carry the
//! calls the model requested, tool messages carry results keyed by call id.
//! Streaming accumulates both content tokens and tool-call argument deltas,
//! returning the same `LlmResponse` a non-streaming call would.

use std::collections::HashMap;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessageArgs,
        ChatCompletionRequestUserMessage, ChatCompletionTool, ChatCompletionTools,
        CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
    },
    Client,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse, LlmUsage, MessageChunk};
use crate::message::{Message, ToolCall};
use crate::tool_source::ToolSpec;

/// Default API base for Groq's OpenAI-compatible endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Chat completion client for Groq-hosted models.
pub struct ChatGroq {
    client: Client<OpenAIConfig>,
    model: String,
    tools: Vec<ToolSpec>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl ChatGroq {
    /// Creates a client for `model` against the default Groq endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(DEFAULT_API_BASE);
        Self::with_config(config, model)
    }

    /// Creates a client with an explicit endpoint configuration.
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Binds tool specs; the model may answer with calls to any of them.
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    /// Sets sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Caps completion length; used by the router and title models, which
    /// only ever need a handful of tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Model name this client calls.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_messages(
        &self,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, AgentError> {
        let mut out = Vec::with_capacity(messages.len());
        for message in messages {
            let converted = match message {
                Message::System(s) => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage::from(s.as_str()),
                ),
                Message::User(s) => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage::from(s.as_str()),
                ),
                Message::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                    if !content.is_empty() {
                        args.content(content.as_str());
                    }
                    if !tool_calls.is_empty() {
                        let calls: Vec<ChatCompletionMessageToolCalls> =
                            tool_calls.iter().map(request_tool_call).collect();
                        args.tool_calls(calls);
                    }
                    ChatCompletionRequestMessage::Assistant(args.build().map_err(|e| {
                        AgentError::ExecutionFailed(format!("assistant message build failed: {e}"))
                    })?)
                }
                Message::Tool {
                    call_id, content, ..
                } => ChatCompletionRequestMessage::Tool(
                    ChatCompletionRequestToolMessageArgs::default()
                        .content(content.as_str())
                        .tool_call_id(call_id.as_str())
                        .build()
                        .map_err(|e| {
                            AgentError::ExecutionFailed(format!(
                                "tool message build failed: {e}"
                            ))
                        })?,
                ),
            };
            out.push(converted);
        }
        Ok(out)
    }

    fn request_tools(&self) -> Vec<ChatCompletionTools> {
        self.tools
            .iter()
            .map(|spec| {
                ChatCompletionTools::Function(ChatCompletionTool {
                    function: FunctionObject {
                        name: spec.name.clone(),
                        description: spec.description.clone(),
                        parameters: Some(spec.input_schema.clone()),
                        ..Default::default()
                    },
                })
            })
            .collect()
    }

    fn build_request(
        &self,
        messages: &[Message],
        stream: bool,
    ) -> Result<async_openai::types::chat::CreateChatCompletionRequest, AgentError> {
        let request_messages = self.request_messages(messages)?;
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone()).messages(request_messages);
        if !self.tools.is_empty() {
            args.tools(self.request_tools());
        }
        if let Some(temperature) = self.temperature {
            args.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            args.max_completion_tokens(max_tokens);
        }
        if stream {
            args.stream(true);
        }
        args.build()
            .map_err(|e| AgentError::ExecutionFailed(format!("chat request build failed: {e}")))
    }
}

fn request_tool_call(call: &ToolCall) -> ChatCompletionMessageToolCalls {
    ChatCompletionMessageToolCalls::Function(ChatCompletionMessageToolCall {
        id: call.id.clone().unwrap_or_default(),
        function: FunctionCall {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        },
    })
}

#[async_trait]
impl LlmClient for ChatGroq {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, AgentError> {
        let request = self.build_request(messages, false)?;
        debug!(
            model = %self.model,
            messages = messages.len(),
            tools = self.tools.len(),
            "chat completion request"
        );
        if let Ok(body) = serde_json::to_string(&request) {
            trace!(%body, "chat completion request body");
        }

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::ExecutionFailed(format!("chat completion failed: {e}")))?;

        let usage = response.usage.map(|u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            AgentError::ExecutionFailed("chat completion returned no choices".to_string())
        })?;

        let content = choice.message.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tc| match tc {
                ChatCompletionMessageToolCalls::Function(f) => Some(ToolCall {
                    name: f.function.name,
                    arguments: f.function.arguments,
                    id: Some(f.id),
                }),
                _ => None,
            })
            .collect();

        debug!(
            model = %self.model,
            content_len = content.len(),
            tool_calls = tool_calls.len(),
            "chat completion response"
        );

        Ok(LlmResponse {
            content,
            tool_calls,
            usage,
        })
    }

    async fn invoke_stream(
        &self,
        messages: &[Message],
        chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    ) -> Result<LlmResponse, AgentError> {
        let Some(tx) = chunk_tx else {
            return self.invoke(messages).await;
        };

        let request = self.build_request(messages, true)?;
        debug!(
            model = %self.model,
            messages = messages.len(),
            "streaming chat completion request"
        );

        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| AgentError::ExecutionFailed(format!("chat stream failed: {e}")))?;

        let mut content = String::new();
        // index -> (id, name, accumulated arguments)
        let mut call_parts: HashMap<u32, (String, String, String)> = HashMap::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AgentError::ExecutionFailed(format!("chat stream failed: {e}")))?;
            for choice in chunk.choices {
                if let Some(token) = choice.delta.content {
                    if !token.is_empty() {
                        content.push_str(&token);
                        if tx
                            .send(MessageChunk {
                                content: token,
                            })
                            .await
                            .is_err()
                        {
                            warn!("token receiver dropped; continuing to drain stream");
                        }
                    }
                }
                if let Some(deltas) = choice.delta.tool_calls {
                    for delta in deltas {
                        let entry = call_parts.entry(delta.index).or_default();
                        if let Some(id) = delta.id {
                            entry.0 = id;
                        }
                        if let Some(function) = delta.function {
                            if let Some(name) = function.name {
                                entry.1 = name;
                            }
                            if let Some(arguments) = function.arguments {
                                entry.2.push_str(&arguments);
                            }
                        }
                    }
                }
            }
        }

        let mut indices: Vec<u32> = call_parts.keys().copied().collect();
        indices.sort_unstable();
        let tool_calls: Vec<ToolCall> = indices
            .into_iter()
            .filter_map(|i| call_parts.remove(&i))
            .map(|(id, name, arguments)| ToolCall {
                name,
                arguments,
                id: if id.is_empty() { None } else { Some(id) },
            })
            .collect();

        debug!(
            model = %self.model,
            content_len = content.len(),
            tool_calls = tool_calls.len(),
            "streaming chat completion finished"
        );

        Ok(LlmResponse {
            content,
            tool_calls,
            usage: None,
        })
    }
}
