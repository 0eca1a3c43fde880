//! Conversational responder node.
//!
//! Builds persona + full history + query, invokes the chat model (streaming
//! tokens when the run has a consumer), and stores the reply as the turn's
//! answer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::invoke_with_streaming;
use crate::agent::prompts::CHAT_PROMPT;
use crate::error::AgentError;
use crate::graph::{Next, Node, RunContext};
use crate::llm::LlmClient;
use crate::message::Message;
use crate::state::TurnState;

/// Answers general queries with conversation context.
pub struct ChatNode {
    llm: Arc<dyn LlmClient>,
}

impl ChatNode {
    pub const ID: &'static str = "chat";

    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    fn build_messages(state: &TurnState) -> Vec<Message> {
        let mut messages = Vec::with_capacity(state.history.len() + 2);
        messages.push(Message::system(CHAT_PROMPT));
        messages.extend(state.history.iter().map(|h| h.to_message()));
        messages.push(Message::user(state.query.clone()));
        messages
    }
}

#[async_trait]
impl Node<TurnState> for ChatNode {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn run(
        &self,
        mut state: TurnState,
        ctx: &RunContext,
    ) -> Result<(TurnState, Next), AgentError> {
        let messages = Self::build_messages(&state);
        let response = invoke_with_streaming(&self.llm, &messages, ctx, Self::ID).await?;
        state.answer = Some(response.content);
        Ok((state, Next::Continue))
    }
}
