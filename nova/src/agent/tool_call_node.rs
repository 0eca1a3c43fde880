//! Tool orchestrator generate step.
//!
//! Each entry asks the tool-bound model for the next move over the turn
//! transcript. A reply with tool calls sends the graph to the executor; a
//! plain reply becomes the final answer. Two failure modes are handled here:
//! a model that cannot produce a well-formed call is retried once on the
//! plain chat model, and a loop that never settles is cut off at
//! [`MAX_TOOL_ROUNDS`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::agent::invoke_with_streaming;
use crate::agent::prompts::TOOL_PROMPT;
use crate::error::AgentError;
use crate::graph::{Next, Node, RunContext};
use crate::llm::LlmClient;
use crate::message::Message;
use crate::state::TurnState;

/// Ceiling on generate steps in one turn's tool loop.
pub const MAX_TOOL_ROUNDS: usize = 8;

/// Decides tool calls or a final answer within the tool pipeline.
///
/// The primary model has the tool roster bound; `fallback` is a plain model
/// used only when the primary rejects the call format outright.
pub struct ToolCallNode {
    llm: Arc<dyn LlmClient>,
    fallback: Arc<dyn LlmClient>,
}

impl ToolCallNode {
    pub const ID: &'static str = "mcp";

    pub fn new(llm: Arc<dyn LlmClient>, fallback: Arc<dyn LlmClient>) -> Self {
        Self { llm, fallback }
    }

    fn seed_messages(state: &TurnState) -> Vec<Message> {
        let mut messages = Vec::with_capacity(state.history.len() + 2);
        messages.push(Message::system(TOOL_PROMPT));
        messages.extend(state.history.iter().map(|h| h.to_message()));
        messages.push(Message::user(state.query.clone()));
        messages
    }

    /// Whether the provider rejected the generation because the model could
    /// not produce a well-formed tool call.
    fn is_format_failure(err: &AgentError) -> bool {
        let text = err.to_string().to_lowercase();
        text.contains("tool_use_failed") || text.contains("failed to call a function")
    }
}

#[async_trait]
impl Node<TurnState> for ToolCallNode {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn run(
        &self,
        mut state: TurnState,
        ctx: &RunContext,
    ) -> Result<(TurnState, Next), AgentError> {
        if state.messages.is_empty() {
            state.messages = Self::seed_messages(&state);
        }
        state.rounds += 1;
        if state.rounds > MAX_TOOL_ROUNDS {
            return Err(AgentError::ToolLoopExceeded {
                rounds: MAX_TOOL_ROUNDS,
            });
        }

        match invoke_with_streaming(&self.llm, &state.messages, ctx, Self::ID).await {
            Ok(response) => {
                debug!(
                    round = state.rounds,
                    tool_calls = response.tool_calls.len(),
                    "tool model replied"
                );
                state.answer = Some(response.content.clone());
                state.push_message(Message::assistant_with_calls(
                    response.content,
                    response.tool_calls,
                ));
                Ok((state, Next::Continue))
            }
            Err(err) if Self::is_format_failure(&err) => {
                warn!(error = %err, "tool call generation failed, retrying on the plain model");
                let response =
                    invoke_with_streaming(&self.fallback, &state.messages, ctx, Self::ID).await?;
                state.answer = Some(response.content.clone());
                state.push_message(Message::assistant(response.content));
                Ok((state, Next::End))
            }
            Err(err) => Err(err),
        }
    }
}
