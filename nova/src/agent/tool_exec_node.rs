//! Tool orchestrator execute step.
//!
//! Runs every call the latest assistant message requested, in order, and
//! appends one tool result message per call. Failures never abort the turn:
//! the error text is wrapped in a correction prompt and handed back to the
//! model, which gets another round to fix its arguments.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::graph::{Next, Node, RunContext, StreamEvent};
use crate::message::Message;
use crate::state::TurnState;
use crate::tool_source::ToolRegistry;

/// Wrapper for failed executions, fed back as the tool result.
const EXECUTION_ERROR_TEMPLATE: &str = "Error: {error}\n Please fix your mistakes.";

/// Executes pending tool calls against the registry.
pub struct ToolExecNode {
    registry: Arc<ToolRegistry>,
}

impl ToolExecNode {
    pub const ID: &'static str = "tools";

    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Arguments arrive as a JSON string from the model; anything that does
    /// not parse becomes an empty object so zero-argument tools still run.
    fn parse_arguments(name: &str, raw: &str) -> Value {
        match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(tool = name, error = %err, "unparseable tool arguments, substituting {{}}");
                json!({})
            }
        }
    }
}

#[async_trait]
impl Node<TurnState> for ToolExecNode {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn run(
        &self,
        mut state: TurnState,
        ctx: &RunContext,
    ) -> Result<(TurnState, Next), AgentError> {
        let calls = state.pending_tool_calls().to_vec();
        for call in calls {
            let arguments = Self::parse_arguments(&call.name, &call.arguments);
            ctx.emit(StreamEvent::ToolStart {
                name: call.name.clone(),
            })
            .await;
            state.record_tool(&call.name);

            let (content, is_error) = match self.registry.call(&call.name, arguments).await {
                Ok(result) => (result.text, false),
                Err(err) => {
                    warn!(tool = %call.name, error = %err, "tool call failed");
                    (
                        EXECUTION_ERROR_TEMPLATE.replace("{error}", &err.model_message()),
                        true,
                    )
                }
            };
            debug!(tool = %call.name, is_error, "tool call finished");

            ctx.emit(StreamEvent::ToolEnd {
                name: call.name.clone(),
                is_error,
            })
            .await;
            state.push_message(Message::tool(
                call.id.unwrap_or_default(),
                call.name,
                content,
            ));
        }
        Ok((state, Next::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCall;
    use crate::tool_source::{JokeToolSource, MathToolSource};
    use tokio::sync::mpsc;

    async fn registry() -> Arc<ToolRegistry> {
        Arc::new(
            ToolRegistry::discover(vec![
                Arc::new(MathToolSource::new()),
                Arc::new(JokeToolSource::new()),
            ])
            .await
            .unwrap(),
        )
    }

    fn call(name: &str, arguments: &str, id: &str) -> ToolCall {
        ToolCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
            id: Some(id.to_string()),
        }
    }

    fn state_with_calls(calls: Vec<ToolCall>) -> TurnState {
        let mut state = TurnState::new("q", vec![]);
        state.push_message(Message::user("q"));
        state.push_message(Message::assistant_with_calls("", calls));
        state
    }

    /// **Scenario**: every pending call runs in request order and each gets
    /// exactly one result message carrying its call id.
    #[tokio::test]
    async fn executes_calls_in_order() {
        let node = ToolExecNode::new(registry().await);
        let state = state_with_calls(vec![
            call("multiply", r#"{"a": 6, "b": 7}"#, "call_1"),
            call("add", r#"{"a": 1, "b": 2}"#, "call_2"),
        ]);

        let (state, next) = node.run(state, &RunContext::new()).await.unwrap();

        assert_eq!(next, Next::Continue);
        let results: Vec<_> = state
            .messages
            .iter()
            .filter_map(|m| match m {
                Message::Tool {
                    call_id,
                    name,
                    content,
                } => Some((call_id.as_str(), name.as_str(), content.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            results,
            vec![("call_1", "multiply", "42"), ("call_2", "add", "3")]
        );
        assert_eq!(state.tools_used, vec!["multiply", "add"]);
    }

    /// **Scenario**: a failing execution feeds the error text back inside the
    /// correction wrapper instead of aborting the turn.
    #[tokio::test]
    async fn failed_call_becomes_correction_prompt() {
        let node = ToolExecNode::new(registry().await);
        let state = state_with_calls(vec![call("divide", r#"{"a": 1, "b": 0}"#, "call_1")]);

        let (state, next) = node.run(state, &RunContext::new()).await.unwrap();

        assert_eq!(next, Next::Continue);
        assert!(matches!(
            state.messages.last(),
            Some(Message::Tool { content, .. })
                if content == "Error: Cannot divide by zero\n Please fix your mistakes."
        ));
    }

    /// **Scenario**: an unknown tool name becomes an error result the model
    /// can react to, not a turn failure.
    #[tokio::test]
    async fn unknown_tool_becomes_error_result() {
        let node = ToolExecNode::new(registry().await);
        let state = state_with_calls(vec![call("teleport", "{}", "call_1")]);

        let (state, _) = node.run(state, &RunContext::new()).await.unwrap();

        assert!(matches!(
            state.messages.last(),
            Some(Message::Tool { content, .. })
                if content == "Error: tool not found: teleport\n Please fix your mistakes."
        ));
    }

    /// **Scenario**: arguments that are not valid JSON degrade to an empty
    /// object, which is enough for tools that take no input.
    #[tokio::test]
    async fn bad_arguments_degrade_to_empty_object() {
        let node = ToolExecNode::new(registry().await);
        let state = state_with_calls(vec![call("list_joke_categories", "not json", "call_1")]);

        let (state, _) = node.run(state, &RunContext::new()).await.unwrap();

        assert!(matches!(
            state.messages.last(),
            Some(Message::Tool { content, .. }) if content.contains("math")
        ));
    }

    /// **Scenario**: a call without an id still produces a result message,
    /// with an empty call id.
    #[tokio::test]
    async fn missing_call_id_defaults_to_empty() {
        let node = ToolExecNode::new(registry().await);
        let state = state_with_calls(vec![ToolCall {
            name: "sqrt".to_string(),
            arguments: r#"{"n": 9}"#.to_string(),
            id: None,
        }]);

        let (state, _) = node.run(state, &RunContext::new()).await.unwrap();

        assert!(matches!(
            state.messages.last(),
            Some(Message::Tool { call_id, content, .. }) if call_id.is_empty() && content == "3"
        ));
    }

    /// **Scenario**: streaming runs see a ToolStart/ToolEnd pair per call,
    /// with is_error reflecting the outcome.
    #[tokio::test]
    async fn emits_tool_events() {
        let node = ToolExecNode::new(registry().await);
        let state = state_with_calls(vec![
            call("add", r#"{"a": 1, "b": 2}"#, "call_1"),
            call("divide", r#"{"a": 1, "b": 0}"#, "call_2"),
        ]);
        let (tx, mut rx) = mpsc::channel(16);
        let ctx = RunContext::with_events(tx);

        node.run(state, &ctx).await.unwrap();
        drop(ctx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                StreamEvent::ToolStart {
                    name: "add".to_string()
                },
                StreamEvent::ToolEnd {
                    name: "add".to_string(),
                    is_error: false
                },
                StreamEvent::ToolStart {
                    name: "divide".to_string()
                },
                StreamEvent::ToolEnd {
                    name: "divide".to_string(),
                    is_error: true
                },
            ]
        );
    }

    /// **Scenario**: with nothing pending the node is a no-op that continues.
    #[tokio::test]
    async fn no_pending_calls_is_noop() {
        let node = ToolExecNode::new(registry().await);
        let mut state = TurnState::new("q", vec![]);
        state.push_message(Message::user("q"));

        let (state, next) = node.run(state, &RunContext::new()).await.unwrap();

        assert_eq!(next, Next::Continue);
        assert_eq!(state.messages.len(), 1);
        assert!(state.tools_used.is_empty());
    }
}
