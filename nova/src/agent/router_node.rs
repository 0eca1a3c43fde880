//! Routing classifier node.
//!
//! First node of every turn: a small, capped model reads the query plus a
//! short history window and returns one label. The parsed [`Route`] lands in
//! state; the conditional edge after this node does the actual branching.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::agent::prompts::ROUTER_PROMPT;
use crate::error::AgentError;
use crate::graph::{Next, Node, RunContext};
use crate::llm::LlmClient;
use crate::message::{HistoryEntry, Message};
use crate::state::{Route, TurnState};

/// How many trailing history rows the classifier sees.
pub const ROUTER_HISTORY_WINDOW: usize = 4;

const NO_CONTEXT_PLACEHOLDER: &str = "No prior context.";

/// Classifies the turn as chat or tool work.
pub struct RouterNode {
    llm: Arc<dyn LlmClient>,
}

impl RouterNode {
    pub const ID: &'static str = "router";

    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    fn render_context(history: &[HistoryEntry]) -> String {
        let start = history.len().saturating_sub(ROUTER_HISTORY_WINDOW);
        let rendered: Vec<String> = history[start..]
            .iter()
            .map(|h| format!("{}: {}", h.role.label(), h.content))
            .collect();
        if rendered.is_empty() {
            NO_CONTEXT_PLACEHOLDER.to_string()
        } else {
            rendered.join("\n")
        }
    }
}

#[async_trait]
impl Node<TurnState> for RouterNode {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn run(
        &self,
        mut state: TurnState,
        _ctx: &RunContext,
    ) -> Result<(TurnState, Next), AgentError> {
        let context = Self::render_context(&state.history);
        let messages = [
            Message::system(ROUTER_PROMPT),
            Message::user(format!(
                "Recent context:\n{context}\n\nUser query: {}",
                state.query
            )),
        ];

        let response = self.llm.invoke(&messages).await?;
        let route = Route::parse(&response.content);
        debug!(
            raw = %response.content.trim(),
            route = route.as_str(),
            "query classified"
        );

        state.route = Some(route);
        Ok((state, Next::Continue))
    }
}
