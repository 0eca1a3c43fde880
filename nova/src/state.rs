//! Per-turn state flowing through the ask graph.
//!
//! One [`TurnState`] is built per query from the user's text plus loaded
//! history, then threaded through router, responder, and tool nodes. Nodes
//! return a new state that replaces the previous one; the transcript in
//! `messages` is append-only and `history` is never mutated after load.

use serde::{Deserialize, Serialize};

use crate::message::{HistoryEntry, Message, ToolCall};

/// Routing decision for a turn: answer directly or go through tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Plain conversational answer.
    #[serde(rename = "chat")]
    Chat,
    /// Tool-calling pipeline (math, jokes).
    #[serde(rename = "mcp")]
    Tool,
}

impl Route {
    /// Routing label as emitted by the classifier model.
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Chat => "chat",
            Route::Tool => "mcp",
        }
    }

    /// Parses a classifier reply. Matching is case-insensitive after
    /// trimming; anything that is not exactly one of the two labels falls
    /// back to `Chat`, so a misbehaving classifier can never take down a
    /// turn.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "mcp" => Route::Tool,
            _ => Route::Chat,
        }
    }
}

/// State for one ask turn.
///
/// `query` and `history` are inputs and stay read-only; everything else is
/// written by nodes as the turn progresses. `messages` is the model-facing
/// transcript for the tool pipeline; `rounds` counts generate steps there so
/// the loop ceiling can be enforced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnState {
    /// The user's query for this turn.
    pub query: String,
    /// Prior turns loaded from the session store, oldest first.
    pub history: Vec<HistoryEntry>,
    /// Router decision; `None` until the router ran.
    pub route: Option<Route>,
    /// Append-only transcript for the tool-calling pipeline.
    pub messages: Vec<Message>,
    /// Final answer text once a responder produced one.
    pub answer: Option<String>,
    /// Distinct tool names dispatched this turn, in first-use order.
    pub tools_used: Vec<String>,
    /// Generate steps taken in the tool loop.
    pub rounds: usize,
}

impl TurnState {
    /// Builds the state for a fresh turn.
    pub fn new(query: impl Into<String>, history: Vec<HistoryEntry>) -> Self {
        Self {
            query: query.into(),
            history,
            ..Self::default()
        }
    }

    /// Appends a message to the transcript.
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Tool calls requested by the latest assistant message, if any.
    ///
    /// Empty when the transcript is empty, when the last message is not an
    /// assistant turn, or when the assistant answered without tools.
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        match self.messages.last() {
            Some(Message::Assistant { tool_calls, .. }) => tool_calls,
            _ => &[],
        }
    }

    /// Records a dispatched tool, keeping names distinct.
    pub fn record_tool(&mut self, name: &str) {
        if !self.tools_used.iter().any(|t| t == name) {
            self.tools_used.push(name.to_string());
        }
    }
}
