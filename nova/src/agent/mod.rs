//! Ask pipeline: router plus the two responder paths.
//!
//! [`build_ask_graph`] wires the four nodes into the per-turn graph:
//!
//! ```text
//!            START
//!              |
//!           router
//!          /       \
//!       chat        mcp <---+
//!        |         /   \    |
//!       END      END   tools
//! ```
//!
//! The router's conditional edge branches on the classified [`Route`]; the
//! tool node's conditional edge loops through the executor until the model
//! stops requesting calls. Everything downstream of compile() is
//! per-request state, so one compiled graph is shared process-wide.

mod chat_node;
pub(crate) mod prompts;
mod router_node;
mod tool_call_node;
mod tool_exec_node;

pub use chat_node::ChatNode;
pub use router_node::{RouterNode, ROUTER_HISTORY_WINDOW};
pub use tool_call_node::{ToolCallNode, MAX_TOOL_ROUNDS};
pub use tool_exec_node::ToolExecNode;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::AgentError;
use crate::graph::{
    CompilationError, CompiledGraph, RunContext, StateGraph, StreamEvent, END, START,
};
use crate::llm::{LlmClient, LlmResponse, MessageChunk};
use crate::message::Message;
use crate::state::{Route, TurnState};
use crate::tool_source::ToolRegistry;

const CHUNK_CHANNEL_CAPACITY: usize = 64;

/// Invokes `llm`, forwarding chunks as [`StreamEvent::Token`]s tagged with
/// `node` when the run has an event consumer.
///
/// Non-streaming runs skip the channel plumbing entirely.
pub(crate) async fn invoke_with_streaming(
    llm: &Arc<dyn LlmClient>,
    messages: &[Message],
    ctx: &RunContext,
    node: &str,
) -> Result<LlmResponse, AgentError> {
    if !ctx.streaming() {
        return llm.invoke(messages).await;
    }

    let (tx, mut rx) = mpsc::channel::<MessageChunk>(CHUNK_CHANNEL_CAPACITY);
    let forward = async {
        while let Some(chunk) = rx.recv().await {
            ctx.emit(StreamEvent::Token {
                node: node.to_string(),
                content: chunk.content,
            })
            .await;
        }
    };
    let (response, ()) = tokio::join!(llm.invoke_stream(messages, Some(tx)), forward);
    response
}

/// Builds the compiled ask graph.
///
/// `chat_llm` doubles as the fallback for tool-format failures, so a turn
/// that Groq rejects with `tool_use_failed` still ends with an answer in the
/// assistant's own voice.
pub fn build_ask_graph(
    router_llm: Arc<dyn LlmClient>,
    chat_llm: Arc<dyn LlmClient>,
    tool_llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
) -> Result<CompiledGraph<TurnState>, CompilationError> {
    let mut graph = StateGraph::new();
    graph.add_node(RouterNode::ID, Arc::new(RouterNode::new(router_llm)));
    graph.add_node(ChatNode::ID, Arc::new(ChatNode::new(chat_llm.clone())));
    graph.add_node(
        ToolCallNode::ID,
        Arc::new(ToolCallNode::new(tool_llm, chat_llm)),
    );
    graph.add_node(ToolExecNode::ID, Arc::new(ToolExecNode::new(registry)));

    graph.add_edge(START, RouterNode::ID);
    graph.add_conditional_edges(
        RouterNode::ID,
        Arc::new(|state: &TurnState| state.route.unwrap_or(Route::Chat).as_str().to_string()),
        Some(HashMap::from([
            (
                Route::Tool.as_str().to_string(),
                ToolCallNode::ID.to_string(),
            ),
            (Route::Chat.as_str().to_string(), ChatNode::ID.to_string()),
        ])),
    );
    graph.add_edge(ChatNode::ID, END);
    graph.add_conditional_edges(
        ToolCallNode::ID,
        Arc::new(|state: &TurnState| {
            if state.pending_tool_calls().is_empty() {
                "end".to_string()
            } else {
                "tools".to_string()
            }
        }),
        Some(HashMap::from([
            ("tools".to_string(), ToolExecNode::ID.to_string()),
            ("end".to_string(), END.to_string()),
        ])),
    );
    graph.add_edge(ToolExecNode::ID, ToolCallNode::ID);

    graph.compile()
}
