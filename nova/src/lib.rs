//! # Nova
//!
//! Query-orchestration engine: a user query is classified by a router node,
//! then answered either by a plain conversational model or by a
//! generate/execute tool loop, with the answer streamed token-by-token.
//!
//! ## Design
//!
//! - **State-in, state-out**: one [`TurnState`] flows through every node of
//!   a turn; nodes return the updated state instead of mutating shared data.
//! - **State graph**: [`StateGraph`] wires the router, chat responder, and
//!   tool loop with conditional edges; [`CompiledGraph::invoke`] runs a turn
//!   to completion, [`CompiledGraph::stream`] exposes progress events.
//! - **Tools behind a trait**: the tool loop dispatches through a
//!   [`ToolRegistry`] over [`ToolSource`] implementations — in-process math
//!   and joke rosters for tests, JSON-RPC servers in deployment.
//! - **Service layer**: [`AskService`] runs one turn per request, emits the
//!   wire protocol of `ask-protocol`, persists finished turns through a
//!   [`SessionStore`], and hands titling to a background [`TitleWorker`].
//!
//! ## Main modules
//!
//! - [`graph`]: [`StateGraph`], [`CompiledGraph`], [`Node`], [`Next`],
//!   [`RunContext`], [`StreamEvent`] — build and run state graphs.
//! - [`agent`]: the four ask nodes ([`RouterNode`], [`ChatNode`],
//!   [`ToolCallNode`], [`ToolExecNode`]) and [`build_ask_graph`].
//! - [`state`]: [`TurnState`], [`Route`].
//! - [`message`]: [`Message`], [`ToolCall`], [`Role`], [`HistoryEntry`].
//! - [`llm`]: [`LlmClient`] trait, [`ChatGroq`], [`MockLlm`].
//! - [`tool_source`]: [`ToolSource`], [`ToolRegistry`], [`MathToolSource`],
//!   [`JokeToolSource`], [`RpcToolSource`].
//! - [`session`]: [`SessionStore`] trait, [`MemorySessionStore`],
//!   [`SqliteSessionStore`].
//! - [`service`]: [`AskService`] — streaming and non-streaming turn runs.
//! - [`title`]: [`TitleGenerator`], [`TitleWorker`].
//! - [`config`]: [`NovaConfig`] read from the environment.

pub mod agent;
pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod message;
pub mod service;
pub mod session;
pub mod state;
pub mod title;
pub mod tool_source;

pub use agent::{
    build_ask_graph, ChatNode, RouterNode, ToolCallNode, ToolExecNode, MAX_TOOL_ROUNDS,
};
pub use config::NovaConfig;
pub use error::AgentError;
pub use graph::{
    CompilationError, CompiledGraph, Next, Node, RunContext, StateGraph, StreamEvent, END, START,
};
pub use llm::{ChatGroq, LlmClient, LlmResponse, LlmUsage, MessageChunk, MockLlm};
pub use message::{HistoryEntry, Message, Role, ToolCall};
pub use service::{AskError, AskService};
pub use session::{
    MemorySessionStore, Session, SessionStore, SessionStoreError, SqliteSessionStore,
    StoredMessage,
};
pub use state::{Route, TurnState};
pub use title::{TitleGenerator, TitleWorker};
pub use tool_source::{
    JokeToolSource, MathToolSource, RpcToolSource, ToolCallContent, ToolRegistry, ToolSource,
    ToolSourceError, ToolSpec,
};
