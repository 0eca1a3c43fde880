//! Graph node trait: one step in a StateGraph.
//!
//! Receives state `S` plus the run context, returns updated `S` and `Next`
//! (continue, jump, or end). Nodes that stream tokens emit them through the
//! context; non-streaming runs get a context without an event sink.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::AgentError;

use super::{Next, RunContext};

/// One step in a graph: state in, (state out, next step).
///
/// The runner replaces the whole state with the returned one, so nodes own
/// their updates. Return `Next::Continue` to follow the declared edge,
/// `Next::Node(id)` to jump, `Next::End` to stop.
///
/// **Interaction**: Registered with `StateGraph::add_node`; run by
/// `CompiledGraph`.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id (e.g. `"chat"`, `"router"`). Must be unique within a graph.
    fn id(&self) -> &str;

    /// One step: state in, (state out, next step).
    async fn run(&self, state: S, ctx: &RunContext) -> Result<(S, Next), AgentError>;
}
