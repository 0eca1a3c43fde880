//! Compiled graph: immutable topology plus the run loop.
//!
//! Produced by `StateGraph::compile`. `invoke` runs to completion and returns
//! the final state; `stream` additionally hands back a receiver of
//! [`StreamEvent`]s emitted while nodes run. Cloning is cheap (shared inner),
//! so one compiled graph serves every request of a process.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::AgentError;
use crate::graph::conditional::NextEntry;
use crate::graph::event::{RunContext, StreamEvent};
use crate::graph::node::Node;
use crate::graph::state_graph::END;
use crate::graph::Next;

const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Validated topology shared by all clones of a [`CompiledGraph`].
pub(super) struct GraphInner<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(super) next_map: HashMap<String, NextEntry<S>>,
    pub(super) entry: String,
    pub(super) step_limit: usize,
}

/// Executable graph produced by `StateGraph::compile`.
pub struct CompiledGraph<S> {
    inner: Arc<GraphInner<S>>,
}

impl<S> Clone for CompiledGraph<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> CompiledGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub(super) fn new(inner: GraphInner<S>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Runs the graph to completion without streaming.
    pub async fn invoke(&self, state: S) -> Result<S, AgentError> {
        self.run(state, &RunContext::new()).await
    }

    /// Runs the graph with the given context, returning the final state.
    ///
    /// After each node the runner consumes the node's `Next`: `End` stops,
    /// `Node(id)` jumps, `Continue` follows the declared edge (conditional
    /// routers resolve against the updated state). A node without an outgoing
    /// edge ends the run.
    pub async fn run(&self, mut state: S, ctx: &RunContext) -> Result<S, AgentError> {
        let mut current = self.inner.entry.clone();
        let mut steps = 0usize;

        while current != END {
            steps += 1;
            if steps > self.inner.step_limit {
                return Err(AgentError::ExecutionFailed(format!(
                    "graph exceeded step limit of {}",
                    self.inner.step_limit
                )));
            }
            let node = self.inner.nodes.get(&current).ok_or_else(|| {
                AgentError::ExecutionFailed(format!("node not found: {current}"))
            })?;

            debug!(node = %current, step = steps, "running graph node");
            ctx.emit(StreamEvent::NodeStart {
                node: current.clone(),
            })
            .await;

            let (next_state, next) = node.run(state, ctx).await?;
            state = next_state;

            ctx.emit(StreamEvent::NodeEnd {
                node: current.clone(),
            })
            .await;

            current = match next {
                Next::End => END.to_string(),
                Next::Node(id) => id,
                Next::Continue => match self.inner.next_map.get(&current) {
                    Some(NextEntry::Unconditional(to)) => to.clone(),
                    Some(NextEntry::Conditional(router)) => router.resolve_next(&state),
                    None => END.to_string(),
                },
            };
        }

        Ok(state)
    }

    /// Runs the graph on a spawned task, streaming events as they happen.
    ///
    /// Returns the event stream plus a handle resolving to the final state.
    /// The event channel closes when the run finishes, so consumers can drain
    /// events first and then await the handle without racing it.
    pub fn stream(&self, state: S) -> (ReceiverStream<StreamEvent>, JoinHandle<Result<S, AgentError>>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let graph = self.clone();
        let handle = tokio::spawn(async move {
            let ctx = RunContext::with_events(tx);
            graph.run(state, &ctx).await
        });
        (ReceiverStream::new(rx), handle)
    }
}
