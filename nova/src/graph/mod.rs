//! State graph: nodes + edges, compile and invoke.
//!
//! StateGraph: add nodes and edges, compile, then invoke with state, or
//! stream to observe node boundaries, tokens, and tool activity while the
//! run progresses.

mod compile_error;
mod compiled;
mod conditional;
mod event;
mod next;
mod node;
mod state_graph;

pub use compile_error::CompilationError;
pub use compiled::CompiledGraph;
pub use conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
pub use event::{RunContext, StreamEvent};
pub use next::Next;
pub use node::Node;
pub use state_graph::{StateGraph, DEFAULT_STEP_LIMIT, END, START};
