//! State graph: nodes + explicit edges (from → to) and conditional edges.
//!
//! Add nodes with `add_node`, define the chain with `add_edge(from, to)`
//! using `START` and `END` for graph entry/exit. Use `add_conditional_edges`
//! to route to the next node based on state. Then `compile` to get a
//! [`CompiledGraph`].
//!
//! # Conditional edges
//!
//! From a source node, a routing function `(state) -> key` is called; the key
//! is looked up in a path map to find the target node, or used as the node id
//! directly. A node must have either one outgoing `add_edge` or
//! `add_conditional_edges`, not both.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::graph::compile_error::CompilationError;
use crate::graph::compiled::{CompiledGraph, GraphInner};
use crate::graph::conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
use crate::graph::node::Node;

/// Sentinel for graph entry: use as `from_id` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit: use as `to_id` in `add_edge(last_node_id, END)`.
pub const END: &str = "__end__";

/// Upper bound on node executions per run unless overridden.
///
/// A correct graph ends well below this; the limit turns a wiring bug that
/// cycles forever into an error instead of a hung request.
pub const DEFAULT_STEP_LIMIT: usize = 25;

/// State graph builder: nodes plus explicit edges and conditional edges.
///
/// Generic over state type `S`. Build with `add_node` / `add_edge(from, to)`
/// (use `START` and `END` for entry/exit), and `add_conditional_edges` for
/// state-based branching. Then `compile()` to obtain an executable graph.
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// Edges (from_id, to_id). A node may have one outgoing edge or conditional edges, not both.
    edges: Vec<(String, String)>,
    /// Conditional edges: source node id -> router. Next node is resolved from state at runtime.
    conditional_edges: HashMap<String, ConditionalRouter<S>>,
    step_limit: usize,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Overrides the per-run step limit.
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Adds a node; id must be unique. Replaces if same id.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Adds an edge from `from_id` to `to_id`.
    ///
    /// Use `START` for graph entry and `END` for graph exit. Both ids (except
    /// START/END) must be registered via `add_node` before `compile()`.
    pub fn add_edge(&mut self, from_id: impl Into<String>, to_id: impl Into<String>) -> &mut Self {
        self.edges.push((from_id.into(), to_id.into()));
        self
    }

    /// Adds conditional edges from `source`: after the source node runs,
    /// `path` is called with the updated state and its return value is looked
    /// up in `path_map` (falling back to the value itself as a node id).
    ///
    /// All path_map values must be valid node ids or `END`.
    pub fn add_conditional_edges(
        &mut self,
        source: impl Into<String>,
        path: ConditionalRouterFn<S>,
        path_map: Option<HashMap<String, String>>,
    ) -> &mut Self {
        self.conditional_edges.insert(
            source.into(),
            ConditionalRouter::new(path, path_map.unwrap_or_default()),
        );
        self
    }

    /// Builds the executable graph: validates that all edge node ids exist,
    /// exactly one edge leaves START, no node declares two kinds of outgoing
    /// edge, and END is reachable.
    pub fn compile(self) -> Result<CompiledGraph<S>, CompilationError> {
        for (from, to) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(CompilationError::NodeNotFound(to.clone()));
            }
        }
        for (source, router) in &self.conditional_edges {
            if !self.nodes.contains_key(source) {
                return Err(CompilationError::NodeNotFound(source.clone()));
            }
            for target in router.path_map.values() {
                if target != END && !self.nodes.contains_key(target) {
                    return Err(CompilationError::InvalidConditionalPathMap(target.clone()));
                }
            }
        }

        let start_edges: Vec<_> = self
            .edges
            .iter()
            .filter(|(f, _)| f == START)
            .map(|(_, t)| t.clone())
            .collect();
        let entry = match start_edges.len() {
            1 => start_edges.into_iter().next().unwrap_or_default(),
            _ => return Err(CompilationError::MissingStart),
        };

        let mut next_map: HashMap<String, NextEntry<S>> = HashMap::new();
        for (from, to) in &self.edges {
            if from == START {
                continue;
            }
            if next_map.contains_key(from) || self.conditional_edges.contains_key(from) {
                return Err(CompilationError::DuplicateEdge(from.clone()));
            }
            next_map.insert(from.clone(), NextEntry::Unconditional(to.clone()));
        }
        for (source, router) in self.conditional_edges {
            next_map.insert(source, NextEntry::Conditional(router));
        }

        let reaches_end = next_map.values().any(|entry| match entry {
            NextEntry::Unconditional(to) => to == END,
            NextEntry::Conditional(router) => router.path_map.values().any(|t| t == END),
        });
        if !reaches_end {
            return Err(CompilationError::MissingEnd);
        }

        Ok(CompiledGraph::new(GraphInner {
            nodes: self.nodes,
            next_map,
            entry,
            step_limit: self.step_limit,
        }))
    }
}
