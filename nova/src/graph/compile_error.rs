//! Graph compilation error.
//!
//! Returned by `StateGraph::compile` when the declared topology is unusable:
//! edges referencing unknown nodes, no entry from START, no way to reach END,
//! or a node with both kinds of outgoing edge.

use thiserror::Error;

/// Error when compiling a state graph.
///
/// Validation ensures every id in edges (except START/END) exists in the node
/// map, exactly one edge leaves START, END is reachable, and each node has at
/// most one outgoing edge declaration.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// A node id in an edge was not registered via `add_node` (and is not START/END).
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// No edge has from_id == START, or more than one such edge.
    #[error("graph must have exactly one edge from START")]
    MissingStart,

    /// Neither a static edge nor a conditional path map target reaches END.
    #[error("graph has no edge reaching END")]
    MissingEnd,

    /// A node has both a static edge and conditional edges; it must have exactly one.
    #[error("node has both edge and conditional edges: {0}")]
    DuplicateEdge(String),

    /// A value in a conditional path_map is not a valid node id or END.
    #[error("conditional path_map invalid target: {0}")]
    InvalidConditionalPathMap(String),
}
