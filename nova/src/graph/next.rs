//! Next-step result from a graph node: continue along edges, jump, or end.
//!
//! The graph runner uses this to decide the next node or to stop.

/// Next step after running a node.
///
/// - **Continue**: follow the node's outgoing edge (static or conditional).
/// - **Node(id)**: jump to the given node, bypassing declared edges.
/// - **End**: stop; return current state as final result.
///
/// **Interaction**: Returned by `Node::run`; consumed by `CompiledGraph::run`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Next {
    /// Follow the declared outgoing edge; if the node has none, equivalent to End.
    Continue,
    /// Run the node with the given id next.
    Node(String),
    /// Stop and return the current state.
    End,
}
