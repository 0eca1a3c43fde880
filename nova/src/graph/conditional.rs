//! Conditional edges: route to the next node based on state.
//!
//! A source node has a routing function that takes the current state and
//! returns a key; the key is looked up in a path map to find the next node
//! id, or used directly when absent from the map.
//!
//! **Interaction**: Used by `StateGraph::add_conditional_edges` and the
//! `CompiledGraph` run loop to resolve the next node after a source runs.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Router function: takes a reference to state and returns a routing key.
pub type ConditionalRouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Conditional edge definition: routing function plus path map.
///
/// The router's return value is used as the key; the next node id is
/// `map[key]` if present, otherwise the key itself (allowing direct node ids
/// as keys).
#[derive(Clone)]
pub struct ConditionalRouter<S> {
    pub(super) path: ConditionalRouterFn<S>,
    pub(super) path_map: HashMap<String, String>,
}

impl<S> ConditionalRouter<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new(path: ConditionalRouterFn<S>, path_map: HashMap<String, String>) -> Self {
        Self { path, path_map }
    }

    /// Resolves the next node id (or END) from the current state.
    pub fn resolve_next(&self, state: &S) -> String {
        let key = (self.path)(state);
        self.path_map.get(&key).cloned().unwrap_or(key)
    }
}

/// How to determine the next node after a given node runs.
///
/// Nodes with a single outgoing edge get `Unconditional(to_id)`; nodes with
/// conditional edges get `Conditional(router)` resolved at runtime.
#[derive(Clone)]
pub enum NextEntry<S> {
    Unconditional(String),
    Conditional(ConditionalRouter<S>),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: a key present in the path map resolves to the mapped
    /// target; an unmapped key is used as the node id itself.
    #[test]
    fn resolve_next_uses_map_then_key() {
        let router: ConditionalRouter<String> = ConditionalRouter::new(
            Arc::new(|state: &String| state.clone()),
            HashMap::from([("mcp".to_string(), "tool_node".to_string())]),
        );
        assert_eq!(router.resolve_next(&"mcp".to_string()), "tool_node");
        assert_eq!(router.resolve_next(&"chat".to_string()), "chat");
    }
}
