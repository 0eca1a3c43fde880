//! Tool registry: several sources behind one flat name space.
//!
//! Discovery happens once at construction; the registry is immutable
//! afterwards, so the spec list handed to the model and the dispatch table
//! can never drift apart during a process lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::tool_source::{ToolCallContent, ToolSource, ToolSourceError, ToolSpec};

/// Aggregated view over one or more tool sources.
pub struct ToolRegistry {
    sources: Vec<Arc<dyn ToolSource>>,
    specs: Vec<ToolSpec>,
    routes: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Lists every source once and builds the dispatch table.
    ///
    /// On a duplicate tool name the first source wins and the clash is
    /// logged; a listing failure aborts discovery so a misconfigured server
    /// is caught at startup.
    pub async fn discover(sources: Vec<Arc<dyn ToolSource>>) -> Result<Self, ToolSourceError> {
        let mut specs = Vec::new();
        let mut routes = HashMap::new();
        for (index, source) in sources.iter().enumerate() {
            for spec in source.list_tools().await? {
                if routes.contains_key(&spec.name) {
                    warn!(tool = %spec.name, "duplicate tool name; keeping first source");
                    continue;
                }
                routes.insert(spec.name.clone(), index);
                specs.push(spec);
            }
        }
        info!(tools = specs.len(), sources = sources.len(), "tool registry ready");
        Ok(Self {
            sources,
            specs,
            routes,
        })
    }

    /// Specs of every registered tool, for binding to the model.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    /// Whether `name` is a registered tool.
    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Dispatches a call to the source that listed `name`.
    pub async fn call(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let index = self
            .routes
            .get(name)
            .copied()
            .ok_or_else(|| ToolSourceError::NotFound(name.to_string()))?;
        self.sources[index].call_tool(name, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_source::{JokeToolSource, MathToolSource};
    use async_trait::async_trait;
    use serde_json::json;

    /// **Scenario**: discovery over both in-process sources exposes the
    /// combined roster and dispatches to the right one.
    #[tokio::test]
    async fn discovers_and_dispatches_across_sources() {
        let registry = ToolRegistry::discover(vec![
            Arc::new(MathToolSource::new()),
            Arc::new(JokeToolSource::new()),
        ])
        .await
        .unwrap();

        assert_eq!(
            registry.specs().len(),
            MathToolSource::NAMES.len() + JokeToolSource::NAMES.len()
        );
        assert!(registry.contains("multiply"));
        assert!(registry.contains("get_random_joke"));
        assert!(!registry.contains("launch_rockets"));

        let out = registry
            .call("multiply", json!({"a": 12, "b": 7}))
            .await
            .unwrap();
        assert_eq!(out.text, "84");
        let out = registry
            .call("list_joke_categories", json!({}))
            .await
            .unwrap();
        assert!(out.text.contains("pun"));
    }

    /// **Scenario**: calling a name no source listed maps to NotFound.
    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let registry = ToolRegistry::discover(vec![Arc::new(MathToolSource::new())])
            .await
            .unwrap();
        let err = registry.call("get_random_joke", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::NotFound(_)));
    }

    struct ShadowSource;

    #[async_trait]
    impl ToolSource for ShadowSource {
        async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
            Ok(vec![ToolSpec {
                name: "add".to_string(),
                description: Some("shadow".to_string()),
                input_schema: json!({"type": "object"}),
            }])
        }

        async fn call_tool(
            &self,
            _name: &str,
            _arguments: Value,
        ) -> Result<ToolCallContent, ToolSourceError> {
            Ok(ToolCallContent {
                text: "shadowed".to_string(),
            })
        }
    }

    /// **Scenario**: on a name clash the first source keeps the tool; the
    /// shadowing source is never dispatched and the roster has one entry.
    #[tokio::test]
    async fn first_source_wins_on_duplicate_names() {
        let registry = ToolRegistry::discover(vec![
            Arc::new(MathToolSource::new()),
            Arc::new(ShadowSource),
        ])
        .await
        .unwrap();
        let add_specs: Vec<_> = registry
            .specs()
            .iter()
            .filter(|s| s.name == "add")
            .collect();
        assert_eq!(add_specs.len(), 1);
        assert_eq!(
            add_specs[0].description.as_deref(),
            Some("Return the sum of two numbers.")
        );

        let out = registry.call("add", json!({"a": 2, "b": 3})).await.unwrap();
        assert_eq!(out.text, "5");
    }
}
