//! Read-only set of tools shared by every backend.

use std::collections::HashSet;
use std::sync::Arc;

use super::dynamic::{DynamicToolAdapter, DynamicToolProvider};
use super::tool::Tool;
use crate::error::Result;
use crate::provider::ToolDefinition;

/// Tools discovered once at startup. Cloning shares the same descriptors.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<[Arc<dyn Tool>]>,
}

impl ToolRegistry {
    /// Build from explicit tools. Later duplicates of a name are dropped.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let mut seen = HashSet::new();
        let tools: Vec<Arc<dyn Tool>> = tools
            .into_iter()
            .filter(|tool| {
                let fresh = seen.insert(tool.name().to_string());
                if !fresh {
                    tracing::warn!(tool = tool.name(), "duplicate tool name ignored");
                }
                fresh
            })
            .collect();
        Self {
            tools: Arc::from(tools),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// List the provider's tools once and wrap each as a [`Tool`].
    pub async fn discover(provider: Arc<dyn DynamicToolProvider>) -> Result<Self> {
        let discovered = provider.list_tools().await?;
        tracing::info!(count = discovered.len(), "discovered tools");
        let tools = discovered
            .into_iter()
            .map(|tool| Arc::new(DynamicToolAdapter::new(provider.clone(), tool)) as Arc<dyn Tool>)
            .collect();
        Ok(Self::new(tools))
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|tool| tool.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{
        AgentToolParameters, DynamicTool, ToolArguments, ToolExecutionContext,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeServer {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DynamicToolProvider for FakeServer {
        async fn list_tools(&self) -> Result<Vec<DynamicTool>> {
            Ok(["get_me", "list_org_repos", "get_me"]
                .into_iter()
                .map(|name| DynamicTool {
                    name: name.into(),
                    description: format!("{name} tool"),
                    parameters: AgentToolParameters::empty(),
                })
                .collect())
        }

        async fn execute_tool(
            &self,
            name: &str,
            _args: &ToolArguments,
            _ctx: &ToolExecutionContext,
        ) -> Result<serde_json::Value> {
            self.calls.lock().expect("lock").push(name.to_string());
            Ok(json!({ "ok": true }))
        }
    }

    #[tokio::test]
    async fn discovers_once_and_delegates_calls() {
        let server = Arc::new(FakeServer {
            calls: Mutex::new(Vec::new()),
        });
        let registry = ToolRegistry::discover(server.clone())
            .await
            .expect("discovery");

        assert_eq!(registry.len(), 2);
        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["get_me", "list_org_repos"]);

        let tool = registry.get("list_org_repos").expect("registered");
        let out = tool
            .execute(&ToolArguments::default(), &ToolExecutionContext::default())
            .await
            .expect("call");
        assert_eq!(out["ok"], true);
        assert_eq!(*server.calls.lock().expect("lock"), vec!["list_org_repos"]);
        assert!(registry.get("missing").is_none());
    }
}
