//! Exposes an MCP server's tools as dynamic tools.

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::tools::{DynamicTool, DynamicToolProvider, ToolArguments, ToolExecutionContext};

use super::client::{MCPClient, MCPToolCallResult};
use super::schema::MCPToolSchema;

#[async_trait]
trait MCPClientOps: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<MCPToolSchema>>;
    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<MCPToolCallResult>;
}

#[async_trait]
impl MCPClientOps for MCPClient {
    async fn list_tools(&self) -> Result<Vec<MCPToolSchema>> {
        MCPClient::list_tools(self).await
    }

    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<MCPToolCallResult> {
        MCPClient::call_tool(self, name, arguments).await
    }
}

/// [`DynamicToolProvider`] backed by a connected MCP client.
pub struct MCPToolAdapter {
    client: Box<dyn MCPClientOps>,
}

impl MCPToolAdapter {
    pub fn new(client: MCPClient) -> Self {
        Self {
            client: Box::new(client),
        }
    }
}

#[async_trait]
impl DynamicToolProvider for MCPToolAdapter {
    async fn list_tools(&self) -> Result<Vec<DynamicTool>> {
        let tools = self.client.list_tools().await?;
        Ok(tools.into_iter().map(DynamicTool::from).collect())
    }

    async fn execute_tool(
        &self,
        name: &str,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value> {
        let arguments = serde_json::Value::Object(args.as_object().clone());
        match self.client.call_tool(name, arguments).await {
            Ok(result) => Ok(result.into_value_or_text()),
            Err(err) => {
                warn!(tool = name, call_id = %ctx.tool_call_id, error = %err, "MCP tool call failed");
                Err(err)
            }
        }
    }
}
