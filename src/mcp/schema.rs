//! MCP schema types.

use serde::{Deserialize, Serialize};

use crate::tools::{AgentToolParameters, DynamicTool};

/// A tool as advertised by an MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPToolSchema {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: serde_json::Value,
}

impl From<MCPToolSchema> for DynamicTool {
    fn from(tool: MCPToolSchema) -> Self {
        DynamicTool {
            name: tool.name,
            description: tool.description.unwrap_or_default(),
            parameters: AgentToolParameters::from_schema(tool.input_schema),
        }
    }
}
