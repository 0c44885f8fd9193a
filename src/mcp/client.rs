//! MCP client over an rmcp running service.

use rmcp::{
    model::{CallToolRequestParams, CallToolResult, Content, JsonObject, ProtocolVersion, ResourceContents},
    service::{ClientInitializeError, DynService, RoleClient, RunningService, ServiceError},
};
use tracing::debug;

use crate::error::{Result, VoiceGitError};

use super::schema::MCPToolSchema;
use super::transport::StdioServer;

type DynClientService = Box<dyn DynService<RoleClient>>;
pub type MCPRunningService = RunningService<RoleClient, DynClientService>;

/// Successful output of one `tools/call`.
#[derive(Debug, Clone, PartialEq)]
pub struct MCPToolCallResult {
    pub structured_content: Option<serde_json::Value>,
    pub text_content: Option<String>,
    pub content: Vec<serde_json::Value>,
}

impl MCPToolCallResult {
    /// Structured content when present, else the joined text, else raw content.
    pub fn into_value_or_text(self) -> serde_json::Value {
        if let Some(structured) = self.structured_content {
            return structured;
        }
        if let Some(text) = self.text_content {
            return serde_json::Value::String(text);
        }
        serde_json::Value::Array(self.content)
    }
}

/// Connected client for one MCP server.
pub struct MCPClient {
    session: MCPRunningService,
}

impl MCPClient {
    /// Spawn `server` and complete the initialize handshake.
    pub async fn connect(server: &StdioServer) -> Result<Self> {
        debug!(server = %server, "connecting to MCP server");
        let client_info = rmcp::model::ClientInfo {
            protocol_version: ProtocolVersion::LATEST,
            ..Default::default()
        };
        let session = server
            .connect(client_info)
            .await
            .map_err(map_client_initialize_error)?;
        Ok(Self::from_running_service(session))
    }

    pub fn from_running_service(session: MCPRunningService) -> Self {
        Self { session }
    }

    /// `tools/list`, following pagination when the server supports it.
    pub async fn list_tools(&self) -> Result<Vec<MCPToolSchema>> {
        if self.session.is_closed() {
            return Err(VoiceGitError::Mcp("MCP session is closed".into()));
        }
        let tools = match self.session.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => {
                self.session
                    .list_tools(None)
                    .await
                    .map_err(|e| map_service_error("list_tools", e))?
                    .tools
            }
            Err(e) => return Err(map_service_error("list_tools", e)),
        };

        Ok(tools.into_iter().map(map_mcp_tool_schema).collect())
    }

    /// `tools/call`. An `isError` result becomes [`VoiceGitError::ToolInvocation`].
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<MCPToolCallResult> {
        let arguments = coerce_tool_arguments(arguments)?;
        debug!(tool = name, "MCP call_tool");

        let result = self
            .session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| map_service_error("call_tool", e))?;

        map_call_result(name, result)
    }
}

fn map_mcp_tool_schema(tool: rmcp::model::Tool) -> MCPToolSchema {
    MCPToolSchema {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()),
        input_schema: serde_json::Value::Object((*tool.input_schema).clone()),
    }
}

fn coerce_tool_arguments(value: serde_json::Value) -> Result<Option<JsonObject>> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => Ok(Some(map)),
        other => Err(VoiceGitError::InvalidArgument(format!(
            "MCP tool arguments must be a JSON object; got {other}"
        ))),
    }
}

fn extract_text_content(content: &[Content]) -> Option<String> {
    let lines: Vec<String> = content
        .iter()
        .filter_map(|item| {
            if let Some(text) = item.as_text() {
                return Some(text.text.clone());
            }
            match &item.as_resource()?.resource {
                ResourceContents::TextResourceContents { text, .. } => Some(text.clone()),
                _ => None,
            }
        })
        .collect();

    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn map_call_result(name: &str, result: CallToolResult) -> Result<MCPToolCallResult> {
    let text_content = extract_text_content(&result.content);

    if result.is_error.unwrap_or(false) {
        let message = text_content
            .or_else(|| result.structured_content.as_ref().map(|v| v.to_string()))
            .unwrap_or_else(|| "tool reported an error".into());
        return Err(VoiceGitError::tool(name, message));
    }

    let content = result
        .content
        .iter()
        .filter_map(|item| serde_json::to_value(item).ok())
        .collect();

    Ok(MCPToolCallResult {
        structured_content: result.structured_content,
        text_content,
        content,
    })
}

fn map_client_initialize_error(error: ClientInitializeError) -> VoiceGitError {
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            VoiceGitError::Mcp(format!("initialize: connection closed: {context}"))
        }
        ClientInitializeError::TransportError { error, context } => {
            VoiceGitError::Mcp(format!("initialize: transport error ({context}): {error}"))
        }
        ClientInitializeError::JsonRpcError(error) => VoiceGitError::Mcp(format!(
            "initialize: JSON-RPC error {}: {}",
            error.code.0, error.message
        )),
        ClientInitializeError::Cancelled => VoiceGitError::Cancelled,
        other => VoiceGitError::Mcp(format!("initialize: {other}")),
    }
}

fn map_service_error(context: &str, error: ServiceError) -> VoiceGitError {
    match error {
        ServiceError::McpError(error) => VoiceGitError::Mcp(format!(
            "{context}: MCP error {}: {}",
            error.code.0, error.message
        )),
        ServiceError::TransportSend(error) => {
            VoiceGitError::Mcp(format!("{context}: transport send failed: {error}"))
        }
        ServiceError::TransportClosed => VoiceGitError::Mcp(format!("{context}: transport closed")),
        ServiceError::Timeout { timeout } => VoiceGitError::Timeout(timeout.as_millis() as u64),
        ServiceError::Cancelled { .. } => VoiceGitError::Cancelled,
        other => VoiceGitError::Mcp(format!("{context}: {other}")),
    }
}
