//! MCP Server implementation and lifecycle management.
//!
//! The handler advertises every operation registered in the [`Dispatcher`]
//! as an MCP tool named `<group_id>.<operation>` and forwards tool calls
//! to it. The tool set is fixed once the dispatcher is loaded.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::*,
    service::RequestContext,
};
use tracing::{info, instrument};

use super::config::Config;
use crate::domains::operations::{Dispatcher, PeerProgress, ProgressReporter};

/// The main MCP server handler.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Operation registry serving tool calls.
    dispatcher: Arc<Dispatcher>,
}

impl McpServer {
    /// Create a new MCP server around a loaded dispatcher.
    pub fn new(config: Config, dispatcher: Dispatcher) -> Self {
        Self::from_shared(Arc::new(config), Arc::new(dispatcher))
    }

    /// Create a server sharing an existing dispatcher.
    pub fn from_shared(config: Arc<Config>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    /// Get the server name, falling back to the service name.
    pub fn name(&self) -> &str {
        self.config
            .server
            .name
            .as_deref()
            .unwrap_or_else(|| self.dispatcher.service_name())
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Get the dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Instructions sent to clients at initialization.
    pub fn instructions(&self) -> String {
        match self.dispatcher.description() {
            Some(description) => description.to_string(),
            None => format!(
                "Service '{}' exposing {} operations named <group>.<operation>.",
                self.dispatcher.service_name(),
                self.dispatcher.len()
            ),
        }
    }

    /// Run a tool call and shape the outcome for the protocol.
    async fn dispatch(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
        progress: Option<Arc<dyn ProgressReporter>>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .dispatcher
            .invoke_with_progress(name, arguments.unwrap_or_default(), progress)
            .await
        {
            Ok(output) => Ok(output.into_call_result()),
            Err(e) => e.into_tool_response(),
        }
    }

    // ========================================================================
    // HTTP Transport Support Methods
    // ========================================================================

    /// List all available tools as JSON (for HTTP transport).
    pub fn list_tools_json(&self) -> Vec<serde_json::Value> {
        self.dispatcher
            .handles()
            .map(|h| {
                let schema = h.to_tool().input_schema;
                serde_json::json!({
                    "name": h.qualified_name(),
                    "description": h.description(),
                    "inputSchema": schema
                })
            })
            .collect()
    }

    /// Call a tool by name and return the serialized result (for HTTP
    /// transport).
    pub async fn call_tool_json(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, McpError> {
        let arguments = match arguments {
            serde_json::Value::Object(map) => Some(map),
            serde_json::Value::Null => None,
            _ => {
                return Err(McpError::invalid_params(
                    "Tool arguments must be an object",
                    None,
                ));
            }
        };

        let result = self.dispatch(name, arguments, None).await?;
        serde_json::to_value(result).map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(self.instructions()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name().to_string(),
                version: self.version().to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[instrument(skip(self, _context))]
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        info!("Listing tools");
        Ok(ListToolsResult {
            tools: self.dispatcher.tools(),
            next_cursor: None,
            meta: None,
        })
    }

    #[instrument(skip(self, request, context), fields(tool = %request.name))]
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        info!("Calling tool");
        let progress = context.meta.get_progress_token().map(|token| {
            Arc::new(PeerProgress::new(context.peer.clone(), token)) as Arc<dyn ProgressReporter>
        });
        self.dispatch(&request.name, request.arguments, progress)
            .await
    }
}
