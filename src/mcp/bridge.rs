//! Exposes an MCP server's tools to the agent.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::service::ServiceError;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ToolServerConfig;
use crate::error::AgentError;
use crate::tools::arguments::ToolArguments;
use crate::tools::dynamic::{discover_tools, DynamicTool, DynamicToolProvider};
use crate::tools::tool::Tool;
use crate::tools::types::AgentToolParameters;

use super::client::{
    coerce_tool_arguments, is_transport_loss, map_call_result, map_service_error, MCPClient,
    MCPSession,
};
use super::schema::MCPToolSchema;
use super::transport::StdioTransport;

/// Tool provider backed by one MCP server.
///
/// The lock guards only connection bookkeeping; tool calls from concurrent
/// requests share the session and are in flight together.
pub struct MCPToolAdapter {
    client: Mutex<MCPClient>,
}

impl MCPToolAdapter {
    pub fn new(client: MCPClient) -> Self {
        Self {
            client: Mutex::new(client),
        }
    }

    /// Launch the configured tool server and complete the handshake.
    pub async fn connect(config: &ToolServerConfig) -> Result<Arc<Self>, AgentError> {
        info!(
            command = %config.command,
            package = %config.package,
            "starting MCP tool server"
        );
        let mut client = MCPClient::new(Box::new(StdioTransport::from_config(config)));
        client.initialize().await?;
        Ok(Arc::new(Self::new(client)))
    }

    /// The server's tools, ready to hand to an agent.
    pub async fn get_tools(self: &Arc<Self>) -> Result<Vec<Arc<dyn Tool>>, AgentError> {
        let provider: Arc<dyn DynamicToolProvider> = Arc::clone(self) as Arc<dyn DynamicToolProvider>;
        let tools = discover_tools(provider).await?;
        info!(count = tools.len(), "MCP tools discovered");
        Ok(tools)
    }

    /// Shut down the session and the server process.
    pub async fn close(&self) -> Result<(), AgentError> {
        self.client.lock().await.close().await
    }

    /// Run `request` on the current session, retrying once on a fresh
    /// connection if the transport was lost.
    async fn on_session<T, F, Fut>(&self, context: &str, request: F) -> Result<T, AgentError>
    where
        F: Fn(MCPSession) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, ServiceError>> + Send,
        T: Send,
    {
        let session = self.client.lock().await.session().await?;
        match request(session.clone()).await {
            Ok(value) => Ok(value),
            Err(error) if is_transport_loss(&error) => {
                warn!(context, %error, "MCP transport lost; retrying on a new session");
                let fresh = self.client.lock().await.reconnect(&session).await?;
                request(fresh)
                    .await
                    .map_err(|retry| map_service_error(context, retry))
            }
            Err(error) => Err(map_service_error(context, error)),
        }
    }
}

#[async_trait]
impl DynamicToolProvider for MCPToolAdapter {
    async fn list_tools(&self) -> Result<Vec<DynamicTool>, AgentError> {
        let tools = self
            .on_session("list_tools", |session| async move { session.list_tools().await })
            .await?;
        Ok(tools.into_iter().map(to_dynamic_tool).collect())
    }

    async fn execute_tool(
        &self,
        name: &str,
        args: &ToolArguments,
    ) -> Result<serde_json::Value, AgentError> {
        let arguments = coerce_tool_arguments(args.raw().clone())?;
        debug!(tool = name, "MCP call_tool");
        let raw = self
            .on_session("call_tool", |session| {
                let arguments = arguments.clone();
                async move { session.call_tool(name, arguments).await }
            })
            .await?;
        Ok(map_call_result(name, raw)?.into_value_or_text())
    }
}

fn to_dynamic_tool(tool: MCPToolSchema) -> DynamicTool {
    DynamicTool {
        name: tool.name,
        description: tool.description.unwrap_or_default(),
        parameters: AgentToolParameters::from_schema(tool.input_schema),
    }
}
