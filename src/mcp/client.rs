//! MCP session ownership and result mapping.

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, JsonObject, ProtocolVersion, ResourceContents,
};
use rmcp::service::{ClientInitializeError, Peer, RoleClient, ServiceError};
use tracing::{debug, info, warn};

use crate::error::AgentError;

use super::schema::MCPToolSchema;
use super::transport::{MCPRunningService, MCPTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MCPConnectionState {
    Disconnected,
    Initialized,
    Closed,
}

/// Payload of a successful `tools/call`.
#[derive(Debug, Clone)]
pub struct MCPToolCallResult {
    pub structured_content: Option<serde_json::Value>,
    pub text_content: Option<String>,
    pub content: Vec<serde_json::Value>,
}

impl MCPToolCallResult {
    /// Structured content if present, else joined text, else the raw content list.
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

/// Handle to one live session.
///
/// Clones share the underlying connection, and requests made through a handle run
/// concurrently with each other. `generation` identifies which connection the
/// handle belongs to so a stale handle can ask for a replacement exactly once.
#[derive(Clone)]
pub struct MCPSession {
    peer: Peer<RoleClient>,
    generation: u64,
}

impl MCPSession {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// All tools, falling back to a single page for servers without cursor support.
    pub async fn list_tools(&self) -> Result<Vec<MCPToolSchema>, ServiceError> {
        let tools = match self.peer.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => self.peer.list_tools(None).await?.tools,
            Err(error) => return Err(error),
        };
        Ok(tools.into_iter().map(MCPToolSchema::from).collect())
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, ServiceError> {
        self.peer
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await
    }
}

/// Owns the connection to one MCP server and replaces it when it drops.
pub struct MCPClient {
    transport: Box<dyn MCPTransport>,
    running: Option<MCPRunningService>,
    generation: u64,
    state: MCPConnectionState,
}

impl MCPClient {
    pub fn new(transport: Box<dyn MCPTransport>) -> Self {
        Self {
            transport,
            running: None,
            generation: 0,
            state: MCPConnectionState::Disconnected,
        }
    }

    pub fn connection_state(&self) -> MCPConnectionState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == MCPConnectionState::Initialized
    }

    /// Open the connection if it is not already open.
    pub async fn initialize(&mut self) -> Result<(), AgentError> {
        self.session().await.map(|_| ())
    }

    /// Handle to the current session, connecting first when there is none.
    pub async fn session(&mut self) -> Result<MCPSession, AgentError> {
        if self.state == MCPConnectionState::Closed {
            return Err(AgentError::InvalidState("MCP client is closed".into()));
        }
        if let Some(running) = self.running.as_ref().filter(|r| !r.is_closed()) {
            return Ok(MCPSession {
                peer: running.peer().clone(),
                generation: self.generation,
            });
        }
        if self.running.take().is_some() {
            warn!(generation = self.generation, "MCP session ended; reconnecting");
        }

        let running = self.connect_with_protocol_fallback().await?;
        if let Some(peer) = running.peer_info() {
            info!(
                server = %peer.server_info.name,
                version = %peer.server_info.version,
                "MCP session initialized"
            );
        }
        let session = MCPSession {
            peer: running.peer().clone(),
            generation: self.generation + 1,
        };
        self.generation = session.generation;
        self.running = Some(running);
        self.state = MCPConnectionState::Initialized;
        Ok(session)
    }

    /// Replace the connection `stale` came from.
    ///
    /// When another caller already reconnected, the current session is returned as is.
    pub async fn reconnect(&mut self, stale: &MCPSession) -> Result<MCPSession, AgentError> {
        if self.state != MCPConnectionState::Closed && stale.generation == self.generation {
            self.running = None;
            self.state = MCPConnectionState::Disconnected;
        }
        self.session().await
    }

    /// End the session and stop the server process. Safe to call more than once.
    pub async fn close(&mut self) -> Result<(), AgentError> {
        if self.state == MCPConnectionState::Closed {
            return Ok(());
        }
        self.state = MCPConnectionState::Closed;
        self.transport.close();

        if let Some(running) = self.running.take() {
            let reason = running
                .cancel()
                .await
                .map_err(|e| AgentError::Stream(format!("MCP session shutdown failed: {e}")))?;
            debug!(?reason, "MCP session closed");
        }
        Ok(())
    }

    async fn connect_with_protocol_fallback(&mut self) -> Result<MCPRunningService, AgentError> {
        let latest = rmcp::model::ClientInfo {
            protocol_version: ProtocolVersion::LATEST,
            ..Default::default()
        };

        match self.transport.connect(latest).await {
            Ok(running) => return Ok(running),
            Err(error) if rejects_protocol_version(&error) => {
                debug!("MCP server rejected latest protocol; retrying with 2024-11-05");
            }
            Err(error) => return Err(map_client_initialize_error(error)),
        }

        let legacy = rmcp::model::ClientInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            ..Default::default()
        };
        self.transport
            .connect(legacy)
            .await
            .map_err(map_client_initialize_error)
    }
}

/// Errors after which a fresh connection may succeed.
pub fn is_transport_loss(error: &ServiceError) -> bool {
    matches!(
        error,
        ServiceError::TransportClosed | ServiceError::TransportSend(_)
    )
}

fn rejects_protocol_version(error: &ClientInitializeError) -> bool {
    let ClientInitializeError::JsonRpcError(error) = error else {
        return false;
    };
    let message = error.message.to_ascii_lowercase();
    message.contains("protocol") && message.contains("version")
}

/// Tool arguments as the JSON object `tools/call` expects; stringified JSON is unpacked.
pub fn coerce_tool_arguments(value: serde_json::Value) -> Result<Option<JsonObject>, AgentError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => Ok(Some(map)),
        serde_json::Value::String(raw) if raw.trim().is_empty() => Ok(None),
        serde_json::Value::String(raw) => {
            let parsed: serde_json::Value = serde_json::from_str(raw.trim()).map_err(|e| {
                AgentError::InvalidArgument(format!("MCP tool arguments must be valid JSON: {e}"))
            })?;
            coerce_tool_arguments(parsed)
        }
        other => Err(AgentError::InvalidArgument(format!(
            "MCP tool arguments must be a JSON object; got {other}"
        ))),
    }
}

fn joined_text(content: &[Content]) -> Option<String> {
    let lines: Vec<&str> = content
        .iter()
        .filter_map(|item| match item.as_text() {
            Some(text) => Some(text.text.as_str()),
            None => match &item.as_resource()?.resource {
                ResourceContents::TextResourceContents { text, .. } => Some(text.as_str()),
                _ => None,
            },
        })
        .collect();

    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// A result flagged `isError` becomes [`AgentError::ToolExecution`].
pub fn map_call_result(name: &str, result: CallToolResult) -> Result<MCPToolCallResult, AgentError> {
    let text_content = joined_text(&result.content);

    if result.is_error.unwrap_or(false) {
        let message = result
            .structured_content
            .as_ref()
            .map(|v| v.to_string())
            .or(text_content)
            .unwrap_or_else(|| "MCP tool returned an error result".into());
        return Err(AgentError::ToolExecution {
            tool_name: name.to_string(),
            message,
        });
    }

    Ok(MCPToolCallResult {
        structured_content: result.structured_content,
        text_content,
        content: result
            .content
            .iter()
            .filter_map(|item| serde_json::to_value(item).ok())
            .collect(),
    })
}

fn map_client_initialize_error(error: ClientInitializeError) -> AgentError {
    let mcp = |message: String| AgentError::Provider {
        provider: "mcp".into(),
        message,
    };
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            AgentError::Stream(format!("MCP initialize connection closed: {context}"))
        }
        ClientInitializeError::TransportError { error, context } => AgentError::Stream(format!(
            "MCP initialize transport error ({context}): {error}"
        )),
        ClientInitializeError::JsonRpcError(error) => mcp(format!(
            "MCP initialize JSON-RPC error {}: {}",
            error.code.0, error.message
        )),
        ClientInitializeError::Cancelled => AgentError::Stream("MCP initialize cancelled".into()),
        other => mcp(format!("MCP initialize error: {other}")),
    }
}

pub fn map_service_error(context: &str, error: ServiceError) -> AgentError {
    match error {
        ServiceError::McpError(error) => AgentError::Provider {
            provider: "mcp".into(),
            message: format!("{context}: MCP error {}: {}", error.code.0, error.message),
        },
        ServiceError::TransportSend(error) => {
            AgentError::Stream(format!("{context}: MCP transport send failed: {error}"))
        }
        ServiceError::TransportClosed => {
            AgentError::Stream(format!("{context}: MCP transport closed"))
        }
        ServiceError::Timeout { timeout } => AgentError::Timeout(timeout.as_millis() as u64),
        other => AgentError::Provider {
            provider: "mcp".into(),
            message: format!("{context}: MCP service error: {other}"),
        },
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{ScriptedServer, ScriptedTransport};
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn coerce_tool_arguments_accepts_object_and_stringified_object() {
        let from_obj = coerce_tool_arguments(json!({"collection":"todos"}))
            .unwrap()
            .expect("object should be present");
        assert_eq!(from_obj.get("collection"), Some(&json!("todos")));

        let from_str = coerce_tool_arguments(json!(r#"{"limit":5}"#))
            .unwrap()
            .expect("object should be present");
        assert_eq!(from_str.get("limit"), Some(&json!(5)));

        assert!(coerce_tool_arguments(json!("  ")).unwrap().is_none());
        assert!(coerce_tool_arguments(json!(null)).unwrap().is_none());
    }

    #[test]
    fn coerce_tool_arguments_rejects_non_objects_and_bad_json() {
        assert!(matches!(
            coerce_tool_arguments(json!(["bad"])),
            Err(AgentError::InvalidArgument(_))
        ));
        assert!(matches!(
            coerce_tool_arguments(json!(r#"{"limit":"#)),
            Err(AgentError::InvalidArgument(message)) if message.contains("valid JSON")
        ));
    }

    #[tokio::test]
    async fn initialize_falls_back_to_legacy_protocol_version() {
        let transport = ScriptedTransport::new(vec![
            Err(ClientInitializeError::JsonRpcError(
                rmcp::model::ErrorData::invalid_request("unsupported protocol version", None),
            )),
            Ok(test_support::scripted_session(ScriptedServer::Tools(vec!["find"]))),
        ]);
        let attempts = std::sync::Arc::clone(&transport.attempts);
        let mut client = MCPClient::new(Box::new(transport));

        client.initialize().await.expect("fallback should succeed");
        assert!(client.is_initialized());
        assert_eq!(
            attempts.lock().unwrap().as_slice(),
            &[ProtocolVersion::LATEST, ProtocolVersion::V_2024_11_05]
        );
    }

    #[tokio::test]
    async fn session_is_reused_while_open() {
        let transport = ScriptedTransport::serving(vec![ScriptedServer::Tools(vec![
            "find",
            "aggregate",
            "count",
        ])]);
        let attempts = std::sync::Arc::clone(&transport.attempts);
        let mut client = MCPClient::new(Box::new(transport));

        let first = client.session().await.unwrap();
        let second = client.session().await.unwrap();
        assert_eq!(first.generation(), second.generation());
        assert_eq!(attempts.lock().unwrap().len(), 1);

        let tools = second.list_tools().await.unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["find", "aggregate", "count"]);
        assert_eq!(tools[0].input_schema["type"], "object");
        assert_eq!(tools[0].description.as_deref(), Some("find tool"));
    }

    #[tokio::test]
    async fn reconnect_replaces_only_the_stale_generation() {
        let transport = ScriptedTransport::serving(vec![
            ScriptedServer::Disconnect,
            ScriptedServer::Tools(vec!["find"]),
        ]);
        let attempts = std::sync::Arc::clone(&transport.attempts);
        let mut client = MCPClient::new(Box::new(transport));

        let stale = client.session().await.unwrap();
        let err = stale.list_tools().await.expect_err("server hung up");
        assert!(is_transport_loss(&err));

        let fresh = client.reconnect(&stale).await.unwrap();
        assert_eq!(fresh.generation(), stale.generation() + 1);
        // A second caller holding the same stale handle gets the new session.
        let again = client.reconnect(&stale).await.unwrap();
        assert_eq!(again.generation(), fresh.generation());
        assert_eq!(attempts.lock().unwrap().len(), 2);

        assert_eq!(fresh.list_tools().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn error_results_become_tool_execution_errors() {
        let mut client = MCPClient::new(Box::new(ScriptedTransport::serving(vec![
            ScriptedServer::CallResult {
                text: "collection todos does not exist",
                is_error: true,
            },
        ])));
        let session = client.session().await.unwrap();

        let raw = session
            .call_tool("find", coerce_tool_arguments(json!({"collection": "todos"})).unwrap())
            .await
            .unwrap();
        assert!(matches!(
            map_call_result("find", raw),
            Err(AgentError::ToolExecution { tool_name, message })
            if tool_name == "find" && message.contains("does not exist")
        ));
    }

    #[tokio::test]
    async fn successful_results_prefer_text_content() {
        let mut client = MCPClient::new(Box::new(ScriptedTransport::serving(vec![
            ScriptedServer::CallResult {
                text: "[{\"title\":\"buy milk\"}]",
                is_error: false,
            },
        ])));
        let session = client.session().await.unwrap();

        let raw = session.call_tool("find", None).await.unwrap();
        let result = map_call_result("find", raw).unwrap();
        assert_eq!(result.content.len(), 1);
        assert_eq!(
            result.into_value_or_text(),
            json!("[{\"title\":\"buy milk\"}]")
        );
    }

    #[tokio::test]
    async fn close_is_idempotent_and_blocks_further_use() {
        let mut client = MCPClient::new(Box::new(ScriptedTransport::serving(vec![
            ScriptedServer::Tools(vec!["find"]),
        ])));
        let session = client.session().await.unwrap();

        client.close().await.expect("first close");
        client.close().await.expect("second close");
        assert_eq!(client.connection_state(), MCPConnectionState::Closed);
        assert!(matches!(
            client.session().await,
            Err(AgentError::InvalidState(_))
        ));
        assert!(matches!(
            client.reconnect(&session).await,
            Err(AgentError::InvalidState(_))
        ));
    }

    #[test]
    fn service_errors_map_to_agent_errors() {
        assert!(matches!(
            map_service_error(
                "call_tool",
                ServiceError::Timeout {
                    timeout: Duration::from_millis(2750),
                },
            ),
            AgentError::Timeout(2750)
        ));
        assert!(matches!(
            map_service_error("list_tools", ServiceError::UnexpectedResponse),
            AgentError::Provider { provider, .. } if provider == "mcp"
        ));
        assert!(!is_transport_loss(&ServiceError::UnexpectedResponse));
    }

    #[test]
    fn initialize_errors_keep_json_rpc_message() {
        let err = map_client_initialize_error(ClientInitializeError::JsonRpcError(
            rmcp::model::ErrorData::invalid_request("bad initialize payload", None),
        ));
        assert!(matches!(
            err,
            AgentError::Provider { message, .. } if message.contains("bad initialize payload")
        ));
    }
}
