//! Transports that start an MCP session.

use async_trait::async_trait;
use rmcp::model::ClientInfo;
use rmcp::service::{ClientInitializeError, DynService, RoleClient, RunningService, ServiceExt};
use rmcp::transport::TokioChildProcess;
use tokio::process::Command;
use tracing::debug;

use crate::config::ToolServerConfig;

pub type DynClientService = Box<dyn DynService<RoleClient>>;
pub type MCPRunningService = RunningService<RoleClient, DynClientService>;

/// Something that can open an initialized MCP session.
#[async_trait]
pub trait MCPTransport: Send {
    /// Start the server (if needed) and run the initialize handshake.
    async fn connect(
        &mut self,
        client_info: ClientInfo,
    ) -> Result<MCPRunningService, ClientInitializeError>;

    /// Refuse further connects.
    fn close(&mut self);
}

/// Launches a local MCP server as a child process and speaks JSON-RPC over its stdio.
pub struct StdioTransport {
    command: String,
    args: Vec<String>,
    closed: bool,
}

impl StdioTransport {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            closed: false,
        }
    }

    /// Transport for the configured tool server (`npx -y <package> --connectionString <uri>`).
    pub fn from_config(config: &ToolServerConfig) -> Self {
        Self::new(config.command.clone(), config.args())
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl MCPTransport for StdioTransport {
    async fn connect(
        &mut self,
        client_info: ClientInfo,
    ) -> Result<MCPRunningService, ClientInitializeError> {
        if self.closed {
            return Err(ClientInitializeError::ConnectionClosed(
                "MCP transport closed".into(),
            ));
        }

        debug!(command = %self.command, "spawning MCP server");
        let mut command = Command::new(&self.command);
        command.args(&self.args);
        let transport = TokioChildProcess::new(command).map_err(|error| {
            ClientInitializeError::transport::<TokioChildProcess>(error, "spawn stdio transport")
        })?;

        client_info.into_dyn().serve(transport).await
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_builds_npx_invocation() {
        let config = ToolServerConfig {
            command: "npx".into(),
            package: "mongodb-mcp-server".into(),
            connection_string: "mongodb://localhost:27017".into(),
        };
        let transport = StdioTransport::from_config(&config);
        assert_eq!(transport.command(), "npx");
        assert_eq!(
            transport.args(),
            &[
                "-y".to_string(),
                "mongodb-mcp-server".to_string(),
                "--connectionString".to_string(),
                "mongodb://localhost:27017".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn closed_transport_refuses_to_connect() {
        let mut transport = StdioTransport::new("npx", Vec::new());
        transport.close();
        let err = match transport.connect(ClientInfo::default()).await {
            Ok(_) => panic!("closed transport should not connect"),
            Err(err) => err,
        };
        assert!(matches!(err, ClientInitializeError::ConnectionClosed(_)));
    }
}
