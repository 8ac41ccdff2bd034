//! Process-wide service state: the agent and the tool server it talks to.

use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::agent::{Agent, ChatAgent};
use crate::config::ServiceConfig;
use crate::error::AgentError;
use crate::mcp::MCPToolAdapter;
use crate::prompt::InstructionTemplate;
use crate::provider::create_provider;
use crate::types::GenerationSettings;

/// Owns the agent singleton and the tool server handle.
///
/// The agent is set at most once, either by [`startup`](Self::startup) or
/// [`install_agent`](Self::install_agent). Until then chat requests are refused.
pub struct ServiceContext {
    agent: OnceLock<Arc<dyn ChatAgent>>,
    tool_provider: Mutex<Option<Arc<MCPToolAdapter>>>,
    instructions: InstructionTemplate,
}

impl ServiceContext {
    pub fn new(instructions: InstructionTemplate) -> Self {
        Self {
            agent: OnceLock::new(),
            tool_provider: Mutex::new(None),
            instructions,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(InstructionTemplate::new(
            config.database.clone(),
            config.collection.clone(),
        ))
    }

    /// Launch the tool server, discover its tools and build the agent.
    ///
    /// Errors if the agent is already set.
    pub async fn startup(&self, config: &ServiceConfig) -> Result<(), AgentError> {
        let mut tool_provider = self.tool_provider.lock().await;
        if self.agent.get().is_some() || tool_provider.is_some() {
            return Err(AgentError::InvalidState("service already started".into()));
        }

        let adapter = MCPToolAdapter::connect(&config.tool_server).await?;
        let agent = match build_agent(&adapter, config).await {
            Ok(agent) => agent,
            Err(e) => {
                if let Err(close_err) = adapter.close().await {
                    warn!(error = %close_err, "failed to close MCP tool server after startup error");
                }
                return Err(e);
            }
        };

        info!(
            model = %config.model,
            tools = ?agent.tool_names(),
            "agent ready"
        );
        *tool_provider = Some(adapter);
        self.install_agent(Arc::new(agent))
    }

    /// Set the agent directly.
    pub fn install_agent(&self, agent: Arc<dyn ChatAgent>) -> Result<(), AgentError> {
        self.agent
            .set(agent)
            .map_err(|_| AgentError::InvalidState("agent already installed".into()))
    }

    /// The agent, if startup has completed.
    pub fn agent(&self) -> Option<Arc<dyn ChatAgent>> {
        self.agent.get().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.agent.get().is_some()
    }

    pub fn instructions(&self) -> &InstructionTemplate {
        &self.instructions
    }

    /// Close the tool server if one is open. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        let adapter = self.tool_provider.lock().await.take();
        if let Some(adapter) = adapter {
            info!("closing MCP tool server");
            adapter.close().await?;
        }
        Ok(())
    }
}

async fn build_agent(
    adapter: &Arc<MCPToolAdapter>,
    config: &ServiceConfig,
) -> Result<Agent, AgentError> {
    let tools = adapter.get_tools().await?;
    let provider = create_provider(config)?;
    Ok(Agent::new(provider, tools, GenerationSettings::deterministic_streaming())
        .with_max_steps(config.max_steps))
}
