//! Command-line flags for the service binary.

use clap::Parser;

use crate::config::ServiceConfig;
use crate::error::AgentError;

/// Todo chat service.
#[derive(Parser, Debug, Default)]
#[command(name = "todo-agent", version, about = "HTTP chat endpoint for todo questions")]
pub struct Cli {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Model as provider:model, e.g. openai:gpt-4.1 (overrides CHAT_MODEL)
    #[arg(short, long)]
    pub model: Option<String>,
}

impl Cli {
    /// Resolve configuration from the process environment; flags win.
    ///
    /// `.env` is expected to be loaded already, before logging starts.
    pub fn load_config(&self) -> Result<ServiceConfig, AgentError> {
        self.resolve(|key| std::env::var(key).ok())
    }

    fn resolve<F>(&self, env: F) -> Result<ServiceConfig, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        ServiceConfig::from_lookup(|key| {
            let flag = match key {
                "HOST" => self.host.clone(),
                "PORT" => self.port.map(|p| p.to_string()),
                "CHAT_MODEL" => self.model.clone(),
                _ => None,
            };
            flag.or_else(|| env(key))
        })
    }
}
