//! Service configuration (layered: CLI > env > `.env` file > defaults).

use std::fmt;

use crate::error::AgentError;
use crate::models::LanguageModel;

pub const DEFAULT_MODEL: &str = "openai:gpt-4.1";
pub const DEFAULT_MCP_COMMAND: &str = "npx";
pub const DEFAULT_MCP_PACKAGE: &str = "mongodb-mcp-server";
pub const DEFAULT_DATABASE: &str = "chatapp2";
pub const DEFAULT_COLLECTION: &str = "todos";
pub const DEFAULT_MAX_STEPS: usize = 25;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

/// How to launch the MongoDB MCP server subprocess.
#[derive(Clone, PartialEq)]
pub struct ToolServerConfig {
    pub command: String,
    pub package: String,
    pub connection_string: String,
}

impl ToolServerConfig {
    /// Arguments passed to the launcher; the connection string is forwarded verbatim.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-y".to_string(),
            self.package.clone(),
            "--connectionString".to_string(),
            self.connection_string.clone(),
        ]
    }
}

impl fmt::Debug for ToolServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolServerConfig")
            .field("command", &self.command)
            .field("package", &self.package)
            .field("connection_string", &"<redacted>")
            .finish()
    }
}

/// Everything the service needs to start.
#[derive(Clone)]
pub struct ServiceConfig {
    pub model: LanguageModel,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub tool_server: ToolServerConfig,
    pub database: String,
    pub collection: String,
    pub max_steps: usize,
    pub host: String,
    pub port: u16,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("tool_server", &self.tool_server)
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("max_steps", &self.max_steps)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl ServiceConfig {
    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let connection_string = var("MONGODB_URI").ok_or_else(|| {
            AgentError::Configuration("Missing MONGODB_URI".into())
        })?;

        let model: LanguageModel = var("CHAT_MODEL")
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
            .parse()?;
        let (api_key, base_url) = provider_credentials(&model, &var);

        let max_steps = match var("AGENT_MAX_STEPS") {
            Some(raw) => parse_positive("AGENT_MAX_STEPS", &raw)?,
            None => DEFAULT_MAX_STEPS,
        };
        let port = match var("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| {
                AgentError::Configuration(format!("Invalid value for PORT ({raw}): {e}"))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            model,
            api_key,
            base_url,
            tool_server: ToolServerConfig {
                command: var("MCP_COMMAND").unwrap_or_else(|| DEFAULT_MCP_COMMAND.into()),
                package: var("MCP_SERVER_PACKAGE").unwrap_or_else(|| DEFAULT_MCP_PACKAGE.into()),
                connection_string,
            },
            database: var("TODO_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.into()),
            collection: var("TODO_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.into()),
            max_steps,
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
            port,
        })
    }

    /// API key for the selected provider, or an authentication error naming the variable.
    pub fn require_api_key(&self) -> Result<&str, AgentError> {
        self.api_key.as_deref().ok_or_else(|| {
            AgentError::Authentication(format!(
                "Missing {} for model {}",
                api_key_var(&self.model),
                self.model
            ))
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Only the credentials for the selected provider are read.
fn provider_credentials<F>(model: &LanguageModel, var: &F) -> (Option<String>, Option<String>)
where
    F: Fn(&str) -> Option<String>,
{
    match model {
        #[cfg(feature = "openai")]
        LanguageModel::OpenAi(_) => (var("OPENAI_API_KEY"), var("OPENAI_BASE_URL")),
        #[cfg(feature = "google")]
        LanguageModel::Google(_) => (
            var("GOOGLE_API_KEY").or_else(|| var("GEMINI_API_KEY")),
            var("GOOGLE_BASE_URL"),
        ),
        LanguageModel::Custom { .. } => (None, None),
    }
}

fn api_key_var(model: &LanguageModel) -> &'static str {
    match model.provider_name() {
        "google" => "GOOGLE_API_KEY",
        "openai" => "OPENAI_API_KEY",
        _ => "API key",
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<usize, AgentError> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AgentError::Configuration(format!(
            "Invalid value for {name} ({raw}): expected a positive integer"
        ))),
    }
}
