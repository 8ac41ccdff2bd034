//! Model/tool loop.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_MAX_STEPS;
use crate::error::AgentError;
use crate::provider::{collect_stream, ModelProvider, ProviderRequest, ProviderResponse, ToolDefinition};
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::Tool;
use crate::types::*;

use super::conversation::Conversation;
use super::result::AgentResult;

/// Anything that can answer a conversation.
#[async_trait]
pub trait ChatAgent: Send + Sync {
    async fn run(&self, conversation: Conversation) -> Result<AgentResult, AgentError>;
}

/// A model plus a fixed tool set, run as a reason/act loop.
pub struct Agent {
    provider: Box<dyn ModelProvider>,
    tools: Vec<Arc<dyn Tool>>,
    settings: GenerationSettings,
    max_steps: usize,
}

impl Agent {
    pub fn new(
        provider: Box<dyn ModelProvider>,
        tools: Vec<Arc<dyn Tool>>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            provider,
            tools,
            settings,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    fn tool_definitions(&self) -> Option<Vec<ToolDefinition>> {
        if self.tools.is_empty() {
            None
        } else {
            Some(self.tools.iter().map(|t| t.definition()).collect())
        }
    }

    async fn step(&self, request: &ProviderRequest) -> Result<ProviderResponse, AgentError> {
        if self.settings.stream {
            let stream = self.provider.stream_text(request).await?;
            collect_stream(stream).await
        } else {
            self.provider.generate_text(request).await
        }
    }

    async fn execute_tool_call(&self, call: &AgentToolCall) -> ModelMessage {
        let Some(tool) = self.tools.iter().find(|t| t.name() == call.name) else {
            warn!(tool = %call.name, "model called an unknown tool");
            return ModelMessage::tool_result(
                call.id.clone(),
                call.name.clone(),
                serde_json::json!({ "error": format!("Tool '{}' not found", call.name) }),
                true,
            );
        };

        let args = ToolArguments::new(call.arguments.clone());
        match tool.execute(&args).await {
            Ok(value) => ModelMessage::tool_result(call.id.clone(), call.name.clone(), value, false),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool execution failed");
                ModelMessage::tool_result(
                    call.id.clone(),
                    call.name.clone(),
                    serde_json::json!({ "error": e.to_string() }),
                    true,
                )
            }
        }
    }
}

#[async_trait]
impl ChatAgent for Agent {
    async fn run(&self, conversation: Conversation) -> Result<AgentResult, AgentError> {
        let mut messages = conversation.into_messages();
        let tools = self.tool_definitions();
        let mut usage = Usage::default();

        for step in 0..self.max_steps {
            let request = ProviderRequest {
                messages: messages.clone(),
                settings: self.settings.clone(),
                tools: tools.clone(),
            };

            debug!(
                step,
                provider = self.provider.provider_name(),
                model = self.provider.model_id(),
                "agent step"
            );
            let response = self.step(&request).await?;
            usage.merge(&response.usage);

            if response.tool_calls.is_empty() {
                info!(
                    steps = step + 1,
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "agent run finished"
                );
                messages.push(ModelMessage::assistant(response.text));
                return Ok(AgentResult::from(messages));
            }

            messages.push(ModelMessage::assistant_with_tool_calls(
                response.text,
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                debug!(tool = %call.name, id = %call.id, "executing tool call");
                let result = self.execute_tool_call(call).await;
                messages.push(result);
            }
        }

        Err(AgentError::StepLimit {
            limit: self.max_steps,
        })
    }
}
