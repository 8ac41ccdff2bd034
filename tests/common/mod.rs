//! Shared test helpers: a scripted model provider and a scripted agent.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::BoxStream;

use todo_agent::agent::{AgentResult, ChatAgent, Conversation};
use todo_agent::error::AgentError;
use todo_agent::provider::{ModelProvider, ProviderRequest, ProviderResponse};
use todo_agent::types::*;

/// A mock provider that replays canned responses and records every request.
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<VecDeque<ProviderResponse>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the requests seen so far; stays valid after the provider is boxed.
    pub fn requests(&self) -> Arc<Mutex<Vec<ProviderRequest>>> {
        Arc::clone(&self.requests)
    }

    /// Queue a final text response.
    pub fn queue_response(&self, text: &str) {
        self.responses.lock().unwrap().push_back(ProviderResponse {
            text: text.to_string(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
                total_tokens: 30,
            },
            tool_calls: vec![],
            finish_reason: Some(FinishReason::Stop),
        });
    }

    /// Queue a tool call response.
    pub fn queue_tool_call(&self, id: &str, name: &str, args: serde_json::Value) {
        self.responses.lock().unwrap().push_back(ProviderResponse {
            text: String::new(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 5,
                total_tokens: 15,
            },
            tool_calls: vec![AgentToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: args,
            }],
            finish_reason: Some(FinishReason::ToolCalls),
        });
    }

    fn next(&self, request: &ProviderRequest) -> ProviderResponse {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ProviderResponse {
                text: "Mock response".to_string(),
                finish_reason: Some(FinishReason::Stop),
                ..Default::default()
            })
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }

    async fn generate_text(&self, request: &ProviderRequest) -> Result<ProviderResponse, AgentError> {
        Ok(self.next(request))
    }

    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta, AgentError>>, AgentError> {
        let response = self.next(request);

        let stream = async_stream::stream! {
            for chunk in response.text.chars().collect::<Vec<_>>().chunks(5) {
                yield Ok(TextStreamDelta::text(chunk.iter().collect::<String>()));
            }
            for call in response.tool_calls {
                yield Ok(TextStreamDelta::tool_call(call));
            }
            yield Ok(TextStreamDelta::done(response.finish_reason, Some(response.usage)));
        };

        Ok(Box::pin(stream))
    }
}

/// An agent that returns a fixed result and records the conversations it was given.
pub struct ScriptedAgent {
    result: Result<AgentResult, String>,
    seen: Mutex<Vec<Conversation>>,
}

impl ScriptedAgent {
    pub fn answering(result: AgentResult) -> Self {
        Self {
            result: Ok(result),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::answering(AgentResult::from(vec![
            ModelMessage::user("ignored"),
            ModelMessage::assistant(text),
        ]))
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatAgent for ScriptedAgent {
    async fn run(&self, conversation: Conversation) -> Result<AgentResult, AgentError> {
        self.seen.lock().unwrap().push(conversation);
        match &self.result {
            Ok(result) => Ok(result.clone()),
            Err(message) => Err(AgentError::Provider {
                provider: "mock".into(),
                message: message.clone(),
            }),
        }
    }
}
