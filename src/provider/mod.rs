//! Model provider trait and implementations.

pub mod http;
pub mod stream;

#[cfg(feature = "google")]
pub mod google;
#[cfg(feature = "openai")]
pub mod openai;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::config::ServiceConfig;
use crate::error::AgentError;
use crate::models::LanguageModel;
use crate::types::{message::AgentToolCall, FinishReason, GenerationSettings, ModelMessage, TextStreamDelta, Usage};

pub use stream::collect_stream;

/// A request sent to a model provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub messages: Vec<ModelMessage>,
    pub settings: GenerationSettings,
    pub tools: Option<Vec<ToolDefinition>>,
}

/// Tool definition sent to the provider API.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Response from a provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    pub text: String,
    pub usage: Usage,
    pub tool_calls: Vec<AgentToolCall>,
    pub finish_reason: Option<FinishReason>,
}

/// Core trait implemented by all model providers.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "openai", "google").
    fn provider_name(&self) -> &str;

    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    /// Generate a complete response (non-streaming).
    async fn generate_text(&self, request: &ProviderRequest)
        -> Result<ProviderResponse, AgentError>;

    /// Generate a response as a stream of deltas.
    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta, AgentError>>, AgentError>;
}

/// Create the provider for the configured model.
pub fn create_provider(config: &ServiceConfig) -> Result<Box<dyn ModelProvider>, AgentError> {
    match &config.model {
        #[cfg(feature = "openai")]
        LanguageModel::OpenAi(model_id) => {
            let api_key = config.require_api_key()?;
            Ok(Box::new(openai::OpenAiProvider::new(
                model_id.clone(),
                api_key.to_string(),
                config.base_url.clone(),
            )))
        }
        #[cfg(feature = "google")]
        LanguageModel::Google(model_id) => {
            let api_key = config.require_api_key()?;
            Ok(Box::new(google::GoogleProvider::new(
                model_id.clone(),
                api_key.to_string(),
                config.base_url.clone(),
            )))
        }
        LanguageModel::Custom { provider, .. } => Err(AgentError::Configuration(format!(
            "No provider available for '{provider}'; use openai or google"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> ServiceConfig {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(move |key| {
            pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    #[cfg(feature = "openai")]
    #[test]
    fn creates_openai_provider_for_default_model() {
        let provider = create_provider(&config(&[
            ("MONGODB_URI", "mongodb://localhost"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();
        assert_eq!(provider.provider_name(), "openai");
        assert_eq!(provider.model_id(), "gpt-4.1");
    }

    #[cfg(feature = "openai")]
    #[test]
    fn missing_key_fails_construction() {
        let err = match create_provider(&config(&[("MONGODB_URI", "mongodb://localhost")])) {
            Ok(_) => panic!("provider without key should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, AgentError::Authentication(_)));
    }

    #[test]
    fn unknown_provider_is_a_configuration_error() {
        let err = match create_provider(&config(&[
            ("MONGODB_URI", "mongodb://localhost"),
            ("CHAT_MODEL", "somecloud:model-x"),
        ])) {
            Ok(_) => panic!("unknown provider should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, AgentError::Configuration(msg) if msg.contains("somecloud")));
    }
}
