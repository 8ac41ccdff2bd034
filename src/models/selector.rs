//! Model selection and parsing.

use std::str::FromStr;

use super::LanguageModel;
use crate::error::AgentError;

/// Parse a "provider:model" string into a LanguageModel.
pub struct ModelSelector;

impl ModelSelector {
    /// Parse "provider:model_id" into a LanguageModel.
    ///
    /// Examples: "openai:gpt-4.1", "google:gemini-2.0-flash"
    pub fn parse(s: &str) -> Result<LanguageModel, AgentError> {
        let (provider, model_id) = s.split_once(':').ok_or_else(|| {
            AgentError::InvalidArgument(format!(
                "Invalid model selector '{s}': expected 'provider:model_id'"
            ))
        })?;

        if model_id.is_empty() {
            return Err(AgentError::InvalidArgument(format!(
                "Invalid model selector '{s}': model id is empty"
            )));
        }

        match provider {
            #[cfg(feature = "openai")]
            "openai" => Ok(LanguageModel::OpenAi(model_id.to_string())),
            #[cfg(feature = "google")]
            "google" | "gemini" => Ok(LanguageModel::Google(model_id.to_string())),
            _ => Ok(LanguageModel::Custom {
                provider: provider.to_string(),
                model_id: model_id.to_string(),
            }),
        }
    }
}

impl FromStr for LanguageModel {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelSelector::parse(s)
    }
}
