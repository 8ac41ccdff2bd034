//! Model selection.

pub mod selector;

pub use selector::ModelSelector;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language model the agent talks to, tagged by provider family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "provider", content = "model")]
pub enum LanguageModel {
    #[cfg(feature = "openai")]
    OpenAi(String),
    #[cfg(feature = "google")]
    Google(String),
    /// Model with a provider this build cannot talk to.
    Custom { provider: String, model_id: String },
}

impl LanguageModel {
    /// Get the model's API identifier string.
    pub fn model_id(&self) -> &str {
        match self {
            #[cfg(feature = "openai")]
            Self::OpenAi(m) => m,
            #[cfg(feature = "google")]
            Self::Google(m) => m,
            Self::Custom { model_id, .. } => model_id,
        }
    }

    /// Get the provider name.
    pub fn provider_name(&self) -> &str {
        match self {
            #[cfg(feature = "openai")]
            Self::OpenAi(_) => "openai",
            #[cfg(feature = "google")]
            Self::Google(_) => "google",
            Self::Custom { provider, .. } => provider,
        }
    }
}

impl fmt::Display for LanguageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider_name(), self.model_id())
    }
}
