//! Generation settings and related enums.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Settings controlling text generation.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationSettings {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub seed: Option<u64>,
    /// Use the provider's streaming transport and assemble the reply locally.
    #[serde(default)]
    pub stream: bool,
}

impl GenerationSettings {
    /// Greedy decoding over a streaming transport.
    pub fn deterministic_streaming() -> Self {
        Self {
            temperature: Some(0.0),
            stream: true,
            ..Default::default()
        }
    }
}

/// Why generation finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Error,
}
