//! Typed access to tool call arguments.

use crate::error::AgentError;

/// Arguments of one tool call as the model produced them.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, AgentError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// Deserialize the arguments, accepting a JSON object or a string holding one.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, AgentError> {
        let value = match &self.value {
            serde_json::Value::String(raw) if raw.trim().is_empty() => serde_json::json!({}),
            serde_json::Value::String(raw) => serde_json::from_str(raw.trim()).map_err(|e| {
                AgentError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
            })?,
            other => other.clone(),
        };
        serde_json::from_value(value)
            .map_err(|e| AgentError::InvalidArgument(format!("Failed to deserialize arguments: {e}")))
    }
}
