//! Tool parameter schemas.

use serde::{Deserialize, Serialize};

/// JSON Schema describing a tool's input object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentToolParameters {
    pub schema: serde_json::Value,
}

impl AgentToolParameters {
    /// Wrap a raw JSON Schema, normalising a missing or non-object schema.
    pub fn from_schema(schema: serde_json::Value) -> Self {
        match schema {
            serde_json::Value::Object(ref map) if !map.is_empty() => Self { schema },
            _ => Self::empty(),
        }
    }

    /// Schema for a tool that takes no arguments.
    pub fn empty() -> Self {
        Self {
            schema: serde_json::json!({
                "type": "object",
                "properties": {},
            }),
        }
    }
}
