//! Decoding what an agent run returns into the final answer text.

use serde_json::Value;

use crate::types::ModelMessage;

/// Every shape an agent run can come back in.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentResult {
    /// A run transcript; the last entry is the final answer.
    Transcript { messages: Vec<TranscriptEntry> },
    /// A single message.
    Message(ModelMessage),
    /// Anything else, rendered as text.
    Opaque(Value),
}

/// One element of a transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    Message(ModelMessage),
    /// A loose `{ "role": ..., "content": ... }` style object.
    Map(serde_json::Map<String, Value>),
    Opaque(Value),
}

impl AgentResult {
    /// Classify a JSON value produced by some other agent implementation.
    ///
    /// An object with a `messages` array is a transcript; an object that is a
    /// well-formed message is a message; everything else is opaque.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map) if map.get("messages").is_some_and(Value::is_array) => {
                let messages = match map.remove("messages") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                Self::Transcript {
                    messages: messages.into_iter().map(TranscriptEntry::from_value).collect(),
                }
            }
            other => match serde_json::from_value::<ModelMessage>(other.clone()) {
                Ok(message) => Self::Message(message),
                Err(_) => Self::Opaque(other),
            },
        }
    }

    /// The answer text. An empty transcript yields an empty string.
    pub fn final_text(&self) -> String {
        match self {
            Self::Transcript { messages } => messages
                .last()
                .map(TranscriptEntry::content)
                .unwrap_or_default(),
            Self::Message(message) => message.text(),
            Self::Opaque(value) => render(value),
        }
    }
}

impl TranscriptEntry {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                match serde_json::from_value::<ModelMessage>(Value::Object(map.clone())) {
                    Ok(message) => Self::Message(message),
                    Err(_) => Self::Map(map),
                }
            }
            other => Self::Opaque(other),
        }
    }

    /// Text content of this entry. A map without `content` yields "".
    pub fn content(&self) -> String {
        match self {
            Self::Message(message) => message.text(),
            Self::Map(map) => map.get("content").map(render).unwrap_or_default(),
            Self::Opaque(value) => render(value),
        }
    }
}

impl From<Vec<ModelMessage>> for AgentResult {
    fn from(messages: Vec<ModelMessage>) -> Self {
        Self::Transcript {
            messages: messages.into_iter().map(TranscriptEntry::Message).collect(),
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn transcript_uses_last_message_content() {
        let result = AgentResult::from(vec![
            ModelMessage::user("list todos"),
            ModelMessage::assistant("You have two todos: buy milk and walk the dog."),
        ]);
        assert_eq!(
            result.final_text(),
            "You have two todos: buy milk and walk the dog."
        );
    }

    #[test]
    fn transcript_with_map_last_element_reads_content_key() {
        let result = AgentResult::from_value(json!({
            "messages": [
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "Nothing is overdue." }
            ]
        }));
        assert!(matches!(
            &result,
            AgentResult::Transcript { messages } if matches!(messages[1], TranscriptEntry::Map(_))
        ));
        assert_eq!(result.final_text(), "Nothing is overdue.");
    }

    #[test]
    fn map_without_content_yields_empty_string() {
        let result = AgentResult::from_value(json!({ "messages": [{ "role": "assistant" }] }));
        assert_eq!(result.final_text(), "");
    }

    #[test]
    fn bare_message_is_decoded() {
        let value = serde_json::to_value(ModelMessage::assistant("All done.")).unwrap();
        let result = AgentResult::from_value(value);
        assert!(matches!(result, AgentResult::Message(_)));
        assert_eq!(result.final_text(), "All done.");
    }

    #[test]
    fn other_shapes_render_as_text() {
        assert_eq!(AgentResult::from_value(json!("plain")).final_text(), "plain");
        assert_eq!(
            AgentResult::from_value(json!({ "answer": 42 })).final_text(),
            r#"{"answer":42}"#
        );
        assert_eq!(
            AgentResult::from_value(json!({ "messages": ["last"] })).final_text(),
            "last"
        );
    }

    #[test]
    fn empty_transcript_yields_empty_string() {
        assert_eq!(AgentResult::from(Vec::new()).final_text(), "");
    }
}
