//! Folding a delta stream back into a single provider response.

use futures::stream::BoxStream;
use futures::StreamExt;

use super::ProviderResponse;
use crate::error::AgentError;
use crate::types::{StreamEventType, TextStreamDelta};

/// Consume a stream, concatenating text and collecting complete tool calls.
pub async fn collect_stream(
    mut stream: BoxStream<'static, Result<TextStreamDelta, AgentError>>,
) -> Result<ProviderResponse, AgentError> {
    let mut response = ProviderResponse::default();

    while let Some(delta) = stream.next().await {
        let delta = delta?;
        match delta.event_type {
            StreamEventType::TextDelta => response.text.push_str(&delta.text),
            StreamEventType::ToolCallDelta => {
                if let Some(call) = delta.tool_call {
                    response.tool_calls.push(call);
                }
            }
            StreamEventType::Error => {
                let message = if delta.text.is_empty() {
                    "stream error".to_string()
                } else {
                    delta.text
                };
                return Err(AgentError::Stream(message));
            }
            StreamEventType::Done => {
                response.text.push_str(&delta.text);
                response.finish_reason = delta.finish_reason;
                if let Some(usage) = delta.usage {
                    response.usage.merge(&usage);
                }
                break;
            }
        }
    }

    Ok(response)
}
