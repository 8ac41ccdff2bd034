//! Google Gemini API provider.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::AgentError;
use crate::types::*;

use super::http::{google_headers, shared_client, LineBuffer};
use super::{ModelProvider, ProviderRequest, ProviderResponse};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GoogleProvider {
    model_id: String,
    api_key: String,
    base_url: String,
}

impl GoogleProvider {
    pub fn new(model_id: String, api_key: String, base_url: Option<String>) -> Self {
        Self {
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model_id,
            api_key,
        }
    }

    fn build_request_body(&self, request: &ProviderRequest) -> Value {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for msg in &request.messages {
            match msg.role {
                Role::System => system_parts.push(json!({ "text": msg.text() })),
                Role::User => contents.push(json!({
                    "role": "user",
                    "parts": [{ "text": msg.text() }],
                })),
                Role::Assistant => {
                    let mut parts = Vec::new();
                    let text = msg.text();
                    if !text.is_empty() {
                        parts.push(json!({ "text": text }));
                    }
                    for call in msg.tool_calls() {
                        parts.push(json!({
                            "functionCall": { "name": call.name, "args": call.arguments }
                        }));
                    }
                    contents.push(json!({ "role": "model", "parts": parts }));
                }
                Role::Tool => {
                    // Gemini pairs responses to calls by function name, not id.
                    let name = msg.name.clone().unwrap_or_default();
                    let parts: Vec<Value> = msg
                        .content
                        .iter()
                        .filter_map(|part| match part {
                            ContentPart::ToolResult(tr) => Some(json!({
                                "functionResponse": {
                                    "name": name,
                                    "response": function_response_payload(&tr.result, tr.is_error),
                                }
                            })),
                            _ => None,
                        })
                        .collect();
                    contents.push(json!({ "role": "user", "parts": parts }));
                }
            }
        }

        let mut body = json!({ "contents": contents });
        let Some(obj) = body.as_object_mut() else {
            return body;
        };

        if !system_parts.is_empty() {
            obj.insert("systemInstruction".into(), json!({ "parts": system_parts }));
        }

        let mut gen_config = serde_json::Map::new();
        if let Some(max) = request.settings.max_tokens {
            gen_config.insert("maxOutputTokens".into(), max.into());
        }
        if let Some(temp) = request.settings.temperature {
            gen_config.insert("temperature".into(), temp.into());
        }
        if let Some(top_p) = request.settings.top_p {
            gen_config.insert("topP".into(), top_p.into());
        }
        if let Some(seed) = request.settings.seed {
            gen_config.insert("seed".into(), seed.into());
        }
        if !gen_config.is_empty() {
            obj.insert("generationConfig".into(), Value::Object(gen_config));
        }

        if let Some(ref tools) = request.tools {
            if !tools.is_empty() {
                let fn_decls: Vec<Value> = tools
                    .iter()
                    .map(|t| {
                        json!({
                            "name": t.name,
                            "description": t.description,
                            "parameters": strip_unsupported_schema_keys(&t.parameters),
                        })
                    })
                    .collect();
                obj.insert("tools".into(), json!([{ "functionDeclarations": fn_decls }]));
            }
        }

        body
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response, AgentError> {
        let resp = shared_client()
            .post(url)
            .headers(google_headers(&self.api_key))
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(super::http::status_to_error(status, &body_text));
        }
        Ok(resp)
    }
}

#[async_trait]
impl ModelProvider for GoogleProvider {
    fn provider_name(&self) -> &str {
        "google"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate_text(&self, request: &ProviderRequest) -> Result<ProviderResponse, AgentError> {
        let body = self.build_request_body(request);
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model_id);
        debug!(model = %self.model_id, "Google generate_text");

        let data: GeminiResponse = self.post(&url, &body).await?.json().await?;
        let candidate = data
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::api(200, "No candidates in Gemini response"))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(fc) = part.function_call {
                tool_calls.push(fc.into_tool_call());
            }
        }

        let finish_reason = if tool_calls.is_empty() {
            candidate.finish_reason.as_deref().and_then(parse_finish_reason)
        } else {
            Some(FinishReason::ToolCalls)
        };

        Ok(ProviderResponse {
            text,
            usage: data.usage_metadata.map(GeminiUsage::into_usage).unwrap_or_default(),
            tool_calls,
            finish_reason,
        })
    }

    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta, AgentError>>, AgentError> {
        let body = self.build_request_body(request);
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model_id
        );
        debug!(model = %self.model_id, "Google stream_text");

        let byte_stream = self.post(&url, &body).await?.bytes_stream();

        let stream = async_stream::stream! {
            let mut lines = LineBuffer::default();
            let mut finish_reason = None;
            let mut usage = None;
            let mut saw_tool_call = false;
            futures::pin_mut!(byte_stream);

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(AgentError::Network(e));
                        return;
                    }
                };

                for line in lines.push(&chunk) {
                    let Some(data) = super::http::parse_sse_data(&line) else {
                        continue;
                    };
                    let Ok(resp) = serde_json::from_str::<GeminiResponse>(data) else {
                        continue;
                    };
                    if let Some(u) = resp.usage_metadata {
                        usage = Some(u.into_usage());
                    }
                    let Some(candidate) = resp.candidates.into_iter().next() else {
                        continue;
                    };
                    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
                        if let Some(t) = part.text {
                            if !t.is_empty() {
                                yield Ok(TextStreamDelta::text(t));
                            }
                        }
                        if let Some(fc) = part.function_call {
                            saw_tool_call = true;
                            yield Ok(TextStreamDelta::tool_call(fc.into_tool_call()));
                        }
                    }
                    if let Some(reason) = candidate.finish_reason.as_deref().and_then(parse_finish_reason) {
                        finish_reason = Some(reason);
                    }
                }
            }

            if saw_tool_call {
                finish_reason = Some(FinishReason::ToolCalls);
            }
            yield Ok(TextStreamDelta::done(finish_reason, usage));
        };

        Ok(Box::pin(stream))
    }
}

/// Gemini wants `response` to be an object.
fn function_response_payload(result: &Value, is_error: bool) -> Value {
    match result {
        _ if is_error => json!({ "error": result }),
        Value::Object(_) => result.clone(),
        other => json!({ "content": other }),
    }
}

/// Drop JSON Schema keywords the Gemini function declaration schema rejects.
fn strip_unsupported_schema_keys(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| {
                    !matches!(k.as_str(), "$schema" | "additionalProperties" | "$ref" | "definitions")
                })
                .map(|(k, v)| (k.clone(), strip_unsupported_schema_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_unsupported_schema_keys).collect()),
        other => other.clone(),
    }
}

fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "STOP" => Some(FinishReason::Stop),
        "MAX_TOKENS" => Some(FinishReason::Length),
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => {
            Some(FinishReason::ContentFilter)
        }
        "MALFORMED_FUNCTION_CALL" => Some(FinishReason::Error),
        _ => None,
    }
}

// Internal Gemini response types

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Deserialize)]
struct GeminiFunctionCall {
    name: String,
    args: Option<Value>,
}

impl GeminiFunctionCall {
    fn into_tool_call(self) -> AgentToolCall {
        AgentToolCall {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name,
            arguments: self.args.unwrap_or_else(|| json!({})),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl GeminiUsage {
    fn into_usage(self) -> Usage {
        Usage {
            input_tokens: self.prompt_token_count,
            output_tokens: self.candidates_token_count,
            total_tokens: self.total_token_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn provider() -> GoogleProvider {
        GoogleProvider::new("gemini-2.0-flash".into(), "key".into(), None)
    }

    #[test]
    fn tool_turns_use_function_call_and_function_response() {
        let call = AgentToolCall {
            id: "c1".into(),
            name: "find".into(),
            arguments: json!({"collection": "todos"}),
        };
        let request = ProviderRequest {
            messages: vec![
                ModelMessage::user("what is left?"),
                ModelMessage::assistant_with_tool_calls("", vec![call]),
                ModelMessage::tool_result("c1", "find", json!("[]"), false),
            ],
            settings: GenerationSettings::deterministic_streaming(),
            tools: None,
        };

        let body = provider().build_request_body(&request);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(
            contents[1]["parts"][0]["functionCall"],
            json!({"name": "find", "args": {"collection": "todos"}})
        );
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"],
            json!({"name": "find", "response": {"content": "[]"}})
        );
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn schemas_lose_keywords_gemini_rejects() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "additionalProperties": false,
            "properties": { "filter": { "type": "object", "additionalProperties": true } }
        });
        assert_eq!(
            strip_unsupported_schema_keys(&schema),
            json!({ "type": "object", "properties": { "filter": { "type": "object" } } })
        );
    }

    #[test]
    fn error_results_are_wrapped() {
        assert_eq!(
            function_response_payload(&json!("boom"), true),
            json!({"error": "boom"})
        );
        assert_eq!(
            function_response_payload(&json!({"n": 2}), false),
            json!({"n": 2})
        );
    }
}
