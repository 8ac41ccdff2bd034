//! `POST /chat`.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use crate::agent::Conversation;
use crate::sanitize::sanitize;

use super::error::ApiError;
use super::state::ServiceContext;

/// Body of a chat request. Any string is accepted, including "".
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
}

/// Answer one prompt with the agent and return its cleaned reply as plain text.
pub async fn chat(
    State(ctx): State<Arc<ServiceContext>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = ctx.agent().ok_or(ApiError::NotReady)?;
    let Json(request) = payload?;

    let conversation = Conversation::from_user_message(ctx.instructions().build_prompt(&request.prompt));
    let result = agent.run(conversation).await.map_err(ApiError::Agent)?;

    let final_text = result.final_text();
    debug!(chars = final_text.len(), "agent produced final text");

    Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], sanitize(&final_text)))
}
