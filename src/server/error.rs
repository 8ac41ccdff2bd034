//! HTTP error responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::AgentError;

/// Failures of the chat endpoint, rendered as `{"detail": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Agent not ready")]
    NotReady,

    #[error("Agent run failed")]
    Agent(#[source] AgentError),

    #[error(transparent)]
    InvalidBody(#[from] JsonRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::InvalidBody(rejection) => return rejection.into_response(),
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::Agent(ref e) => {
                error!(
                    error = %e,
                    category = ?e.category(),
                    retryable = e.is_retryable(),
                    "agent run failed"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
