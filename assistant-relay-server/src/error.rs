//! HTTP rendering of proxy and provider errors

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use assistant_relay_providers::ProviderError;

use crate::proxy::{ProxyError, SessionError};

/// Error returned by handlers, rendered as
/// `{ "error", "session_id"?, "code"?, "type"? }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub session_id: Option<String>,
    pub code: Option<String>,
    pub error_type: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    error_type: Option<&'a str>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            session_id: None,
            code: None,
            error_type: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        // Only pass through statuses that are real HTTP errors.
        let status = err
            .remote_status()
            .and_then(|status| StatusCode::from_u16(status).ok())
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            ProviderError::ApiError {
                message,
                code,
                error_type,
                ..
            } => Self {
                status,
                message,
                session_id: None,
                code,
                error_type,
            },
            other => Self::new(status, other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let SessionError { session_id, error } = err;
        let api_error = match error {
            ProxyError::EmptyMessage | ProxyError::MissingSession => {
                Self::bad_request(error.to_string())
            }
            ProxyError::Remote(provider_error) => Self::from(provider_error),
            ProxyError::RunNotCompleted { .. } | ProxyError::Cancelled => {
                Self::internal(error.to_string())
            }
        };
        api_error.with_session(session_id)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                session_id = ?self.session_id,
                "Request failed: {}",
                self.message
            );
        }

        let body = ErrorBody {
            error: &self.message,
            session_id: self.session_id.as_deref(),
            code: self.code.as_deref(),
            error_type: self.error_type.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}
