use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use tokio_util::sync::CancellationToken;

use assistant_relay_core::utils::take_chars;

use crate::error::ApiError;
use crate::proxy::ChatReply;
use crate::state::{
    AppState, AssistantInfo, ChatRequest, DiagResponse, FileSearchResponse, SessionResponse,
};

const INSTRUCTIONS_PREVIEW_CHARS: usize = 160;

pub async fn create_session_handler(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = state.proxy.create_session().await?;
    Ok(Json(SessionResponse { session_id }))
}

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(payload) = payload?;
    tracing::debug!(
        "Chat request (session: {:?}, {} chars)",
        payload.session_id,
        payload.user.len()
    );

    // The turn runs on its own task; dropping this handler (client gone)
    // fires the guard and stops the poll loop.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let proxy = state.proxy.clone();
    let session_id = payload.session_id.clone();
    let task = tokio::spawn(async move {
        proxy
            .send_message_with_cancel(session_id.as_deref(), &payload.user, &cancel)
            .await
    });

    match task.await {
        Ok(result) => Ok(Json(result?)),
        Err(e) => {
            tracing::error!("Chat task failed: {}", e);
            Err(ApiError::internal("chat task failed").with_session(payload.session_id))
        }
    }
}

pub async fn diag_handler(State(state): State<AppState>) -> Json<DiagResponse> {
    let info = &state.info;
    Json(DiagResponse {
        has_key: info.has_key,
        key_length: info.key_length,
        session_backend_id: info.assistant_id.clone(),
        api_base: info.api_base.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        platform: std::env::consts::OS.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn assistant_handler(
    State(state): State<AppState>,
) -> Result<Json<AssistantInfo>, ApiError> {
    if !state.info.has_key {
        return Err(ApiError::internal("API key not configured"));
    }

    let assistant = state
        .backend
        .retrieve_assistant(&state.info.assistant_id)
        .await?;
    let instructions = assistant.instructions.clone().unwrap_or_default();

    Ok(Json(AssistantInfo {
        tools: assistant.tool_types(),
        vector_store_ids: assistant.vector_store_ids(),
        instructions_length: instructions.chars().count(),
        instructions_preview: take_chars(&instructions, INSTRUCTIONS_PREVIEW_CHARS).to_string(),
        id: assistant.id,
        name: assistant.name,
        model: assistant.model,
    }))
}

pub async fn enable_file_search_handler(
    State(state): State<AppState>,
) -> Result<Json<FileSearchResponse>, ApiError> {
    if state.info.vector_store_ids.is_empty() {
        return Err(ApiError::bad_request(
            "No vector stores configured (assistant.vector_store_ids)",
        ));
    }

    tracing::info!(
        "Enabling file search on assistant {} with {} vector store(s)",
        state.info.assistant_id,
        state.info.vector_store_ids.len()
    );
    let updated = state
        .backend
        .enable_file_search(&state.info.assistant_id, state.info.vector_store_ids.clone())
        .await?;

    Ok(Json(FileSearchResponse {
        success: true,
        tools: updated.tool_types(),
    }))
}

pub async fn echo_handler(payload: Option<Json<serde_json::Value>>) -> Json<serde_json::Value> {
    let received = payload
        .map(|Json(value)| value)
        .unwrap_or(serde_json::Value::Null);
    Json(serde_json::json!({
        "received": received,
        "echoed_at": chrono::Utc::now().to_rfc3339(),
    }))
}
