//! Base trait and wire types for hosted assistant services

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Structured failure reported by the remote service
    #[error("API error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        code: Option<String>,
        error_type: Option<String>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProviderError {
    /// HTTP status reported by the remote service, if this is a structured API error
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            ProviderError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Author of a thread message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// A remote conversation thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// A message to append to a thread
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
}

impl NewMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Text payload of a content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageText {
    #[serde(default)]
    pub value: String,
}

/// One typed content part of a thread message.
///
/// Only text parts are modelled; images, file references and other part
/// types deserialize to [`MessageContent::Other`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: MessageText },
    #[serde(other)]
    Other,
}

impl MessageContent {
    /// Create a text part
    pub fn text(value: impl Into<String>) -> Self {
        MessageContent::Text {
            text: MessageText {
                value: value.into(),
            },
        }
    }
}

/// A message as returned by the thread listing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<MessageContent>,
    #[serde(default)]
    pub created_at: i64,
}

impl ThreadMessage {
    pub fn new(id: impl Into<String>, role: Role, content: Vec<MessageContent>) -> Self {
        Self {
            id: id.into(),
            role,
            content,
            created_at: 0,
        }
    }
}

/// Lifecycle state of a run.
///
/// Unknown values are kept verbatim in [`RunStatus::Other`] so they can be
/// surfaced to callers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    Other(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Other(raw) => raw,
        }
    }

    /// Whether the run is still waiting to be processed
    pub fn is_pending(&self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::InProgress)
    }
}

impl From<String> for RunStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "requires_action" => RunStatus::RequiresAction,
            "cancelling" => RunStatus::Cancelling,
            "cancelled" => RunStatus::Cancelled,
            "failed" => RunStatus::Failed,
            "completed" => RunStatus::Completed,
            "incomplete" => RunStatus::Incomplete,
            "expired" => RunStatus::Expired,
            _ => RunStatus::Other(raw),
        }
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error details attached to a failed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A remote processing pass over a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

/// Parameters for starting a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRequest {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantTool {
    #[serde(rename = "type")]
    pub tool_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSearchResources {
    #[serde(default)]
    pub vector_store_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolResources {
    #[serde(default)]
    pub file_search: Option<FileSearchResources>,
}

/// Remote assistant definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<AssistantTool>,
    #[serde(default)]
    pub tool_resources: Option<ToolResources>,
}

impl Assistant {
    pub fn tool_types(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.tool_type.clone()).collect()
    }

    pub fn vector_store_ids(&self) -> Vec<String> {
        self.tool_resources
            .as_ref()
            .and_then(|r| r.file_search.as_ref())
            .map(|fs| fs.vector_store_ids.clone())
            .unwrap_or_default()
    }
}

/// Trait for hosted assistant services exposing threads, messages and runs
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Create a thread, optionally seeded with initial messages
    async fn create_thread(&self, messages: Vec<NewMessage>) -> ProviderResult<Thread>;

    /// Append a message to an existing thread
    async fn add_message(&self, thread_id: &str, message: NewMessage)
        -> ProviderResult<ThreadMessage>;

    /// Start processing the thread's pending input
    async fn create_run(&self, thread_id: &str, request: RunRequest) -> ProviderResult<Run>;

    /// Read the current state of a run
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> ProviderResult<Run>;

    /// List up to `limit` messages of a thread, newest first
    async fn list_messages(&self, thread_id: &str, limit: u32)
        -> ProviderResult<Vec<ThreadMessage>>;

    /// Fetch the assistant definition
    async fn retrieve_assistant(&self, assistant_id: &str) -> ProviderResult<Assistant>;

    /// Replace the assistant's tools with file search over the given vector stores
    async fn enable_file_search(
        &self,
        assistant_id: &str,
        vector_store_ids: Vec<String>,
    ) -> ProviderResult<Assistant>;
}
