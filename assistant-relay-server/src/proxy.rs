//! Conversation-session proxy
//!
//! Turns one chat turn into the remote call sequence
//! create/append → run → poll → list, and maps the run outcome onto a reply
//! or an error that still carries the session id.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use assistant_relay_core::config::Config;
use assistant_relay_providers::{
    AssistantBackend, NewMessage, ProviderError, Run, RunRequest, RunStatus,
};

use crate::reply::extract_reply;

/// Returned in place of a reply when the run asks for tool outputs
pub const REQUIRES_ACTION_TEXT: &str = "This assistant requested tool calls, which this relay \
does not handle.\n\nTip: disable custom tools on the assistant or extend the relay to submit \
tool outputs.";

/// Settings the proxy needs for one chat turn
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub assistant_id: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub history_limit: u32,
    pub follow_up_instructions: Option<String>,
    pub require_session: bool,
}

impl ProxyConfig {
    pub fn new(assistant_id: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            poll_interval: Duration::from_millis(500),
            max_poll_attempts: 120,
            history_limit: 50,
            follow_up_instructions: None,
            require_session: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            assistant_id: config.assistant.assistant_id.clone(),
            poll_interval: Duration::from_millis(config.polling.interval_ms),
            max_poll_attempts: config.polling.max_attempts,
            history_limit: config.polling.history_limit,
            follow_up_instructions: config
                .session
                .follow_up_instructions
                .clone()
                .filter(|s| !s.trim().is_empty()),
            require_session: config.session.require_session,
        }
    }
}

/// Why a chat turn failed
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Empty message")]
    EmptyMessage,

    #[error("Missing session_id")]
    MissingSession,

    #[error(transparent)]
    Remote(#[from] ProviderError),

    #[error("Run ended with status: {status}")]
    RunNotCompleted { status: RunStatus },

    #[error("Request cancelled while waiting for the run")]
    Cancelled,
}

/// A [`ProxyError`] together with the session it happened in, when known
#[derive(Error, Debug)]
#[error("{error}")]
pub struct SessionError {
    pub session_id: Option<String>,
    #[source]
    pub error: ProxyError,
}

impl SessionError {
    pub fn new(session_id: Option<String>, error: impl Into<ProxyError>) -> Self {
        Self {
            session_id,
            error: error.into(),
        }
    }

    fn in_session(session_id: &str, error: impl Into<ProxyError>) -> Self {
        Self::new(Some(session_id.to_string()), error)
    }
}

/// Successful chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub text: String,
    pub session_id: String,
}

/// Stateless relay between chat turns and the remote assistant service.
///
/// Holds only immutable configuration and the backend handle, so one
/// instance is shared by all requests. Requests for the same session are
/// not serialized here.
pub struct SessionProxy {
    backend: Arc<dyn AssistantBackend>,
    config: ProxyConfig,
}

impl SessionProxy {
    pub fn new(backend: Arc<dyn AssistantBackend>, config: ProxyConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Create an empty remote session and return its id
    pub async fn create_session(&self) -> Result<String, SessionError> {
        let thread = self
            .backend
            .create_thread(Vec::new())
            .await
            .map_err(|e| SessionError::new(None, e))?;
        info!("Created session {}", thread.id);
        Ok(thread.id)
    }

    /// Relay one user turn and wait for the assistant's reply
    pub async fn send_message(
        &self,
        session_id: Option<&str>,
        text: &str,
    ) -> Result<ChatReply, SessionError> {
        self.send_message_with_cancel(session_id, text, &CancellationToken::new())
            .await
    }

    /// Like [`SessionProxy::send_message`], but stops polling as soon as
    /// `cancel` fires.
    pub async fn send_message_with_cancel(
        &self,
        session_id: Option<&str>,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, SessionError> {
        let text = text.trim();
        let session_id = session_id.map(str::trim).filter(|id| !id.is_empty());

        if text.is_empty() {
            return Err(SessionError::new(
                session_id.map(ToString::to_string),
                ProxyError::EmptyMessage,
            ));
        }

        let (session_id, is_follow_up) = match session_id {
            Some(id) => {
                let is_follow_up = self.is_follow_up(id).await?;
                self.backend
                    .add_message(id, NewMessage::user(text))
                    .await
                    .map_err(|e| SessionError::in_session(id, e))?;
                (id.to_string(), is_follow_up)
            }
            None if self.config.require_session => {
                return Err(SessionError::new(None, ProxyError::MissingSession));
            }
            None => {
                let thread = self
                    .backend
                    .create_thread(vec![NewMessage::user(text)])
                    .await
                    .map_err(|e| SessionError::new(None, e))?;
                info!("Created session {} for first message", thread.id);
                (thread.id, false)
            }
        };

        let request = RunRequest {
            assistant_id: self.config.assistant_id.clone(),
            additional_instructions: if is_follow_up {
                self.config.follow_up_instructions.clone()
            } else {
                None
            },
        };
        let run = self
            .backend
            .create_run(&session_id, request)
            .await
            .map_err(|e| SessionError::in_session(&session_id, e))?;
        debug!(
            "Run {} started on session {} (follow-up: {}, status: {})",
            run.id, session_id, is_follow_up, run.status
        );

        let status = self.wait_for_run(&session_id, run, cancel).await?;
        match status {
            RunStatus::Completed => {
                let messages = self
                    .backend
                    .list_messages(&session_id, self.config.history_limit)
                    .await
                    .map_err(|e| SessionError::in_session(&session_id, e))?;
                Ok(ChatReply {
                    text: extract_reply(&messages),
                    session_id,
                })
            }
            RunStatus::RequiresAction => {
                warn!(
                    "Run on session {} requires tool outputs, which are not supported",
                    session_id
                );
                Ok(ChatReply {
                    text: REQUIRES_ACTION_TEXT.to_string(),
                    session_id,
                })
            }
            status => {
                warn!("Run on session {} ended with status {}", session_id, status);
                Err(SessionError::in_session(
                    &session_id,
                    ProxyError::RunNotCompleted { status },
                ))
            }
        }
    }

    /// A supplied session counts as a follow-up. When follow-up instructions
    /// are configured the session is checked first, so an empty bootstrapped
    /// session still gets the assistant's opening turn.
    async fn is_follow_up(&self, session_id: &str) -> Result<bool, SessionError> {
        if self.config.follow_up_instructions.is_none() {
            return Ok(true);
        }
        let latest = self
            .backend
            .list_messages(session_id, 1)
            .await
            .map_err(|e| SessionError::in_session(session_id, e))?;
        Ok(!latest.is_empty())
    }

    /// Poll until the run leaves `queued`/`in_progress`, the attempt cap is
    /// reached, or `cancel` fires. Returns the last observed status.
    async fn wait_for_run(
        &self,
        session_id: &str,
        run: Run,
        cancel: &CancellationToken,
    ) -> Result<RunStatus, SessionError> {
        let mut status = run.status;
        let mut attempts = 0;

        while status.is_pending() {
            if attempts >= self.config.max_poll_attempts {
                warn!(
                    "Run {} still {} after {} polls, giving up",
                    run.id, status, attempts
                );
                break;
            }
            attempts += 1;

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Stopped polling run {} on session {}: cancelled", run.id, session_id);
                    return Err(SessionError::in_session(session_id, ProxyError::Cancelled));
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            let updated = self
                .backend
                .retrieve_run(session_id, &run.id)
                .await
                .map_err(|e| SessionError::in_session(session_id, e))?;
            if updated.status != status {
                debug!("Run {}: {} -> {}", run.id, status, updated.status);
            }
            if let Some(last_error) = &updated.last_error {
                debug!(
                    "Run {} reported error {:?}: {:?}",
                    run.id, last_error.code, last_error.message
                );
            }
            status = updated.status;
        }

        Ok(status)
    }
}
