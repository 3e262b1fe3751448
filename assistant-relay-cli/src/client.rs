//! HTTP chat client for the relay's `/api` surface

use chrono::{DateTime, Local};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Server {
        status: u16,
        message: String,
        session_id: Option<String>,
    },
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Serialize)]
struct ChatBody<'a> {
    user: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    pub session_id: String,
}

#[derive(Deserialize)]
struct SessionBody {
    session_id: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    session_id: Option<String>,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn create_session(&self) -> ClientResult<String> {
        let url = format!("{}/session", self.base_url);
        let response = self.client.post(&url).send().await?;
        let body: SessionBody = Self::parse(response).await?;
        Ok(body.session_id)
    }

    pub async fn send(&self, session_id: Option<&str>, text: &str) -> ClientResult<ChatResponse> {
        let url = format!("{}/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ChatBody {
                user: text,
                session_id,
            })
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn diag(&self) -> ClientResult<serde_json::Value> {
        let url = format!("{}/diag", self.base_url);
        let response = self.client.get(&url).send().await?;
        Self::parse(response).await
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let (message, session_id) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => (body.error, body.session_id),
            Err(_) if text.trim().is_empty() => (status.to_string(), None),
            Err(_) => (text, None),
        };
        Err(ClientError::Server {
            status: status.as_u16(),
            message,
            session_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub role: EntryRole,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl TranscriptEntry {
    fn new(role: EntryRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            timestamp: Local::now(),
        }
    }
}

/// A user turn accepted into the transcript and waiting for its reply
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub text: String,
    pub session_id: Option<String>,
}

/// Client-side conversation state: transcript, typing flag and the session
/// id most recently echoed back by the relay.
pub struct ChatSession {
    api: ApiClient,
    session_id: Option<String>,
    transcript: Vec<TranscriptEntry>,
    typing: bool,
}

impl ChatSession {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            session_id: None,
            transcript: Vec::new(),
            typing: false,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Ask the relay for a fresh, empty session
    pub async fn bootstrap(&mut self) -> ClientResult<&str> {
        let session_id = self.api.create_session().await?;
        tracing::debug!("Bootstrapped session {}", session_id);
        Ok(self.session_id.insert(session_id).as_str())
    }

    /// Clear the transcript and start over on a new session
    pub async fn new_chat(&mut self) -> ClientResult<&str> {
        self.transcript.clear();
        self.session_id = None;
        self.typing = false;
        self.bootstrap().await
    }

    /// Record the user's entry and enter the typing state. Blank input is
    /// ignored and yields `None`.
    pub fn begin(&mut self, text: &str) -> Option<PendingTurn> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.transcript
            .push(TranscriptEntry::new(EntryRole::User, text));
        self.typing = true;
        Some(PendingTurn {
            text: text.to_string(),
            session_id: self.session_id.clone(),
        })
    }

    /// Leave the typing state and apply the relay's answer
    pub fn complete(
        &mut self,
        result: ClientResult<ChatResponse>,
    ) -> ClientResult<&TranscriptEntry> {
        self.typing = false;
        match result {
            Ok(reply) => {
                self.session_id = Some(reply.session_id);
                self.transcript
                    .push(TranscriptEntry::new(EntryRole::Assistant, reply.text));
                let last = self.transcript.len() - 1;
                Ok(&self.transcript[last])
            }
            Err(err) => {
                if let ClientError::Server {
                    session_id: Some(id),
                    ..
                } = &err
                {
                    self.session_id = Some(id.clone());
                }
                Err(err)
            }
        }
    }

    /// Send one turn and wait for the reply. `Ok(None)` means the input was
    /// blank and nothing was sent.
    pub async fn submit(&mut self, text: &str) -> ClientResult<Option<&TranscriptEntry>> {
        let Some(turn) = self.begin(text) else {
            return Ok(None);
        };
        let result = self
            .api
            .send(turn.session_id.as_deref(), &turn.text)
            .await;
        self.complete(result).map(Some)
    }
}
