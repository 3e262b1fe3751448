use serde::{Deserialize, Serialize};
use std::sync::Arc;

use assistant_relay_core::config::Config;
use assistant_relay_providers::AssistantBackend;

use crate::proxy::{ProxyConfig, SessionProxy};

#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<SessionProxy>,
    pub backend: Arc<dyn AssistantBackend>,
    pub info: Arc<RelayInfo>,
}

impl AppState {
    pub fn new(backend: Arc<dyn AssistantBackend>, config: &Config) -> Self {
        let proxy = SessionProxy::new(backend.clone(), ProxyConfig::from_config(config));
        Self {
            proxy: Arc::new(proxy),
            backend,
            info: Arc::new(RelayInfo::from_config(config)),
        }
    }
}

/// Static facts about the running relay, captured at startup
#[derive(Debug, Clone)]
pub struct RelayInfo {
    pub has_key: bool,
    pub key_length: usize,
    pub assistant_id: String,
    pub api_base: String,
    pub vector_store_ids: Vec<String>,
}

impl RelayInfo {
    pub fn from_config(config: &Config) -> Self {
        let key = config.assistant.api_key.trim();
        Self {
            has_key: !key.is_empty(),
            key_length: key.chars().count(),
            assistant_id: config.assistant.assistant_id.clone(),
            api_base: config.assistant.api_base.clone(),
            vector_store_ids: config.assistant.vector_store_ids.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub user: String,
    #[serde(default, alias = "threadId", alias = "thread_id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagResponse {
    pub has_key: bool,
    pub key_length: usize,
    pub session_backend_id: String,
    pub api_base: String,
    pub version: String,
    pub platform: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantInfo {
    pub id: String,
    pub name: Option<String>,
    pub model: String,
    pub instructions_length: usize,
    pub instructions_preview: String,
    pub tools: Vec<String>,
    pub vector_store_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSearchResponse {
    pub success: bool,
    pub tools: Vec<String>,
}
