//! Hosted assistant service integrations for assistant-relay
//!
//! This crate defines the [`AssistantBackend`] abstraction over a remote
//! thread/run/message service and a reqwest implementation for the
//! OpenAI Assistants API.

pub mod base;
pub mod openai;

pub use base::{
    Assistant, AssistantBackend, AssistantTool, MessageContent, MessageText, NewMessage,
    ProviderError, ProviderResult, Role, Run, RunError, RunRequest, RunStatus, Thread,
    ThreadMessage,
};
pub use openai::OpenAiAssistantsClient;
