//! Scripted in-memory backend used by the proxy and handler tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use assistant_relay_providers::{
    Assistant, AssistantBackend, MessageContent, NewMessage, ProviderError, ProviderResult, Role,
    Run, RunRequest, RunStatus, Thread, ThreadMessage,
};

/// Fake backend that records every call and replays scripted run statuses.
pub struct ScriptedBackend {
    calls: Mutex<Vec<String>>,
    run_requests: Mutex<Vec<RunRequest>>,
    initial_status: RunStatus,
    statuses: Mutex<VecDeque<RunStatus>>,
    messages: Mutex<Vec<ThreadMessage>>,
    next_thread: AtomicUsize,
    fail_add_message: Mutex<Option<ProviderError>>,
    instructions: String,
}

impl ScriptedBackend {
    /// A backend whose runs start `queued` and complete on the first poll
    pub fn completing() -> Self {
        Self::with_statuses(RunStatus::Queued, vec![RunStatus::Completed])
    }

    /// `initial` is returned by run creation; `polled` are returned by
    /// successive status reads, the last one repeating forever.
    pub fn with_statuses(initial: RunStatus, polled: Vec<RunStatus>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            run_requests: Mutex::new(Vec::new()),
            initial_status: initial,
            statuses: Mutex::new(polled.into()),
            messages: Mutex::new(Vec::new()),
            next_thread: AtomicUsize::new(1),
            fail_add_message: Mutex::new(None),
            instructions: "Be helpful.".to_string(),
        }
    }

    /// Messages returned by `list_messages`, newest first
    pub fn with_messages(self, messages: Vec<ThreadMessage>) -> Self {
        *self.messages.lock().unwrap() = messages;
        self
    }

    pub fn with_assistant_reply(self, text: &str) -> Self {
        self.with_messages(vec![
            ThreadMessage::new("msg_2", Role::Assistant, vec![MessageContent::text(text)]),
            ThreadMessage::new("msg_1", Role::User, vec![MessageContent::text("hello")]),
        ])
    }

    /// Instructions reported by `retrieve_assistant`
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn failing_add_message(self, error: ProviderError) -> Self {
        *self.fail_add_message.lock().unwrap() = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(name))
            .count()
    }

    pub fn run_requests(&self) -> Vec<RunRequest> {
        self.run_requests.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AssistantBackend for ScriptedBackend {
    async fn create_thread(&self, messages: Vec<NewMessage>) -> ProviderResult<Thread> {
        let n = self.next_thread.fetch_add(1, Ordering::SeqCst);
        let first = messages
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.record(format!("create_thread:{}", first));
        Ok(Thread {
            id: format!("thread_{}", n),
        })
    }

    async fn add_message(
        &self,
        thread_id: &str,
        message: NewMessage,
    ) -> ProviderResult<ThreadMessage> {
        self.record(format!("add_message:{}:{}", thread_id, message.content));
        if let Some(error) = self.fail_add_message.lock().unwrap().take() {
            return Err(error);
        }
        Ok(ThreadMessage::new(
            "msg_new",
            message.role,
            vec![MessageContent::text(message.content)],
        ))
    }

    async fn create_run(&self, thread_id: &str, request: RunRequest) -> ProviderResult<Run> {
        self.record(format!("create_run:{}", thread_id));
        self.run_requests.lock().unwrap().push(request);
        Ok(Run {
            id: "run_1".to_string(),
            thread_id: thread_id.to_string(),
            status: self.initial_status.clone(),
            last_error: None,
        })
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> ProviderResult<Run> {
        self.record(format!("retrieve_run:{}:{}", thread_id, run_id));
        let mut statuses = self.statuses.lock().unwrap();
        let next = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        let status = next.unwrap_or(RunStatus::Completed);
        Ok(Run {
            id: run_id.to_string(),
            thread_id: thread_id.to_string(),
            status,
            last_error: None,
        })
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> ProviderResult<Vec<ThreadMessage>> {
        self.record(format!("list_messages:{}:{}", thread_id, limit));
        let messages = self.messages.lock().unwrap();
        Ok(messages.iter().take(limit as usize).cloned().collect())
    }

    async fn retrieve_assistant(&self, assistant_id: &str) -> ProviderResult<Assistant> {
        self.record(format!("retrieve_assistant:{}", assistant_id));
        Ok(serde_json::from_value(serde_json::json!({
            "id": assistant_id,
            "name": "Test Assistant",
            "model": "gpt-4o",
            "instructions": self.instructions,
            "tools": [{ "type": "code_interpreter" }]
        }))?)
    }

    async fn enable_file_search(
        &self,
        assistant_id: &str,
        vector_store_ids: Vec<String>,
    ) -> ProviderResult<Assistant> {
        self.record(format!(
            "enable_file_search:{}:{}",
            assistant_id,
            vector_store_ids.join(",")
        ));
        Ok(serde_json::from_value(serde_json::json!({
            "id": assistant_id,
            "model": "gpt-4o",
            "tools": [{ "type": "file_search" }],
            "tool_resources": { "file_search": { "vector_store_ids": vector_store_ids } }
        }))?)
    }
}
