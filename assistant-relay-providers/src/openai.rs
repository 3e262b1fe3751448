//! OpenAI Assistants API (v2) HTTP client implementation

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use assistant_relay_core::config::AssistantConfig;

use crate::base::{
    Assistant, AssistantBackend, NewMessage, ProviderError, ProviderResult, Run, RunRequest,
    Thread, ThreadMessage,
};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

#[derive(Debug, Serialize)]
struct CreateThreadRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    messages: Vec<NewMessage>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Serialize)]
struct UpdateAssistantRequest {
    tools: Vec<serde_json::Value>,
    tool_resources: serde_json::Value,
}

/// Error envelope returned by the API on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type")]
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Assistants API client
pub struct OpenAiAssistantsClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    extra_headers: HashMap<String, String>,
}

impl OpenAiAssistantsClient {
    /// Create a new client
    pub fn new(
        api_key: Option<String>,
        api_base: Option<String>,
        extra_headers: Option<HashMap<String, String>>,
        timeout: Duration,
    ) -> Self {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        let api_base = api_base
            .filter(|base| !base.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_base,
            api_key,
            extra_headers: extra_headers.unwrap_or_default(),
        }
    }

    /// Build a client from the assistant section of the configuration
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(
            Some(config.api_key.clone()),
            Some(config.api_base.clone()),
            Some(config.extra_headers.clone()),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Join path segments onto the API base, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| ProviderError::ConfigError(format!("invalid api_base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                ProviderError::ConfigError(format!("api_base cannot be a base: {}", self.api_base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn apply_headers(&self, mut req_builder: RequestBuilder) -> ProviderResult<RequestBuilder> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::ConfigError("API key not configured".to_string()))?;

        req_builder = req_builder
            .bearer_auth(api_key)
            .header(BETA_HEADER.0, BETA_HEADER.1);

        for (key, value) in &self.extra_headers {
            req_builder = req_builder.header(key, value);
        }

        Ok(req_builder)
    }

    async fn send<T: DeserializeOwned>(&self, req_builder: RequestBuilder) -> ProviderResult<T> {
        let response = self.apply_headers(req_builder)?.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        Ok(serde_json::from_str(&body)?)
    }

    fn parse_error(status: StatusCode, body: &str) -> ProviderError {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => {
                let code = envelope.error.code.and_then(|code| match code {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                });
                ProviderError::ApiError {
                    status: status.as_u16(),
                    message: envelope
                        .error
                        .message
                        .unwrap_or_else(|| format!("HTTP {}", status)),
                    code,
                    error_type: envelope.error.error_type,
                }
            }
            Err(_) => {
                warn!("Unstructured error body from assistants API (HTTP {})", status);
                let message = if body.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.trim().to_string()
                };
                ProviderError::ApiError {
                    status: status.as_u16(),
                    message,
                    code: None,
                    error_type: None,
                }
            }
        }
    }
}

#[async_trait]
impl AssistantBackend for OpenAiAssistantsClient {
    async fn create_thread(&self, messages: Vec<NewMessage>) -> ProviderResult<Thread> {
        let url = self.endpoint(&["threads"])?;
        debug!("Creating thread with {} initial message(s)", messages.len());
        self.send(self.client.post(url).json(&CreateThreadRequest { messages }))
            .await
    }

    async fn add_message(
        &self,
        thread_id: &str,
        message: NewMessage,
    ) -> ProviderResult<ThreadMessage> {
        let url = self.endpoint(&["threads", thread_id, "messages"])?;
        debug!("Appending message to thread {}", thread_id);
        self.send(self.client.post(url).json(&message)).await
    }

    async fn create_run(&self, thread_id: &str, request: RunRequest) -> ProviderResult<Run> {
        let url = self.endpoint(&["threads", thread_id, "runs"])?;
        debug!(
            "Starting run on thread {} with assistant {}",
            thread_id, request.assistant_id
        );
        self.send(self.client.post(url).json(&request)).await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> ProviderResult<Run> {
        let url = self.endpoint(&["threads", thread_id, "runs", run_id])?;
        self.send(self.client.get(url)).await
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> ProviderResult<Vec<ThreadMessage>> {
        let url = self.endpoint(&["threads", thread_id, "messages"])?;
        let limit = limit.to_string();
        let page: ListResponse<ThreadMessage> = self
            .send(
                self.client
                    .get(url)
                    .query(&[("limit", limit.as_str()), ("order", "desc")]),
            )
            .await?;
        Ok(page.data)
    }

    async fn retrieve_assistant(&self, assistant_id: &str) -> ProviderResult<Assistant> {
        let url = self.endpoint(&["assistants", assistant_id])?;
        self.send(self.client.get(url)).await
    }

    async fn enable_file_search(
        &self,
        assistant_id: &str,
        vector_store_ids: Vec<String>,
    ) -> ProviderResult<Assistant> {
        let url = self.endpoint(&["assistants", assistant_id])?;
        let request = UpdateAssistantRequest {
            tools: vec![serde_json::json!({ "type": "file_search" })],
            tool_resources: serde_json::json!({
                "file_search": { "vector_store_ids": vector_store_ids }
            }),
        };
        self.send(self.client.post(url).json(&request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{MessageContent, Role, RunStatus};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client_for(server: &Server, api_key: Option<&str>) -> OpenAiAssistantsClient {
        OpenAiAssistantsClient::new(
            api_key.map(ToString::to_string),
            Some(format!("{}/v1", server.url())),
            Some(HashMap::from([(
                "OpenAI-Organization".to_string(),
                "org_test".to_string(),
            )])),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = OpenAiAssistantsClient::new(
            Some("k".to_string()),
            Some("https://example.test/v1/".to_string()),
            None,
            Duration::from_secs(1),
        );
        let url = client.endpoint(&["threads", "a/b", "messages"]).unwrap();
        assert_eq!(url.as_str(), "https://example.test/v1/threads/a%2Fb/messages");
    }

    #[test]
    fn test_blank_base_falls_back_to_default() {
        let client =
            OpenAiAssistantsClient::new(None, Some("  ".to_string()), None, Duration::from_secs(1));
        assert_eq!(client.api_base(), DEFAULT_API_BASE);
    }

    #[tokio::test]
    async fn test_create_thread_sends_initial_message_and_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/threads")
            .match_header("authorization", "Bearer sk-test")
            .match_header("openai-beta", "assistants=v2")
            .match_header("openai-organization", "org_test")
            .match_body(Matcher::Json(json!({
                "messages": [{ "role": "user", "content": "hello" }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"thread_abc","object":"thread","created_at":1}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("sk-test"));
        let thread = client
            .create_thread(vec![NewMessage::user("hello")])
            .await
            .unwrap();

        assert_eq!(thread.id, "thread_abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_empty_thread_sends_empty_object() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/threads")
            .match_body(Matcher::Json(json!({})))
            .with_status(200)
            .with_body(r#"{"id":"thread_empty"}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("sk-test"));
        let thread = client.create_thread(Vec::new()).await.unwrap();

        assert_eq!(thread.id, "thread_empty");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_run_passes_additional_instructions() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/threads/thread_1/runs")
            .match_body(Matcher::Json(json!({
                "assistant_id": "asst_1",
                "additional_instructions": "do not greet again"
            })))
            .with_status(200)
            .with_body(r#"{"id":"run_1","thread_id":"thread_1","status":"queued"}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("sk-test"));
        let run = client
            .create_run(
                "thread_1",
                RunRequest {
                    assistant_id: "asst_1".to_string(),
                    additional_instructions: Some("do not greet again".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(run.id, "run_1");
        assert_eq!(run.status, RunStatus::Queued);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_messages_requests_newest_first_page() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/threads/thread_1/messages")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "50".into()),
                Matcher::UrlEncoded("order".into(), "desc".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"object":"list","data":[
                    {"id":"msg_2","role":"assistant","content":[{"type":"text","text":{"value":"hi there","annotations":[]}}]},
                    {"id":"msg_1","role":"user","content":[{"type":"text","text":{"value":"hello","annotations":[]}}]}
                ],"has_more":false}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server, Some("sk-test"));
        let messages = client.list_messages("thread_1", 50).await.unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, vec![MessageContent::text("hi there")]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_envelope_is_structured() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v1/threads/thread_missing/runs/run_1")
            .with_status(404)
            .with_body(
                r#"{"error":{"message":"No thread found with id 'thread_missing'.","type":"invalid_request_error","param":null,"code":null}}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server, Some("sk-test"));
        let err = client
            .retrieve_run("thread_missing", "run_1")
            .await
            .unwrap_err();

        match err {
            ProviderError::ApiError {
                status,
                message,
                code,
                error_type,
            } => {
                assert_eq!(status, 404);
                assert!(message.contains("No thread found"));
                assert_eq!(code, None);
                assert_eq!(error_type.as_deref(), Some("invalid_request_error"));
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unstructured_error_body_keeps_raw_text() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v1/assistants/asst_1")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let client = client_for(&server, Some("sk-test"));
        let err = client.retrieve_assistant("asst_1").await.unwrap_err();

        assert_eq!(err.remote_status(), Some(502));
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/threads")
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server, None);
        let err = client.create_thread(Vec::new()).await.unwrap_err();

        assert!(matches!(err, ProviderError::ConfigError(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_success_body_is_json_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/threads")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = client_for(&server, Some("sk-test"));
        let err = client.create_thread(Vec::new()).await.unwrap_err();
        assert!(matches!(err, ProviderError::JsonError(_)));
    }

    #[tokio::test]
    async fn test_enable_file_search_sends_vector_stores() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/assistants/asst_1")
            .match_body(Matcher::Json(json!({
                "tools": [{ "type": "file_search" }],
                "tool_resources": { "file_search": { "vector_store_ids": ["vs_1"] } }
            })))
            .with_status(200)
            .with_body(
                r#"{"id":"asst_1","model":"gpt-4o","tools":[{"type":"file_search"}],
                    "tool_resources":{"file_search":{"vector_store_ids":["vs_1"]}}}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server, Some("sk-test"));
        let assistant = client
            .enable_file_search("asst_1", vec!["vs_1".to_string()])
            .await
            .unwrap();

        assert_eq!(assistant.tool_types(), vec!["file_search".to_string()]);
        mock.assert_async().await;
    }
}
