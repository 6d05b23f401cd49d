use crate::api::error::ClientError;
use crate::api::logging::emit_debug_request;
use crate::config::Config;
use crate::types::{ChatMessage, HistorySnapshot};
use crate::util::is_local_endpoint_url;
use serde_json::Value;
#[cfg(test)]
use std::sync::Arc;
use std::time::Duration;

/// Test seam: scripted stand-in for the HTTP backend.
#[cfg(test)]
pub trait MockBackend: Send + Sync {
    fn fetch_history(&self) -> Result<Vec<ChatMessage>, ClientError>;
    fn send_prompt(&self, prompt: &str) -> Result<(), ClientError>;
    fn confirm(&self) -> Result<(), ClientError>;
    fn start_new_chat(&self) -> Result<(), ClientError>;
}

/// HTTP relay to the agent backend. Every call is bounded by the configured
/// request timeout and resolves to a typed `ClientError` on failure.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    #[cfg(test)]
    mock_backend: Option<Arc<dyn MockBackend>>,
}

impl BackendClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.backend_url.clone(),
            request_timeout: config.request_timeout,
            #[cfg(test)]
            mock_backend: None,
        }
    }

    #[cfg(test)]
    pub fn new_mock(mock_backend: Arc<dyn MockBackend>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout: Duration::from_millis(15_000),
            mock_backend: Some(mock_backend),
        }
    }

    /// GET the full conversation snapshot. A missing `messages` field in the
    /// envelope reads as an empty conversation.
    pub async fn fetch_history(&self) -> Result<Vec<ChatMessage>, ClientError> {
        #[cfg(test)]
        {
            if let Some(mock) = &self.mock_backend {
                return mock.fetch_history();
            }
        }

        const FALLBACK: &str = "Failed to fetch conversation history";
        let url = self.endpoint("get-conversation-history");
        emit_debug_request("GET", &url);

        let response = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|error| map_request_error(&error, &url, FALLBACK))?;
        let response = ensure_success(response, FALLBACK).await?;

        let snapshot: HistorySnapshot = response
            .json()
            .await
            .map_err(|error| map_request_error(&error, &url, FALLBACK))?;
        Ok(snapshot.messages)
    }

    /// POST a user prompt. Empty-after-trim input fails fast with
    /// `InvalidArgument` before any network traffic.
    pub async fn send_prompt(&self, prompt: &str) -> Result<(), ClientError> {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return Err(ClientError::InvalidArgument(
                "message must not be empty".to_string(),
            ));
        }

        #[cfg(test)]
        {
            if let Some(mock) = &self.mock_backend {
                return mock.send_prompt(trimmed);
            }
        }

        let url = self.endpoint("send-prompt");
        emit_debug_request("POST", &url);
        self.post_ack(
            self.http.post(&url).query(&[("prompt", trimmed)]),
            &url,
            "Failed to send message",
        )
        .await
    }

    /// POST approval for the tool run the agent proposed.
    pub async fn confirm(&self) -> Result<(), ClientError> {
        #[cfg(test)]
        {
            if let Some(mock) = &self.mock_backend {
                return mock.confirm();
            }
        }

        let url = self.endpoint("confirm");
        emit_debug_request("POST", &url);
        self.post_ack(self.http.post(&url), &url, "Failed to confirm action")
            .await
    }

    /// POST a fresh workflow start; the backend re-seeds itself with its
    /// goal's starter prompt.
    pub async fn start_new_chat(&self) -> Result<(), ClientError> {
        #[cfg(test)]
        {
            if let Some(mock) = &self.mock_backend {
                return mock.start_new_chat();
            }
        }

        let url = self.endpoint("start-workflow");
        emit_debug_request("POST", &url);
        self.post_ack(self.http.post(&url), &url, "Failed to start a new chat")
            .await
    }

    async fn post_ack(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        fallback: &str,
    ) -> Result<(), ClientError> {
        let response = request
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|error| map_request_error(&error, url, fallback))?;
        ensure_success(response, fallback).await?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

fn map_request_error(error: &reqwest::Error, request_url: &str, fallback: &str) -> ClientError {
    if error.is_timeout() {
        return ClientError::RequestTimeout;
    }
    if error.is_connect() {
        let message = if is_local_endpoint_url(request_url) {
            format!(
                "cannot reach local backend '{request_url}'. Start the agent service or update ATTACHE_BACKEND_URL."
            )
        } else {
            format!("cannot reach backend '{request_url}'")
        };
        return ClientError::Api {
            status: 500,
            message,
        };
    }

    ClientError::Api {
        status: error.status().map_or(500, |status| status.as_u16()),
        message: fallback.to_string(),
    }
}

/// Non-2xx responses become `Api{status, message}`, preferring the JSON
/// error body's `message`/`detail` over the per-operation fallback.
async fn ensure_success(
    response: reqwest::Response,
    fallback: &str,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| extract_error_message(&body))
        .unwrap_or_else(|| fallback.to_string());
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

fn extract_error_message(body: &Value) -> Option<String> {
    ["message", "detail"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_client::MockBackendScript;
    use serde_json::json;

    #[test]
    fn test_endpoint_joins_base_and_path() {
        let config = Config {
            backend_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_millis(15_000),
            poll_interval: Duration::from_millis(500),
        };
        let client = BackendClient::new(&config);
        assert_eq!(
            client.endpoint("get-conversation-history"),
            "http://localhost:8000/get-conversation-history"
        );
    }

    #[test]
    fn test_extract_error_message_reads_message_then_detail() {
        assert_eq!(
            extract_error_message(&json!({"message": "boom"})).as_deref(),
            Some("boom")
        );
        assert_eq!(
            extract_error_message(&json!({"detail": "workflow worker unavailable"})).as_deref(),
            Some("workflow worker unavailable")
        );
        assert_eq!(extract_error_message(&json!({"message": "  "})), None);
        assert_eq!(extract_error_message(&json!({"other": "x"})), None);
    }

    #[tokio::test]
    async fn test_send_prompt_rejects_blank_input_without_network_call() {
        let script = Arc::new(MockBackendScript::default());
        let client = BackendClient::new_mock(Arc::clone(&script) as Arc<dyn MockBackend>);

        for blank in ["", "   ", "\n\t"] {
            let error = client
                .send_prompt(blank)
                .await
                .expect_err("blank prompt must be rejected");
            assert_eq!(error.status(), 400);
            assert!(matches!(error, ClientError::InvalidArgument(_)));
        }

        assert!(script.sent_prompts().is_empty());
    }

    #[tokio::test]
    async fn test_send_prompt_forwards_trimmed_text() {
        let script = Arc::new(MockBackendScript::default());
        let client = BackendClient::new_mock(Arc::clone(&script) as Arc<dyn MockBackend>);

        client
            .send_prompt("  Book me a train  ")
            .await
            .expect("prompt should send");
        assert_eq!(script.sent_prompts(), vec!["Book me a train".to_string()]);
    }
}
