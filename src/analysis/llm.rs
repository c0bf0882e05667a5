use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use super::prompt::SectionPrompt;
use super::{Backend, BackendError};
use crate::config::LlmConfig;

/// A message in a chat conversation with the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// OpenAI-compatible chat completions client.
///
/// Works with any provider that exposes `/v1/chat/completions`
/// (OpenAI, Ollama, vLLM, LiteLLM, ...). One request per call; retries are
/// left to the caller.
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BackendError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "response_format": { "type": "json_object" },
        })
    }

    /// Send a chat completion request and return the assistant's text.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        let mut request = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json");
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .json(&self.request_body(messages))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Unavailable("request timed out".to_string())
                } else {
                    BackendError::Unavailable(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(BackendError::RateLimited { retry_after_secs });
        }
        if status.is_server_error() {
            return Err(BackendError::Unavailable(format!("LLM API error {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response
            .text()
            .await
            .map_err(|e| BackendError::Unavailable(format!("failed to read response: {e}")))?;
        let body: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            BackendError::InvalidResponse(format!(
                "failed to parse response: {e} ({} bytes received)",
                raw.len()
            ))
        })?;
        extract_content(&body, raw.len())
    }
}

/// Pull `choices[0].message.content` out of a completions response.
fn extract_content(body: &serde_json::Value, raw_len: usize) -> Result<String, BackendError> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            BackendError::InvalidResponse(format!(
                "unexpected response structure ({raw_len} bytes received)"
            ))
        })
}

#[async_trait]
impl Backend for LlmClient {
    #[instrument(skip(self, prompt), fields(section = %prompt.section, model = %self.config.model))]
    async fn complete(&self, prompt: &SectionPrompt) -> Result<String, BackendError> {
        let messages = [
            ChatMessage {
                role: Role::System,
                content: prompt.system.clone(),
            },
            ChatMessage {
                role: Role::User,
                content: prompt.user.clone(),
            },
        ];
        debug!(prompt_bytes = prompt.user.len(), "sending chat completion");
        let content = self.chat(&messages).await?;
        debug!(response_bytes = content.len(), "received chat completion");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction_succeeds() {
        let client = LlmClient::new(&LlmConfig::default()).unwrap();
        assert_eq!(client.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let config = LlmConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_request_body_shape() {
        let client = LlmClient::new(&LlmConfig::default()).unwrap();
        let body = client.request_body(&[ChatMessage {
            role: Role::System,
            content: "hello".to_string(),
        }]);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_extract_content() {
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"findings\": []}" } }]
        });
        assert_eq!(extract_content(&body, 0).unwrap(), "{\"findings\": []}");

        let err = extract_content(&serde_json::json!({ "error": "nope" }), 17).unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(ref m) if m.contains("17 bytes received")));
    }

    /// Serve one HTTP response on a local port and return its base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            // Read until the end of the JSON request body.
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if let Some(end) = find_header_end(&request) {
                    let headers = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
                    let length = headers
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "{status_line}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    fn find_header_end(bytes: &[u8]) -> Option<usize> {
        bytes.windows(4).position(|w| w == b"\r\n\r\n")
    }

    #[tokio::test]
    async fn test_non_json_body_reports_size() {
        let body = "<html>oops gateway page</html>";
        let config = LlmConfig {
            base_url: serve_once("HTTP/1.1 200 OK", body).await,
            request_timeout_secs: 5,
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        let err = client.chat(&[]).await.unwrap_err();
        match err {
            BackendError::InvalidResponse(message) => {
                assert!(message.contains(&format!("({} bytes received)", body.len())));
            }
            other => panic!("expected InvalidResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_fails_section_as_malformed() {
        use crate::analysis::{self, AnalysisOptions, FailureKind, SectionKind, SectionResult};
        use crate::chunk::{self, ContentBudget, FileOrder};
        use std::collections::BTreeSet;
        use tokio_util::sync::CancellationToken;

        let config = LlmConfig {
            base_url: serve_once("HTTP/1.1 200 OK", "<html>oops gateway page</html>").await,
            request_timeout_secs: 5,
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        let pr = analysis::tests::test_pull_request();
        let plan = chunk::plan(&pr.files, &ContentBudget::new(1000, 0), FileOrder::SmallestFirst)
            .unwrap();
        let sections = BTreeSet::from([SectionKind::Quality]);
        let results = analysis::run(
            &pr,
            &plan,
            &sections,
            &client,
            &AnalysisOptions::default(),
            &CancellationToken::new(),
        )
        .await;
        match &results[&SectionKind::Quality] {
            SectionResult::Failure(failure) => {
                assert_eq!(failure.kind, FailureKind::MalformedResponse);
                assert!(failure.message.contains("bytes received"));
            }
            other => panic!("expected a failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        let err = client.chat(&[]).await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }
}
