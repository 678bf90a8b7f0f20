use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{CrawlerError, Result};

pub(crate) const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const MAX_RETRIES: usize = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);

/// Minimal client for OpenAI-compatible `/chat/completions` endpoints
#[derive(Clone)]
pub struct OpenAIClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAIClient {
    pub fn new(api_key: String, request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: build_http_client(request_timeout)?,
        })
    }

    pub fn set_request_timeout(&mut self, request_timeout: Duration) -> Result<()> {
        self.http = build_http_client(request_timeout)?;
        Ok(())
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a completion request, retrying 429 and 5xx responses with backoff.
    pub async fn chat_completion(&self, body: &Value) -> Result<Value> {
        let request_url = build_chat_url(&self.base_url);
        let mut attempt = 0;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            let response = self
                .http
                .post(&request_url)
                .bearer_auth(&self.api_key)
                .header("HTTP-Referer", "https://github.com/investor-crawler/investor-crawler")
                .header("X-Title", "investor-crawler")
                .json(body)
                .send()
                .await
                .map_err(|err| {
                    if err.is_timeout() {
                        CrawlerError::Timeout(format!("completion request timed out: {err}"))
                    } else {
                        CrawlerError::Http(format!("completion request failed: {err}"))
                    }
                })?;

            let status = response.status();
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let response_text = response
                .text()
                .await
                .map_err(|err| CrawlerError::Http(format!("failed to read response: {err}")))?;

            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = retry_after.unwrap_or(backoff);
                if attempt < MAX_RETRIES {
                    warn!(attempt = attempt + 1, wait_ms = wait.as_millis() as u64, "rate limited, retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                    backoff *= 2;
                    continue;
                }

                return Err(CrawlerError::RateLimit {
                    retry_after: wait.as_secs().max(1),
                });
            }

            if status.is_server_error() && attempt < MAX_RETRIES {
                warn!(attempt = attempt + 1, %status, "server error, retrying");
                tokio::time::sleep(backoff).await;
                attempt += 1;
                backoff *= 2;
                continue;
            }

            let response_json: Value = match serde_json::from_str(&response_text) {
                Ok(value) => value,
                Err(err) if status.is_success() => {
                    return Err(CrawlerError::Api(format!("invalid JSON in response: {err}")))
                }
                Err(_) => {
                    return Err(CrawlerError::Api(format!(
                        "HTTP {}: {}",
                        status,
                        response_text.trim()
                    )))
                }
            };

            if let Some(error) = response_json.get("error").filter(|e| !e.is_null()) {
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                return Err(CrawlerError::Api(if status.is_success() {
                    message
                } else {
                    format!("HTTP {}: {}", status, message)
                }));
            }

            if !status.is_success() {
                return Err(CrawlerError::Api(format!("HTTP {}: {}", status, response_text.trim())));
            }

            return Ok(response_json);
        }
    }
}

fn build_http_client(request_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(request_timeout)
        .build()
        .map_err(|err| CrawlerError::Http(format!("failed to build HTTP client: {err}")))
}

fn build_chat_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}

#[derive(Clone, Debug)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Value>,
    tools: Vec<Value>,
    tool_choice: Option<Value>,
    max_tokens: Option<u32>,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Value>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            tool_choice: None,
            max_tokens: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: Value) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn into_value(self) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.messages,
        });

        if !self.tools.is_empty() {
            body["tools"] = Value::Array(self.tools);
        }

        if let Some(tool_choice) = self.tool_choice {
            body["tool_choice"] = tool_choice;
        }

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_url_is_appended_once() {
        assert_eq!(
            build_chat_url("https://openrouter.ai/api/v1/"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(
            build_chat_url("http://localhost:1234/v1/chat/completions"),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn request_body_omits_unset_fields() {
        let body = ChatCompletionRequest::new("openai/gpt-4.1-mini", vec![json!({"role": "user"})])
            .into_value();
        assert_eq!(body["model"], "openai/gpt-4.1-mini");
        assert!(body.get("tools").is_none());
        assert!(body.get("max_tokens").is_none());

        let body = ChatCompletionRequest::new("m", Vec::new())
            .with_tools(vec![json!({"type": "function"})])
            .with_tool_choice(json!("auto"))
            .with_max_tokens(Some(512))
            .into_value();
        assert_eq!(body["tools"].as_array().unwrap().len(), 1);
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["max_tokens"], 512);
    }

    #[tokio::test]
    async fn api_errors_surface_their_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"message": "invalid api key"}}"#)
            .create_async()
            .await;

        let mut client = OpenAIClient::new("bad-key".to_string(), Duration::from_secs(5)).unwrap();
        client.set_base_url(server.url());

        let err = client.chat_completion(&json!({})).await.unwrap_err();
        assert!(matches!(err, CrawlerError::Api(_)));
        assert!(err.to_string().contains("invalid api key"));
        mock.assert_async().await;
    }
}
