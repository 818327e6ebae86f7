use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{AnalyzerConfig, LlmProvider};
use crate::error::{AnalyzerError, Result};

/// Role of a message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Request to the LLM.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl LlmRequest {
    /// One system prompt plus one user turn.
    pub fn single_turn(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            messages: vec![Message {
                role: Role::User,
                content: prompt.into(),
            }],
            max_tokens: 2000,
            temperature: 0.7,
        }
    }

    pub fn with_limits(mut self, max_tokens: u32, temperature: f64) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

/// Response from the LLM.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            input_tokens: 0,
            output_tokens: 0,
        }
    }
}

/// Trait for LLM clients, enabling mocking in tests.
///
/// Implementations make exactly one request per call and classify failures
/// as transient or fatal. Retrying is the caller's decision.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

/// Build the client matching the configured provider.
pub fn create_client(config: &AnalyzerConfig) -> Result<Arc<dyn LlmClient>> {
    Ok(match config.provider {
        LlmProvider::OpenRouter | LlmProvider::OpenAi => Arc::new(ChatCompletionsClient::new(config)?),
        LlmProvider::Anthropic => Arc::new(AnthropicClient::new(config)?),
    })
}

fn build_http(config: &AnalyzerConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| AnalyzerError::Config(format!("failed to build HTTP client: {e}")))
}

/// Classify a transport-level failure.
fn request_error(err: reqwest::Error) -> AnalyzerError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        AnalyzerError::transient(format!("LLM request failed: {err}"))
    } else {
        AnalyzerError::fatal(None, format!("LLM request failed: {err}"))
    }
}

/// Classify a non-success HTTP status. `message` is the provider's error text.
fn status_error(status: StatusCode, retry_after: Option<u64>, message: String) -> AnalyzerError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return AnalyzerError::Transient {
            message: format!("rate limited (status 429): {message}"),
            retry_after_secs: retry_after,
        };
    }
    if status.is_server_error() {
        return AnalyzerError::transient(format!("server error (status {}): {message}", status.as_u16()));
    }
    AnalyzerError::fatal(Some(status.as_u16()), message)
}

fn retry_after_header(resp: &reqwest::Response) -> Option<u64> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

async fn read_error(resp: reqwest::Response) -> (StatusCode, Option<u64>, String) {
    let status = resp.status();
    let retry_after = retry_after_header(&resp);
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|e| e.error)
        .map(|e| e.message)
        .unwrap_or(body);
    (status, retry_after, message)
}

/// OpenAI-compatible chat completions client (OpenRouter, OpenAI).
///
/// NOTE: Do NOT derive `Debug` on this struct, `api_key` would be exposed.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<&'a Message>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl ChatCompletionsClient {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        Ok(Self {
            http: build_http(config)?,
            api_key: config.api_key.clone(),
            api_base_url: config.api_base_url.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.api_base_url);

        let system = Message {
            role: Role::System,
            content: request.system.clone(),
        };
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(&system);
        }
        messages.extend(request.messages.iter());

        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(model = %self.model, "sending chat completion request");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        if !resp.status().is_success() {
            let (status, retry_after, message) = read_error(resp).await;
            warn!(status = status.as_u16(), "LLM request returned error status");
            return Err(status_error(status, retry_after, message));
        }

        let api_response: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AnalyzerError::fatal(None, format!("undecodable completion: {e}")))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            warn!("LLM returned empty response");
            return Err(AnalyzerError::transient("LLM returned an empty completion"));
        }

        let (input_tokens, output_tokens) = api_response
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            input_tokens,
            output_tokens,
        })
    }
}

/// Anthropic messages API client.
///
/// NOTE: Do NOT derive `Debug` on this struct, `api_key` would be exposed.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model: String,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    system: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

impl AnthropicClient {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        Ok(Self {
            http: build_http(config)?,
            api_key: config.api_key.clone(),
            api_base_url: config.api_base_url.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/v1/messages", self.api_base_url);

        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: &request.messages,
        };

        debug!(model = %self.model, "sending messages request");
        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        if !resp.status().is_success() {
            let (status, retry_after, message) = read_error(resp).await;
            warn!(status = status.as_u16(), "LLM request returned error status");
            return Err(status_error(status, retry_after, message));
        }

        let api_response: AnthropicResponse = resp
            .json()
            .await
            .map_err(|e| AnalyzerError::fatal(None, format!("undecodable completion: {e}")))?;

        let content = api_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if content.trim().is_empty() {
            warn!("LLM returned empty response");
            return Err(AnalyzerError::transient("LLM returned an empty completion"));
        }

        Ok(LlmResponse {
            content,
            input_tokens: api_response.usage.input_tokens,
            output_tokens: api_response.usage.output_tokens,
        })
    }
}

/// Test utilities for the LLM client.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Mock LLM client for testing. Returns pre-configured outcomes in order,
    /// then keeps returning `fallback` once the script runs out.
    pub struct MockLlmClient {
        responses: Mutex<VecDeque<Result<LlmResponse>>>,
        fallback: Option<Result<LlmResponse>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<Result<LlmResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                fallback: None,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_response(content: &str) -> Self {
            Self::new(vec![Ok(LlmResponse::text(content))])
        }

        /// Answers every call with the same content.
        pub fn repeating(content: &str) -> Self {
            let mut mock = Self::new(Vec::new());
            mock.fallback = Some(Ok(LlmResponse::text(content)));
            mock
        }

        /// Fails every call with the same error.
        pub fn failing(error: AnalyzerError) -> Self {
            let mut mock = Self::new(Vec::new());
            mock.fallback = Some(Err(error));
            mock
        }

        /// Sleep before answering, to simulate a slow endpoint.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self
                .responses
                .lock()
                .map_err(|e| AnalyzerError::fatal(None, format!("mock lock poisoned: {e}")))?
                .pop_front();
            match next {
                Some(outcome) => outcome,
                None => self
                    .fallback
                    .clone()
                    .unwrap_or_else(|| Err(AnalyzerError::transient("mock script exhausted"))),
            }
        }
    }
}
