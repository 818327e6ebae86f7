//! LLM provider clients against a mocked HTTP endpoint.

mod common;

use std::time::Duration;

use common::{article, VALID_COMPLETION};
use papersift_analyzer::analysis::{AnthropicClient, ChatCompletionsClient};
use papersift_analyzer::{
    AnalyzeOptions, Analyzer, AnalyzerConfig, AnalyzerError, ErrorKind, LlmClient, LlmProvider,
    LlmRequest,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, provider: LlmProvider) -> AnalyzerConfig {
    AnalyzerConfig::builder("sk-test")
        .provider(provider)
        .model("test-model")
        .api_base_url(server.uri())
        .timeout(Duration::from_secs(5))
        .base_delay(Duration::from_millis(5))
        .max_delay(Duration::from_millis(20))
        .build()
}

fn request() -> LlmRequest {
    LlmRequest::single_turn("Respond with JSON only.", "Analyze this.").with_limits(500, 0.7)
}

fn chat_completion(content: &str) -> serde_json::Value {
    json!({
        "id": "gen-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 120, "completion_tokens": 80}
    })
}

#[tokio::test]
async fn chat_completions_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "max_tokens": 500,
            "messages": [
                {"role": "system", "content": "Respond with JSON only."},
                {"role": "user", "content": "Analyze this."}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("{\"ok\": true}")))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatCompletionsClient::new(&config_for(&server, LlmProvider::OpenRouter))
        .expect("client");
    let response = client.complete(&request()).await.expect("completion");

    assert_eq!(response.content, "{\"ok\": true}");
    assert_eq!((response.input_tokens, response.output_tokens), (120, 80));
}

#[tokio::test]
async fn rate_limit_is_transient_with_retry_hint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_json(json!({"error": {"message": "slow down"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatCompletionsClient::new(&config_for(&server, LlmProvider::OpenRouter))
        .expect("client");
    let err = client.complete(&request()).await.expect_err("rate limited");

    assert!(err.is_retryable());
    assert_eq!(err.retry_after_secs(), Some(7));
}

#[tokio::test]
async fn server_error_is_transient_and_auth_error_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatCompletionsClient::new(&config_for(&server, LlmProvider::OpenRouter))
        .expect("client");
    let err = client.complete(&request()).await.expect_err("server error");
    assert_eq!(err.kind(), ErrorKind::Transient);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "invalid api key"}})),
        )
        .mount(&server)
        .await;

    let client = ChatCompletionsClient::new(&config_for(&server, LlmProvider::OpenRouter))
        .expect("client");
    let err = client.complete(&request()).await.expect_err("auth error");
    assert_eq!(err, AnalyzerError::fatal(Some(401), "invalid api key"));
}

#[tokio::test]
async fn empty_completion_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("")))
        .mount(&server)
        .await;

    let client = ChatCompletionsClient::new(&config_for(&server, LlmProvider::OpenRouter))
        .expect("client");
    let err = client.complete(&request()).await.expect_err("empty");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn undecodable_envelope_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let client = ChatCompletionsClient::new(&config_for(&server, LlmProvider::OpenRouter))
        .expect("client");
    let err = client.complete(&request()).await.expect_err("garbage");
    assert_eq!(err.kind(), ErrorKind::Fatal);
}

#[tokio::test]
async fn anthropic_messages_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({"system": "Respond with JSON only."})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "{\"ok\": "}, {"type": "text", "text": "true}"}],
            "usage": {"input_tokens": 10, "output_tokens": 5}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::new(&config_for(&server, LlmProvider::Anthropic)).expect("client");
    let response = client.complete(&request()).await.expect("completion");

    assert_eq!(response.content, "{\"ok\": true}");
    assert_eq!(response.output_tokens, 5);
}

#[tokio::test]
async fn analyzer_retries_through_a_transient_failure() {
    let server = MockServer::start().await;

    // Mounted first so it takes precedence for the first request only.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_completion(&format!("```json\n{VALID_COMPLETION}\n```"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let analyzer = Analyzer::from_config(config_for(&server, LlmProvider::OpenRouter))
        .expect("analyzer");
    let result = analyzer
        .analyze(&article("2301.07041", "Verifiable FHE"), AnalyzeOptions::default())
        .await
        .expect("analysis after retry");

    assert_eq!(result.arxiv_id, "2301.07041");
    assert_eq!(result.confidence, 0.85);
    assert_eq!(result.analysis.category.subcategory, "Cryptography");
}

#[tokio::test]
async fn analyzer_gives_up_after_attempt_cap() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let config = AnalyzerConfig {
        retry: papersift_analyzer::RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(5),
            jitter: 0.0,
        },
        ..config_for(&server, LlmProvider::OpenRouter)
    };
    let analyzer = Analyzer::from_config(config).expect("analyzer");
    let failure = analyzer
        .analyze(&article("2301.07041", "Verifiable FHE"), AnalyzeOptions::default())
        .await
        .expect_err("exhausted");

    assert!(matches!(
        failure.error,
        AnalyzerError::RetriesExhausted { attempts: 2, .. }
    ));
}
