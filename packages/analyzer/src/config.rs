use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AnalyzerError, Result};

const DEFAULT_MODEL: &str = "nvidia/nemotron-nano-9b-v2:free";

/// Which wire protocol the LLM endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// OpenRouter's OpenAI-compatible chat completions API.
    OpenRouter,
    OpenAi,
    Anthropic,
}

impl LlmProvider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openrouter" => Ok(Self::OpenRouter),
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(AnalyzerError::Config(format!(
                "unsupported LLM provider '{other}', expected openrouter, openai or anthropic"
            ))),
        }
    }
}

/// Retry schedule for transient LLM failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fraction of each delay that is randomized, in `[0, 1]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: 0.25,
        }
    }
}

/// Configuration for the analyzer and its LLM client.
#[derive(Clone)]
pub struct AnalyzerConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: String,
    pub api_base_url: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Budget for a single LLM call attempt.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Default worker bound for batches.
    pub max_concurrent: usize,
    /// `None` means unbounded.
    pub cache_capacity: Option<usize>,
    pub full_text_max_chars: usize,
    pub default_confidence: f64,
}

// api_key stays out of logs
impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("max_concurrent", &self.max_concurrent)
            .field("cache_capacity", &self.cache_capacity)
            .field("full_text_max_chars", &self.full_text_max_chars)
            .field("default_confidence", &self.default_confidence)
            .finish()
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl AnalyzerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("OPENROUTER_API_KEY"))
            .map_err(|_| AnalyzerError::Config("LLM_API_KEY not set".into()))?;

        let provider = match std::env::var("LLM_PROVIDER") {
            Ok(value) => value.parse()?,
            Err(_) => LlmProvider::OpenRouter,
        };

        let mut builder = Self::builder(api_key).provider(provider);

        if let Ok(model) = std::env::var("LLM_MODEL") {
            builder = builder.model(model);
        }
        if let Ok(url) = std::env::var("LLM_API_BASE_URL") {
            builder = builder.api_base_url(url);
        }
        if let Some(temperature) = env_parse("LLM_TEMPERATURE") {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = env_parse("LLM_MAX_TOKENS") {
            builder = builder.max_tokens(max_tokens);
        }
        if let Some(secs) = env_parse::<u64>("LLM_TIMEOUT_SECS") {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(attempts) = env_parse("ANALYZER_MAX_ATTEMPTS") {
            builder = builder.max_attempts(attempts);
        }
        if let Some(ms) = env_parse::<u64>("ANALYZER_BACKOFF_BASE_MS") {
            builder = builder.base_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = env_parse::<u64>("ANALYZER_BACKOFF_MAX_MS") {
            builder = builder.max_delay(Duration::from_millis(ms));
        }
        if let Some(limit) = env_parse("ANALYZER_MAX_CONCURRENT") {
            builder = builder.max_concurrent(limit);
        }
        if let Some(capacity) = env_parse("ANALYZER_CACHE_CAPACITY") {
            builder = builder.cache_capacity(Some(capacity));
        }
        if let Some(chars) = env_parse("ANALYZER_FULL_TEXT_MAX_CHARS") {
            builder = builder.full_text_max_chars(chars);
        }
        if let Some(confidence) = env_parse("ANALYZER_DEFAULT_CONFIDENCE") {
            builder = builder.default_confidence(confidence);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Create a config builder with defaults for everything but the key.
    pub fn builder(api_key: impl Into<String>) -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            api_key: api_key.into(),
            provider: LlmProvider::OpenRouter,
            model: DEFAULT_MODEL.into(),
            api_base_url: None,
            temperature: 0.7,
            max_tokens: 2000,
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            max_concurrent: 3,
            cache_capacity: None,
            full_text_max_chars: 50_000,
            default_confidence: 0.85,
        }
    }

    /// Reject values the analyzer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(AnalyzerError::Config("LLM API key is empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(AnalyzerError::Config(
                "retry attempt cap must be at least 1".into(),
            ));
        }
        if self.max_concurrent == 0 {
            return Err(AnalyzerError::Config(
                "batch concurrency must be at least 1".into(),
            ));
        }
        if self.cache_capacity == Some(0) {
            return Err(AnalyzerError::Config(
                "cache capacity must be at least 1 when set".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.default_confidence) {
            return Err(AnalyzerError::Config(
                "default confidence must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing `AnalyzerConfig`, mostly in tests.
pub struct AnalyzerConfigBuilder {
    api_key: String,
    provider: LlmProvider,
    model: String,
    api_base_url: Option<String>,
    temperature: f64,
    max_tokens: u32,
    timeout: Duration,
    retry: RetryPolicy,
    max_concurrent: usize,
    cache_capacity: Option<usize>,
    full_text_max_chars: usize,
    default_confidence: f64,
}

impl AnalyzerConfigBuilder {
    pub fn provider(mut self, provider: LlmProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = Some(api_base_url.into());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = max_attempts;
        self
    }

    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.retry.base_delay = base_delay;
        self
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.retry.max_delay = max_delay;
        self
    }

    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn cache_capacity(mut self, cache_capacity: Option<usize>) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn full_text_max_chars(mut self, full_text_max_chars: usize) -> Self {
        self.full_text_max_chars = full_text_max_chars;
        self
    }

    pub fn default_confidence(mut self, default_confidence: f64) -> Self {
        self.default_confidence = default_confidence;
        self
    }

    pub fn build(self) -> AnalyzerConfig {
        let api_base_url = self
            .api_base_url
            .unwrap_or_else(|| self.provider.default_base_url().to_string());

        AnalyzerConfig {
            provider: self.provider,
            model: self.model,
            api_key: self.api_key,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
            retry: self.retry,
            max_concurrent: self.max_concurrent,
            cache_capacity: self.cache_capacity,
            full_text_max_chars: self.full_text_max_chars,
            default_confidence: self.default_confidence,
        }
    }
}

/// Settings for the HTTP API process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = match std::env::var("ANALYZER_BIND_ADDR") {
            Ok(value) => value.parse().map_err(|e| {
                AnalyzerError::Config(format!("invalid ANALYZER_BIND_ADDR '{value}': {e}"))
            })?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 8001)),
        };
        Ok(Self { bind_addr })
    }
}
