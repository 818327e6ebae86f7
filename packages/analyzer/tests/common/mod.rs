//! Shared helpers for analyzer integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use papersift_analyzer::{
    AnalyzerConfig, AnalyzerError, Article, LlmClient, LlmRequest, LlmResponse, Result,
};

/// A completion that parses into a complete analysis without a reported
/// confidence.
pub const VALID_COMPLETION: &str = r#"{
  "main_topic": "Verifiable fully homomorphic encryption",
  "methodology": "Systematization of knowledge with prototype benchmarks",
  "key_findings": ["Deployed FHE offers no integrity", "ZKP-based verification is costly"],
  "techniques": ["Fully Homomorphic Encryption", "Zero-Knowledge Proofs", "Trusted Execution"],
  "category": {
    "domain": "Computer Science",
    "subcategory": "Cryptography",
    "complexity": "Advanced",
    "article_type": "Survey"
  },
  "summary": {
    "brief": "The paper studies how to add integrity guarantees to FHE computations.",
    "key_points": ["Malicious servers can tamper with results", "Three families of defenses"]
  }
}"#;

/// How the scripted client answers prompts for one article.
#[derive(Clone)]
pub enum Behavior {
    Respond { content: String, delay: Duration },
    Fail(AnalyzerError),
    /// Fails only after `delay`, so concurrent callers overlap.
    FailAfter(AnalyzerError, Duration),
    Hang,
}

impl Behavior {
    pub fn valid() -> Self {
        Self::valid_after(Duration::ZERO)
    }

    pub fn valid_after(delay: Duration) -> Self {
        Self::Respond {
            content: VALID_COMPLETION.to_string(),
            delay,
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self::Respond {
            content: content.into(),
            delay: Duration::ZERO,
        }
    }
}

/// LLM client that answers according to the article title found in the
/// prompt, counting calls and recording completion order.
#[derive(Default)]
pub struct ScriptedClient {
    behaviors: HashMap<String, Behavior>,
    calls: Mutex<HashMap<String, usize>>,
    completed: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, title: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(title.to_string(), behavior);
        self
    }

    pub fn calls(&self, title: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .get(title)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").values().sum()
    }

    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().expect("order lock").clone()
    }

    fn title_of(request: &LlmRequest) -> String {
        request
            .messages
            .iter()
            .flat_map(|m| m.content.lines())
            .find_map(|line| line.strip_prefix("Title: "))
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let title = Self::title_of(request);
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry(title.clone())
            .or_default() += 1;

        let behavior = self
            .behaviors
            .get(&title)
            .cloned()
            .unwrap_or_else(Behavior::valid);

        let outcome = match behavior {
            Behavior::Respond { content, delay } => {
                tokio::time::sleep(delay).await;
                Ok(LlmResponse::text(content))
            }
            Behavior::Fail(error) => Err(error),
            Behavior::FailAfter(error, delay) => {
                tokio::time::sleep(delay).await;
                Err(error)
            }
            Behavior::Hang => std::future::pending().await,
        };

        self.completed.lock().expect("order lock").push(title);
        outcome
    }
}

pub fn article(arxiv_id: &str, title: &str) -> Article {
    Article::new(
        arxiv_id,
        title,
        "Fully Homomorphic Encryption (FHE) is seeing increasing real-world deployment.",
    )
    .expect("valid article")
}

/// Fast retries so transient-failure tests stay quick.
pub fn test_config() -> AnalyzerConfig {
    AnalyzerConfig::builder("test-key")
        .base_delay(Duration::from_millis(5))
        .max_delay(Duration::from_millis(20))
        .timeout(Duration::from_secs(30))
        .build()
}

pub fn shared(client: ScriptedClient) -> Arc<ScriptedClient> {
    Arc::new(client)
}
