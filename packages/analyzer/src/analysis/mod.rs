mod analyzer;
mod cache;
mod client;
mod clock;
mod confidence;
mod parser;
mod prompt;
mod retry;

pub use analyzer::Analyzer;
pub use cache::{cache_key, AnalysisCache, CacheEntry};
#[cfg(any(test, feature = "test-utils"))]
pub use client::test_support::MockLlmClient;
pub use client::{
    create_client, AnthropicClient, ChatCompletionsClient, LlmClient, LlmRequest, LlmResponse,
    Message, Role,
};
pub use clock::MonotonicClock;
pub use confidence::{ConfidenceStrategy, FixedConfidence, ModelReportedConfidence};
pub use parser::{extract_json_object, parse_response, ParsedAnalysis};
pub use prompt::{truncate_at_boundary, PromptBuilder, ANALYSIS_SCHEMA};
pub use retry::{backoff_delay, retry_transient};

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};

    use crate::models::{Analysis, AnalysisResult, ArticleType, Category, Complexity, Summary};

    /// A model completion that parses cleanly and reports no confidence.
    pub const VALID_COMPLETION: &str = r#"{
  "main_topic": "Verifiable fully homomorphic encryption",
  "methodology": "Systematization of knowledge with prototype benchmarks",
  "key_findings": ["Integrity is missing from deployed FHE", "ZKP-based approaches are costly"],
  "techniques": ["Fully Homomorphic Encryption", "Zero-Knowledge Proofs"],
  "category": {
    "domain": "Computer Science",
    "subcategory": "Cryptography",
    "complexity": "Advanced",
    "article_type": "Survey"
  },
  "summary": {
    "brief": "The paper studies how to add integrity guarantees to FHE.",
    "key_points": ["Malicious servers can tamper with FHE results"]
  }
}"#;

    pub fn sample_analysis() -> Analysis {
        Analysis {
            main_topic: "Verifiable fully homomorphic encryption".into(),
            methodology: "Systematization of knowledge".into(),
            key_findings: vec!["Integrity is missing from deployed FHE".into()],
            techniques: vec!["Fully Homomorphic Encryption".into()],
            category: Category {
                domain: "Computer Science".into(),
                subcategory: "Cryptography".into(),
                complexity: Complexity::Advanced,
                article_type: ArticleType::Survey,
            },
            summary: Summary {
                brief: "Adds integrity to FHE.".into(),
                key_points: vec![],
            },
        }
    }

    pub fn sample_result(arxiv_id: &str) -> AnalysisResult {
        AnalysisResult {
            arxiv_id: arxiv_id.to_string(),
            analysis: sample_analysis(),
            confidence: 0.85,
            analysis_timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }
}
