use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::analysis::cache::{cache_key, AnalysisCache};
use crate::analysis::client::{create_client, LlmClient, LlmRequest};
use crate::analysis::clock::MonotonicClock;
use crate::analysis::confidence::{ConfidenceStrategy, ModelReportedConfidence};
use crate::analysis::parser::parse_response;
use crate::analysis::prompt::PromptBuilder;
use crate::analysis::retry::retry_transient;
use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, Result};
use crate::models::{
    AnalysisResult, AnalyzeOptions, Article, ArticleFailure, ArticleOutcome, BatchOptions,
    BatchResult, HealthStatus,
};

pub const SERVICE_NAME: &str = "analyzer-service";

/// Analysis orchestrator.
///
/// Builds the prompt, calls the LLM with bounded retry, validates the
/// response and stores the result in its own cache. Batches fan out with a
/// worker bound and report outcomes in input order.
pub struct Analyzer {
    client: Arc<dyn LlmClient>,
    cache: AnalysisCache,
    prompts: PromptBuilder,
    confidence: Arc<dyn ConfidenceStrategy>,
    clock: MonotonicClock,
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(client: Arc<dyn LlmClient>, config: AnalyzerConfig) -> Self {
        Self {
            client,
            cache: AnalysisCache::new(config.cache_capacity),
            prompts: PromptBuilder::new(config.full_text_max_chars),
            confidence: Arc::new(ModelReportedConfidence {
                default: config.default_confidence,
            }),
            clock: MonotonicClock::new(),
            config,
        }
    }

    /// Build an analyzer with the provider client named in `config`.
    pub fn from_config(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        let client = create_client(&config)?;
        Ok(Self::new(client, config))
    }

    /// Replace how confidence is derived.
    pub fn with_confidence(mut self, strategy: Arc<dyn ConfidenceStrategy>) -> Self {
        self.confidence = strategy;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Analyze one article, serving from cache unless `force_refresh` is set.
    pub async fn analyze(
        &self,
        article: &Article,
        options: AnalyzeOptions,
    ) -> std::result::Result<AnalysisResult, ArticleFailure> {
        let key = cache_key(article);
        debug!(arxiv_id = article.arxiv_id(), key = %key, "analyzing article");

        self.cache
            .get_or_compute(&key, options.force_refresh, || self.compute(article, &key))
            .await
            .map_err(|error| {
                warn!(arxiv_id = article.arxiv_id(), kind = ?error.kind(), error = %error, "analysis failed");
                ArticleFailure::new(article.arxiv_id(), error)
            })
    }

    async fn compute(&self, article: &Article, key: &str) -> Result<AnalysisResult> {
        info!(arxiv_id = article.arxiv_id(), "requesting LLM analysis");

        let request = LlmRequest::single_turn(self.prompts.system_prompt(), self.prompts.build(article))
            .with_limits(self.config.max_tokens, self.config.temperature);
        let timeout = self.config.timeout;

        let response = retry_transient(&self.config.retry, key, |attempt| {
            let request = &request;
            async move {
                debug!(key, attempt, "LLM attempt");
                tokio::time::timeout(timeout, self.client.complete(request))
                    .await
                    .map_err(|_| {
                        AnalyzerError::transient(format!(
                            "LLM call timed out after {}s",
                            timeout.as_secs_f64()
                        ))
                    })?
            }
        })
        .await?;

        let parsed = parse_response(&response.content)?;
        let confidence = self.confidence.score(parsed.reported_confidence);

        info!(
            arxiv_id = article.arxiv_id(),
            confidence,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "analysis complete"
        );

        Ok(AnalysisResult {
            arxiv_id: article.arxiv_id().to_string(),
            analysis: parsed.analysis,
            confidence,
            analysis_timestamp: self.clock.now(),
        })
    }

    /// Analyze many articles concurrently. One failure never aborts the
    /// others; outcomes come back in input order.
    pub async fn analyze_batch(&self, articles: &[Article], options: BatchOptions) -> BatchResult {
        let limit = options
            .max_concurrent
            .unwrap_or(self.config.max_concurrent)
            .max(1);
        info!(articles = articles.len(), max_concurrent = limit, "starting batch analysis");

        // Boxed up front so the batch future stays Send inside spawned tasks
        // and axum handlers.
        let work: Vec<BoxFuture<'_, (usize, std::result::Result<AnalysisResult, ArticleFailure>)>> =
            articles
                .iter()
                .enumerate()
                .map(|(index, article)| {
                    let fut: BoxFuture<'_, _> = Box::pin(async move {
                        (index, self.analyze(article, options.analyze).await)
                    });
                    fut
                })
                .collect();

        let mut slots: Vec<Option<ArticleOutcome>> = vec![None; articles.len()];
        let mut outcomes = stream::iter(work).buffer_unordered(limit);

        while let Some((index, outcome)) = outcomes.next().await {
            slots[index] = Some(outcome.into());
        }

        let batch = BatchResult::from_outcomes(slots.into_iter().flatten().collect());
        info!(
            total = batch.total,
            successful = batch.successful,
            failed = batch.failed,
            "batch analysis finished"
        );
        batch
    }

    /// Drop every cached analysis, returning how many there were.
    pub fn cache_clear(&self) -> usize {
        let cleared = self.cache.clear();
        info!(cleared, "analysis cache cleared");
        cleared
    }

    pub fn cache_size(&self) -> usize {
        self.cache.size()
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy",
            service: SERVICE_NAME,
            cache_size: self.cache_size(),
        }
    }
}
