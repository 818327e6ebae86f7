//! Papersift Analyzer - LLM-driven categorization of scientific articles.
//!
//! An [`Analyzer`] turns an [`Article`] into a validated, cached,
//! confidence-scored [`AnalysisResult`]. Batches run concurrently under a
//! worker bound and report per-article outcomes in input order.
//!
//! # Architecture
//!
//! - [`analysis`]: Prompt builder, LLM clients, response parser, cache and
//!   the analyzer itself
//! - [`models`]: Article, analysis and batch types
//! - [`config`]: Environment-driven configuration
//! - [`error`]: Error types and Result alias
//! - [`api`]: HTTP routes

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod models;

pub use analysis::{AnalysisCache, Analyzer, LlmClient, LlmRequest, LlmResponse};
pub use config::{AnalyzerConfig, LlmProvider, RetryPolicy, ServerConfig};
pub use error::{AnalyzerError, ErrorKind, Result};
pub use models::{
    Analysis, AnalysisResult, AnalyzeOptions, Article, ArticleFailure, ArticleOutcome,
    ArticleType, BatchOptions, BatchResult, Category, Complexity, HealthStatus, Summary,
};
