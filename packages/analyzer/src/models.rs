//! Domain types shared by the analyzer, its cache and the HTTP API.

use std::fmt;

use chrono::{DateTime, Utc};
use papersift_fetcher::FetchedArticle;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::error::{AnalyzerError, ErrorKind};

/// A scientific article to analyze.
///
/// Validated on construction and immutable afterwards; the only way to build
/// one is [`Article::new`] (plus the consuming `with_*` helpers) or
/// deserialization, which runs the same checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ArticleRecord")]
pub struct Article {
    arxiv_id: String,
    title: String,
    #[serde(rename = "abstract")]
    abstract_text: String,
    authors: Vec<String>,
    categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    published: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pdf_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_length: Option<usize>,
}

/// Wire form of [`Article`] before validation.
#[derive(Debug, Deserialize)]
struct ArticleRecord {
    #[serde(default)]
    arxiv_id: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "abstract", default)]
    abstract_text: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    published: Option<DateTime<Utc>>,
    #[serde(default)]
    pdf_url: Option<String>,
    #[serde(default)]
    full_text: Option<String>,
}

impl TryFrom<ArticleRecord> for Article {
    type Error = AnalyzerError;

    fn try_from(record: ArticleRecord) -> Result<Self, Self::Error> {
        let mut article = Article::new(record.arxiv_id, record.title, record.abstract_text)?
            .with_authors(record.authors)
            .with_categories(record.categories);
        article.published = record.published;
        article.pdf_url = record.pdf_url.filter(|u| !u.trim().is_empty());
        if let Some(text) = record.full_text {
            article = article.with_full_text(text);
        }
        Ok(article)
    }
}

impl TryFrom<FetchedArticle> for Article {
    type Error = AnalyzerError;

    fn try_from(fetched: FetchedArticle) -> Result<Self, Self::Error> {
        let mut article = Article::new(fetched.arxiv_id, fetched.title, fetched.abstract_text)?
            .with_authors(fetched.authors)
            .with_categories(fetched.categories)
            .with_pdf_url(fetched.pdf_url);
        article.published = fetched.published;
        if let Some(text) = fetched.full_text {
            article = article.with_full_text(text);
        }
        Ok(article)
    }
}

impl Article {
    /// Build an article. Title and abstract must be non-empty; the identifier
    /// may be empty for ad hoc text.
    pub fn new(
        arxiv_id: impl Into<String>,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
    ) -> Result<Self, AnalyzerError> {
        let arxiv_id = arxiv_id.into().trim().to_string();
        let title = title.into().trim().to_string();
        let abstract_text = abstract_text.into().trim().to_string();

        if title.is_empty() {
            return Err(AnalyzerError::InvalidInput(
                "article title must not be empty".to_string(),
            ));
        }
        if abstract_text.is_empty() {
            return Err(AnalyzerError::InvalidInput(
                "article abstract must not be empty".to_string(),
            ));
        }

        Ok(Self {
            arxiv_id,
            title,
            abstract_text,
            authors: Vec::new(),
            categories: Vec::new(),
            published: None,
            pdf_url: None,
            full_text: None,
            text_length: None,
        })
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    /// Set the category codes. Duplicates are dropped, first occurrence wins.
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for category in categories {
            let category = category.into().trim().to_string();
            if !category.is_empty() && !unique.contains(&category) {
                unique.push(category);
            }
        }
        self.categories = unique;
        self
    }

    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    pub fn with_pdf_url(mut self, pdf_url: impl Into<String>) -> Self {
        let pdf_url = pdf_url.into();
        self.pdf_url = (!pdf_url.trim().is_empty()).then_some(pdf_url);
        self
    }

    /// Attach full text. Blank text is ignored so `text_length` is only ever
    /// set together with `full_text`.
    pub fn with_full_text(mut self, full_text: impl Into<String>) -> Self {
        let full_text = full_text.into();
        if full_text.trim().is_empty() {
            self.full_text = None;
            self.text_length = None;
        } else {
            self.text_length = Some(full_text.chars().count());
            self.full_text = Some(full_text);
        }
        self
    }

    pub fn arxiv_id(&self) -> &str {
        &self.arxiv_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn abstract_text(&self) -> &str {
        &self.abstract_text
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.published
    }

    pub fn pdf_url(&self) -> Option<&str> {
        self.pdf_url.as_deref()
    }

    pub fn full_text(&self) -> Option<&str> {
        self.full_text.as_deref()
    }

    pub fn text_length(&self) -> Option<usize> {
        self.text_length
    }
}

/// How demanding the article is for a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Complexity {
    Basic,
    Intermediate,
    Advanced,
}

impl Complexity {
    pub const ALL: [Complexity; 3] = [Self::Basic, Self::Intermediate, Self::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of contribution the article makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArticleType {
    Theory,
    Empirical,
    Survey,
    Application,
    Other,
}

impl ArticleType {
    pub const ALL: [ArticleType; 5] = [
        Self::Theory,
        Self::Empirical,
        Self::Survey,
        Self::Application,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Theory => "Theory",
            Self::Empirical => "Empirical",
            Self::Survey => "Survey",
            Self::Application => "Application",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ArticleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub domain: String,
    pub subcategory: String,
    pub complexity: Complexity,
    pub article_type: ArticleType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub brief: String,
    pub key_points: Vec<String>,
}

/// Structured categorization of one article, as produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub main_topic: String,
    pub methodology: String,
    pub key_findings: Vec<String>,
    pub techniques: Vec<String>,
    pub category: Category,
    pub summary: Summary,
}

/// A validated analysis together with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub arxiv_id: String,
    pub analysis: Analysis,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub analysis_timestamp: DateTime<Utc>,
}

/// Per-article failure, tagged with the article it belongs to.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("analysis of '{arxiv_id}' failed: {error}")]
pub struct ArticleFailure {
    pub arxiv_id: String,
    #[source]
    pub error: AnalyzerError,
}

impl ArticleFailure {
    pub fn new(arxiv_id: impl Into<String>, error: AnalyzerError) -> Self {
        Self {
            arxiv_id: arxiv_id.into(),
            error,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl Serialize for ArticleFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            arxiv_id: &'a str,
            kind: ErrorKind,
            reason: String,
        }

        Wire {
            arxiv_id: &self.arxiv_id,
            kind: self.kind(),
            reason: self.error.to_string(),
        }
        .serialize(serializer)
    }
}

/// Outcome for one article of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArticleOutcome {
    Analyzed(AnalysisResult),
    Failed(ArticleFailure),
}

impl ArticleOutcome {
    pub fn arxiv_id(&self) -> &str {
        match self {
            Self::Analyzed(result) => &result.arxiv_id,
            Self::Failed(failure) => &failure.arxiv_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Analyzed(_))
    }
}

impl From<Result<AnalysisResult, ArticleFailure>> for ArticleOutcome {
    fn from(result: Result<AnalysisResult, ArticleFailure>) -> Self {
        match result {
            Ok(result) => Self::Analyzed(result),
            Err(failure) => Self::Failed(failure),
        }
    }
}

/// Results of a batch, in the same order as the input articles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub results: Vec<ArticleOutcome>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl BatchResult {
    pub fn from_outcomes(results: Vec<ArticleOutcome>) -> Self {
        let total = results.len();
        let successful = results.iter().filter(|r| r.is_success()).count();
        Self {
            results,
            total,
            successful,
            failed: total - successful,
        }
    }

    pub fn successes(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.results.iter().filter_map(|outcome| match outcome {
            ArticleOutcome::Analyzed(result) => Some(result),
            ArticleOutcome::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &ArticleFailure> {
        self.results.iter().filter_map(|outcome| match outcome {
            ArticleOutcome::Analyzed(_) => None,
            ArticleOutcome::Failed(failure) => Some(failure),
        })
    }
}

/// Options for a single analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AnalyzeOptions {
    /// Recompute even when a cached result exists.
    #[serde(default)]
    pub force_refresh: bool,
}

/// Options for a batch analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Overrides the configured worker bound when set.
    pub max_concurrent: Option<usize>,
    pub analyze: AnalyzeOptions,
}

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub cache_size: usize,
}
