//! Core data types for fetched articles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_RESULTS;
use crate::error::{FetcherError, Result};

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

/// What to fetch: one article by identifier, or the results of a search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchRequest {
    #[serde(default)]
    pub arxiv_id: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Download the PDF and attach its extracted text.
    #[serde(default)]
    pub fetch_full_text: bool,
}

/// A resolved fetch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget<'a> {
    Id(&'a str),
    Search { query: &'a str, max_results: u32 },
}

impl FetchRequest {
    pub fn by_id(arxiv_id: impl Into<String>) -> Self {
        Self {
            arxiv_id: Some(arxiv_id.into()),
            max_results: DEFAULT_MAX_RESULTS,
            ..Default::default()
        }
    }

    pub fn search(query: impl Into<String>, max_results: u32) -> Self {
        Self {
            query: Some(query.into()),
            max_results,
            ..Default::default()
        }
    }

    pub fn with_full_text(mut self, fetch_full_text: bool) -> Self {
        self.fetch_full_text = fetch_full_text;
        self
    }

    /// Decide what this request asks for. An identifier wins over a query.
    pub fn target(&self) -> Result<FetchTarget<'_>> {
        let id = self.arxiv_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let query = self.query.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match (id, query) {
            (Some(id), _) => Ok(FetchTarget::Id(id)),
            (None, Some(query)) => Ok(FetchTarget::Search {
                query,
                max_results: self.max_results,
            }),
            (None, None) => Err(FetcherError::InvalidRequest(
                "either arxiv_id or query must be provided".to_string(),
            )),
        }
    }
}

/// Article metadata as returned by the arXiv API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchedArticle {
    pub arxiv_id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub categories: Vec<String>,
    pub published: Option<DateTime<Utc>>,
    pub pdf_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_length: Option<usize>,
}

impl FetchedArticle {
    /// Attach extracted full text, keeping `text_length` in sync.
    pub fn set_full_text(&mut self, text: String) {
        self.text_length = Some(text.chars().count());
        self.full_text = Some(text);
    }
}

/// Articles returned for a single fetch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub articles: Vec<FetchedArticle>,
    pub total: usize,
}

impl From<Vec<FetchedArticle>> for FetchResponse {
    fn from(articles: Vec<FetchedArticle>) -> Self {
        let total = articles.len();
        Self { articles, total }
    }
}
