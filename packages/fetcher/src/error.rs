//! Error types for the fetcher.

use thiserror::Error;

/// Main error type for the fetcher library.
#[derive(Debug, Error)]
pub enum FetcherError {
    /// Neither an identifier nor a query was supplied.
    #[error("Invalid fetch request: {0}")]
    InvalidRequest(String),

    /// Invalid arXiv identifier format.
    #[error("Invalid arXiv ID format: '{0}'. Expected e.g. 2301.07041 or hep-th/9901001")]
    InvalidArxivId(String),

    /// The arXiv API returned no entries.
    #[error("No articles found for {0}")]
    NotFound(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The arXiv API answered with a non-success status.
    #[error("arXiv API returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// All retries for a transient failure were used up.
    #[error("Request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// Missing required Atom element.
    #[error("Missing required element <{element}> in {context}")]
    MissingElement { element: String, context: String },

    /// PDF text extraction failed.
    #[error("PDF text extraction failed for {url}: {message}")]
    PdfExtraction { url: String, message: String },

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to build a request URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl FetcherError {
    /// Whether the failure is a lookup miss rather than a transport problem.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias for fetcher operations.
pub type Result<T> = std::result::Result<T, FetcherError>;
