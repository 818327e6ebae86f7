//! Configuration constants and validation functions for the fetcher.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use url::Url;

use crate::error::{FetcherError, Result};

/// Query endpoint of the arXiv Atom API.
pub const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

/// Base URL for article PDFs.
pub const ARXIV_PDF_BASE_URL: &str = "https://arxiv.org/pdf";

/// HTTP timeout for metadata requests, in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// HTTP timeout for PDF downloads, in seconds.
///
/// PDFs are much larger than Atom feeds, so they get a longer budget.
pub const PDF_TIMEOUT_SECS: u64 = 60;

/// Maximum number of characters of extracted full text kept per article.
pub const MAX_FULL_TEXT_CHARS: usize = 50_000;

/// Default number of search results.
pub const DEFAULT_MAX_RESULTS: u32 = 5;

/// Upper bound on search results per request.
pub const MAX_RESULTS_LIMIT: u32 = 100;

/// New-style identifiers: `YYMM.NNNNN` with an optional version suffix.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NEW_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}\.\d{4,5}(v\d+)?$").expect("valid regex"));

/// Old-style identifiers: `archive(.SUB)/NNNNNNN`, e.g. `hep-th/9901001`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static OLD_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z\-]*(\.[A-Z]{2})?/\d{7}(v\d+)?$").expect("valid regex")
});

/// Version suffix at the end of an identifier.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v\d+$").expect("valid regex"));

/// Runtime configuration for the fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub api_url: String,
    pub pdf_base_url: String,
    pub timeout: Duration,
    pub pdf_timeout: Duration,
    pub max_full_text_chars: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            api_url: ARXIV_API_URL.to_string(),
            pdf_base_url: ARXIV_PDF_BASE_URL.to_string(),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            pdf_timeout: Duration::from_secs(PDF_TIMEOUT_SECS),
            max_full_text_chars: MAX_FULL_TEXT_CHARS,
        }
    }
}

impl FetcherConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_url = std::env::var("ARXIV_API_URL").unwrap_or(defaults.api_url);
        let pdf_base_url = std::env::var("ARXIV_PDF_BASE_URL").unwrap_or(defaults.pdf_base_url);

        let timeout_secs: u64 = std::env::var("FETCHER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(HTTP_TIMEOUT_SECS);

        let pdf_timeout_secs: u64 = std::env::var("FETCHER_PDF_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(PDF_TIMEOUT_SECS);

        Self {
            api_url,
            pdf_base_url,
            timeout: Duration::from_secs(timeout_secs),
            pdf_timeout: Duration::from_secs(pdf_timeout_secs),
            max_full_text_chars: defaults.max_full_text_chars,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_pdf_base_url(mut self, pdf_base_url: impl Into<String>) -> Self {
        self.pdf_base_url = pdf_base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the Atom query URL for a single identifier.
    pub fn id_url(&self, arxiv_id: &str) -> Result<Url> {
        Ok(Url::parse_with_params(&self.api_url, &[("id_list", arxiv_id)])?)
    }

    /// Build the Atom query URL for a search.
    pub fn search_url(&self, query: &str, max_results: u32) -> Result<Url> {
        let max_results = max_results.clamp(1, MAX_RESULTS_LIMIT).to_string();
        Ok(Url::parse_with_params(
            &self.api_url,
            &[("search_query", query), ("max_results", max_results.as_str())],
        )?)
    }

    /// PDF location for an identifier.
    pub fn pdf_url(&self, arxiv_id: &str) -> String {
        format!("{}/{}.pdf", self.pdf_base_url.trim_end_matches('/'), arxiv_id)
    }
}

/// Validate arXiv identifier format.
///
/// # Examples
/// ```
/// use papersift_fetcher::config::validate_arxiv_id;
///
/// assert!(validate_arxiv_id("2301.07041").is_ok());
/// assert!(validate_arxiv_id("hep-th/9901001v2").is_ok());
/// assert!(validate_arxiv_id("not an id").is_err());
/// ```
pub fn validate_arxiv_id(arxiv_id: &str) -> Result<()> {
    if NEW_ID_PATTERN.is_match(arxiv_id) || OLD_ID_PATTERN.is_match(arxiv_id) {
        Ok(())
    } else {
        Err(FetcherError::InvalidArxivId(arxiv_id.to_string()))
    }
}

/// Strip the version suffix from an identifier (`2301.07041v2` -> `2301.07041`).
pub fn strip_version(arxiv_id: &str) -> &str {
    match VERSION_SUFFIX.find(arxiv_id) {
        Some(m) => &arxiv_id[..m.start()],
        None => arxiv_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_arxiv_id() {
        assert!(validate_arxiv_id("2301.07041").is_ok());
        assert!(validate_arxiv_id("2301.07041v3").is_ok());
        assert!(validate_arxiv_id("0704.0001").is_ok());
        assert!(validate_arxiv_id("math.GT/0309136").is_ok());
        assert!(validate_arxiv_id("2301").is_err());
        assert!(validate_arxiv_id("").is_err());
    }

    #[test]
    fn test_strip_version() {
        assert_eq!(strip_version("2301.07041v2"), "2301.07041");
        assert_eq!(strip_version("2301.07041"), "2301.07041");
        assert_eq!(strip_version("hep-th/9901001v1"), "hep-th/9901001");
    }

    #[test]
    fn test_id_url() {
        let config = FetcherConfig::default();
        let url = config.id_url("2301.07041").expect("url");
        assert_eq!(
            url.as_str(),
            "https://export.arxiv.org/api/query?id_list=2301.07041"
        );
    }

    #[test]
    fn test_search_url_encodes_and_clamps() {
        let config = FetcherConfig::default();
        let url = config.search_url("all:homomorphic encryption", 500).expect("url");
        assert_eq!(
            url.as_str(),
            "https://export.arxiv.org/api/query?search_query=all%3Ahomomorphic+encryption&max_results=100"
        );
    }

    #[test]
    fn test_pdf_url() {
        let config = FetcherConfig::default().with_pdf_base_url("http://localhost:1234/pdf/");
        assert_eq!(
            config.pdf_url("2301.07041"),
            "http://localhost:1234/pdf/2301.07041.pdf"
        );
    }
}
