//! Papersift Fetcher - Retrieve article metadata from the arXiv API.
//!
//! This crate supplies article records (title, abstract, authors,
//! categories and optionally PDF full text) to the analyzer.
//!
//! # Example
//!
//! ```
//! use papersift_fetcher::{FetchRequest, config};
//!
//! assert!(config::validate_arxiv_id("2301.07041").is_ok());
//! let request = FetchRequest::search("cat:cs.CR", 3).with_full_text(false);
//! assert!(request.target().is_ok());
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Endpoints, limits and identifier validation
//! - [`types`]: Request and article types
//! - [`error`]: Error types and Result alias
//! - [`http`]: HTTP client with retry for transient failures
//! - [`atom`]: Atom feed parsing
//! - [`pdf`]: PDF text extraction
//! - [`fetcher`]: The [`ArticleSource`] trait and its arXiv implementation
//! - [`cli`]: Command-line interface

pub mod atom;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod pdf;
pub mod types;

pub use config::{validate_arxiv_id, FetcherConfig};
pub use error::{FetcherError, Result};
pub use fetcher::{ArticleSource, ArxivFetcher};
pub use types::{FetchRequest, FetchResponse, FetchTarget, FetchedArticle};
