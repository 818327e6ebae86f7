//! Main fetcher service.
//!
//! Resolves a [`FetchRequest`] against the arXiv API and, when asked, enriches
//! every returned article with text extracted from its PDF.

use async_trait::async_trait;
use reqwest::Client;

use crate::atom::parse_feed;
use crate::config::{validate_arxiv_id, FetcherConfig};
use crate::error::{FetcherError, Result};
use crate::http::{bytes_to_string, create_client, download_bytes};
use crate::pdf::fetch_full_text;
use crate::types::{FetchRequest, FetchResponse, FetchTarget};

/// Anything that can supply articles for a fetch request.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

/// [`ArticleSource`] backed by the arXiv Atom API.
pub struct ArxivFetcher {
    client: Client,
    pdf_client: Client,
    config: FetcherConfig,
}

impl ArxivFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let client = create_client(config.timeout)?;
        let pdf_client = create_client(config.pdf_timeout)?;
        Ok(Self {
            client,
            pdf_client,
            config,
        })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }
}

#[async_trait]
impl ArticleSource for ArxivFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let (url, label) = match request.target()? {
            FetchTarget::Id(id) => {
                validate_arxiv_id(id)?;
                (self.config.id_url(id)?, id.to_string())
            }
            FetchTarget::Search { query, max_results } => {
                (self.config.search_url(query, max_results)?, format!("query '{query}'"))
            }
        };

        tracing::info!(target = %label, "Fetching articles from arXiv");
        let bytes = download_bytes(&self.client, url.as_str()).await?;
        let xml = bytes_to_string(&bytes, &label);

        let mut articles = parse_feed(&xml, &self.config)?;
        if articles.is_empty() {
            return Err(FetcherError::NotFound(label));
        }

        if request.fetch_full_text {
            for article in &mut articles {
                match fetch_full_text(
                    &self.pdf_client,
                    &article.pdf_url,
                    self.config.max_full_text_chars,
                )
                .await
                {
                    Ok(text) => article.set_full_text(text),
                    Err(e) => {
                        tracing::warn!(
                            arxiv_id = %article.arxiv_id,
                            error = %e,
                            "Full text unavailable, continuing with metadata only"
                        );
                    }
                }
            }
        }

        tracing::info!(target = %label, count = articles.len(), "Fetched articles");
        Ok(FetchResponse::from(articles))
    }
}
