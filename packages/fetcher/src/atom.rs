//! Atom feed parsing for arXiv API responses.
//!
//! The arXiv query endpoint answers with an Atom 1.0 feed. Each `<entry>`
//! carries one article:
//! - `<id>`: abstract page URL ending in the versioned identifier
//! - `<title>`, `<summary>`: free text with hard line breaks
//! - `<author><name>`: one element per author, in order
//! - `<category term=".."/>`: subject classification codes
//! - `<published>`: RFC 3339 timestamp of the first version

use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};

use crate::config::{strip_version, FetcherConfig};
use crate::error::{FetcherError, Result};
use crate::types::FetchedArticle;

/// Marker in the `<id>` of the pseudo-entry arXiv returns for a bad query.
const API_ERROR_MARKER: &str = "/api/errors";

/// Parse every article entry of an Atom feed.
///
/// Error pseudo-entries are skipped; an empty result is left for the caller to
/// interpret.
pub fn parse_feed(xml: &str, config: &FetcherConfig) -> Result<Vec<FetchedArticle>> {
    let doc = Document::parse(xml)?;

    let mut articles = Vec::new();
    for entry in doc
        .root_element()
        .children()
        .filter(|n| n.is_element() && n.has_tag_name("entry"))
    {
        let raw_id = child_text(entry, "id").unwrap_or_default();
        if raw_id.contains(API_ERROR_MARKER) {
            let message = child_text(entry, "summary").unwrap_or_default();
            tracing::warn!(message = %message, "arXiv API reported an error entry");
            continue;
        }
        articles.push(parse_entry(entry, &raw_id, config)?);
    }

    Ok(articles)
}

/// Parse a single `<entry>` element.
fn parse_entry(entry: Node<'_, '_>, raw_id: &str, config: &FetcherConfig) -> Result<FetchedArticle> {
    let arxiv_id = extract_arxiv_id(raw_id).ok_or_else(|| FetcherError::MissingElement {
        element: "id".to_string(),
        context: "entry".to_string(),
    })?;

    let context = format!("entry {arxiv_id}");
    let title = child_text(entry, "title")
        .map(|t| collapse_whitespace(&t))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| FetcherError::MissingElement {
            element: "title".to_string(),
            context: context.clone(),
        })?;
    let abstract_text = child_text(entry, "summary")
        .map(|t| collapse_whitespace(&t))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| FetcherError::MissingElement {
            element: "summary".to_string(),
            context: context.clone(),
        })?;

    let authors = entry
        .children()
        .filter(|n| n.is_element() && n.has_tag_name("author"))
        .filter_map(|author| child_text(author, "name"))
        .map(|name| collapse_whitespace(&name))
        .filter(|name| !name.is_empty())
        .collect();

    let mut categories: Vec<String> = Vec::new();
    for term in entry
        .children()
        .filter(|n| n.is_element() && n.has_tag_name("category"))
        .filter_map(|n| n.attribute("term"))
    {
        if !categories.iter().any(|c| c == term) {
            categories.push(term.to_string());
        }
    }

    let published = child_text(entry, "published").and_then(|p| parse_timestamp(&p));
    let pdf_url = config.pdf_url(&arxiv_id);

    Ok(FetchedArticle {
        arxiv_id,
        title,
        authors,
        abstract_text,
        categories,
        published,
        pdf_url,
        full_text: None,
        text_length: None,
    })
}

/// Extract the unversioned identifier from an entry id URL.
///
/// `http://arxiv.org/abs/2301.07041v2` -> `2301.07041`
pub fn extract_arxiv_id(raw_id: &str) -> Option<String> {
    let tail = raw_id.trim().rsplit_once("/abs/").map(|(_, id)| id)?;
    let id = strip_version(tail.trim_end_matches('/'));
    (!id.is_empty()).then(|| id.to_string())
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .find(|n| n.is_element() && n.has_tag_name(name))
        .map(|n| {
            n.descendants()
                .filter(|d| d.is_text())
                .filter_map(|d| d.text())
                .collect::<String>()
        })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value.trim()) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(value, error = %e, "Unparseable published timestamp");
            None
        }
    }
}
