//! Full-text extraction from article PDFs.

use reqwest::Client;

use crate::error::{FetcherError, Result};
use crate::http::download_bytes;

/// Suffix appended when extracted text was cut off.
const TRUNCATION_MARKER: &str = "...";

/// Download a PDF and extract its text, capped at `max_chars` characters.
pub async fn fetch_full_text(client: &Client, pdf_url: &str, max_chars: usize) -> Result<String> {
    let bytes = download_bytes(client, pdf_url).await?;
    tracing::debug!(url = pdf_url, size = bytes.len(), "Downloaded PDF");

    let url = pdf_url.to_string();
    // pdf-extract is CPU bound and may panic on malformed input
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| FetcherError::PdfExtraction {
            url: url.clone(),
            message: format!("extraction task failed: {e}"),
        })?
        .map_err(|e| FetcherError::PdfExtraction {
            url: url.clone(),
            message: e.to_string(),
        })?;

    Ok(truncate_text(&text, max_chars))
}

/// Keep at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}{TRUNCATION_MARKER}", &text[..byte_index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_short() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("exact", 5), "exact");
    }

    #[test]
    fn test_truncate_text_long() {
        assert_eq!(truncate_text("abcdefgh", 3), "abc...");
    }

    #[test]
    fn test_truncate_text_multibyte() {
        assert_eq!(truncate_text("ééééé", 2), "éé...");
    }
}
