use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while analyzing articles.
///
/// `Clone` because one cache computation hands its outcome to every caller
/// waiting on the same key.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalyzerError {
    #[error("transient LLM failure: {message}")]
    Transient {
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("LLM request rejected{}: {message}", .status.as_ref().map(|s| format!(" (status {s})")).unwrap_or_default())]
    Fatal { status: Option<u16>, message: String },

    #[error("failed to parse LLM response: {reason}")]
    Parse { reason: String },

    #[error("article not found: {0}")]
    NotFound(String),

    #[error("LLM request failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("analysis was cancelled before completing")]
    Cancelled,
}

/// Coarse classification reported to callers so they can retry selectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transient,
    Fatal,
    Parse,
    NotFound,
    InvalidInput,
    Config,
}

impl AnalyzerError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn fatal(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Fatal {
            status,
            message: message.into(),
        }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient { .. } | Self::RetriesExhausted { .. } | Self::Cancelled => {
                ErrorKind::Transient
            }
            Self::Fatal { .. } => ErrorKind::Fatal,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Only transient failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Server-provided hint for how long to wait before retrying.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Transient {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}

impl From<papersift_fetcher::FetcherError> for AnalyzerError {
    fn from(err: papersift_fetcher::FetcherError) -> Self {
        use papersift_fetcher::FetcherError;
        match err {
            FetcherError::NotFound(what) => Self::NotFound(what),
            FetcherError::InvalidRequest(_) | FetcherError::InvalidArxivId(_) => {
                Self::InvalidInput(err.to_string())
            }
            FetcherError::Http(_) | FetcherError::RetriesExhausted { .. } => {
                Self::transient(err.to_string())
            }
            FetcherError::Status { status, .. } if status >= 500 || status == 429 => {
                Self::transient(err.to_string())
            }
            FetcherError::Status { status, .. } => Self::fatal(Some(status), err.to_string()),
            FetcherError::Config(message) => Self::Config(message),
            other => Self::fatal(None, other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
