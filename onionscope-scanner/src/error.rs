use std::time::Duration;
use thiserror::Error;

/// Why a single URL could not be fetched. Recorded on the page, never fatal.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed (anonymity layer or host unreachable): {0}")]
    Connect(String),

    #[error("Blocked by remote host (HTTP {0})")]
    Blocked(u16),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Fetcher unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

/// Raw content that the extractor refuses to treat as a document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error: empty document")]
    EmptyDocument,

    #[error("Parse error: content is binary, not markup")]
    BinaryContent,

    #[error("Parse error: invalid base URL {0}")]
    InvalidBaseUrl(String),
}

#[derive(Error, Debug)]
pub enum RotationError {
    #[error("Control port I/O failed: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Control port rejected {command}: {reply}")]
    Rejected { command: String, reply: String },

    #[error("Control port closed the connection")]
    ConnectionClosed,
}
