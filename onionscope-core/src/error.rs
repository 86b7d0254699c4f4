use std::path::PathBuf;
use thiserror::Error;

/// A keyword table or custom category source that could not be used.
///
/// Never fatal: the affected source simply contributes nothing.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Source not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source has no usable entries")]
    Empty,
}

/// A checkpoint or alert write that did not reach disk.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Corrupt record at {path}:{line}: {source}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Conditions that end a crawl run.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
