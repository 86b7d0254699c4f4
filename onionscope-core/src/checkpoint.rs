use crate::error::PersistenceError;
use crate::jsonl;
use onionscope_scanner::page::PageRecord;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Every processed page, one JSON line each, in crawl order.
pub struct CheckpointStore {
    path: PathBuf,
    written: usize,
}

impl CheckpointStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        jsonl::touch(&path)?;
        Ok(Self { path, written: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pages appended through this handle.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Persist `record`. It is on disk before this returns.
    pub fn append_page(&mut self, record: &PageRecord) -> Result<(), PersistenceError> {
        jsonl::append(&self.path, record)?;
        self.written += 1;
        debug!("Checkpointed {} ({} this session)", record.url, self.written);
        Ok(())
    }

    /// Every page in the file, including ones from earlier handles.
    pub fn load_all(&self) -> Result<Vec<PageRecord>, PersistenceError> {
        jsonl::read_all(&self.path)
    }
}
