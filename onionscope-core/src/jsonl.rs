// Durable JSON Lines files shared by the alert log and the checkpoint store

use crate::error::PersistenceError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Make sure the file and its parent directory exist, and that it ends on a
/// record boundary.
///
/// A crash mid-append leaves an unterminated last line. It is cut off here so
/// the next append starts a fresh line instead of extending the fragment.
pub(crate) fn touch(path: &Path) -> Result<(), PersistenceError> {
    let write_err = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_err)?;

    let content = fs::read(path).map_err(|source| PersistenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if content.last().is_some_and(|&b| b != b'\n') {
        let keep = content
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);
        warn!(
            "Dropping {} bytes of torn record at end of {}",
            content.len() - keep,
            path.display()
        );
        file.set_len(keep as u64).map_err(write_err)?;
        file.sync_data().map_err(write_err)?;
    }
    Ok(())
}

/// Append one record as a single line, flushed and synced before returning.
pub(crate) fn append<T: Serialize>(path: &Path, record: &T) -> Result<(), PersistenceError> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let write_err = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_err)?;
    file.write_all(line.as_bytes()).map_err(write_err)?;
    file.flush().map_err(write_err)?;
    file.sync_data().map_err(write_err)?;
    Ok(())
}

/// Read every record back in file order.
///
/// An unterminated final line is what a crash mid-append leaves behind; it
/// is skipped with a warning. Any other unreadable line is an error.
pub(crate) fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PersistenceError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read(path).map_err(|source| PersistenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let lines: Vec<&[u8]> = content.split(|&b| b == b'\n').collect();
    let last = lines.len().saturating_sub(1);
    let mut records = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice(line) {
            Ok(record) => records.push(record),
            Err(source) if idx == last => {
                warn!(
                    "Skipping torn record at end of {} ({})",
                    path.display(),
                    source
                );
            }
            Err(source) => {
                return Err(PersistenceError::Corrupt {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    source,
                });
            }
        }
    }

    Ok(records)
}

/// Replace `path` with `content` via a sibling temp file and a rename.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<(), PersistenceError> {
    let write_err = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp).map_err(write_err)?;
        file.write_all(content).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
    }
    fs::rename(&tmp, path).map_err(write_err)
}
