//! Durable append-only stores
//!
//! Four plain-text files back a crawl:
//!
//! - discovery cache: identifiers whose adjacency list was fetched
//! - hydration cache: identifiers whose profile was resolved
//! - edge store: one `source,adjacent...` row per walked identifier
//! - node store: one profile row per hydrated identifier
//!
//! Nothing is ever rewritten or removed. Any I/O failure surfaces as a
//! [`StoreError`] and aborts the crawl.

mod edges;
mod identity_cache;
mod nodes;

pub use edges::EdgeStore;
pub use identity_cache::{append_ids, load_ids, IdentityCache};
pub use nodes::NodeStore;

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the on-disk stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Corrupt cache entry {line:?} at {}:{line_no}", .path.display())]
    Corrupt {
        path: PathBuf,
        line_no: usize,
        line: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        StoreError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// True when the file is missing or has no content yet.
///
/// A zero-length file is what a crash between create and first write leaves
/// behind, so it still gets a header.
fn needs_header(path: &Path) -> StoreResult<bool> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(meta.len() == 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

fn open_append(path: &Path) -> StoreResult<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))
}

/// Count data rows (excluding the header) of a record store.
///
/// Returns 0 for a missing file.
pub fn count_rows(path: &Path) -> StoreResult<usize> {
    if !path.exists() {
        return Ok(0);
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_path(path)
        .map_err(|e| StoreError::csv(path, e))?;

    let mut rows = 0;
    for record in reader.records() {
        record.map_err(|e| StoreError::csv(path, e))?;
        rows += 1;
    }
    Ok(rows)
}
