//! Append-only identifier set, one decimal id per line

use super::{open_append, StoreError, StoreResult};
use crate::models::Identifier;
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Read every identifier in a cache file. A missing file is an empty set.
pub fn load_ids(path: &Path) -> StoreResult<HashSet<Identifier>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    let mut ids = HashSet::new();
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let id = trimmed.parse().map_err(|_| StoreError::Corrupt {
            path: path.to_path_buf(),
            line_no: idx + 1,
            line: line.to_string(),
        })?;
        ids.insert(id);
    }
    Ok(ids)
}

/// Append identifiers to a cache file, one per line.
pub fn append_ids(path: &Path, ids: &[Identifier]) -> StoreResult<()> {
    if ids.is_empty() {
        debug!("Nothing to add to cache {}", path.display());
        return Ok(());
    }

    let file = open_append(path)?;
    let mut writer = BufWriter::new(file);
    for id in ids {
        writeln!(writer, "{}", id).map_err(|e| StoreError::io(path, e))?;
    }
    writer.flush().map_err(|e| StoreError::io(path, e))?;
    debug!("Saved {} ids to {}", ids.len(), path.display());
    Ok(())
}

/// In-memory view of a cache file that keeps both sides in step.
///
/// Each instance is owned by exactly one worker.
#[derive(Debug)]
pub struct IdentityCache {
    name: &'static str,
    path: PathBuf,
    ids: HashSet<Identifier>,
}

impl IdentityCache {
    /// Materialize the whole cache file into memory.
    pub fn load(name: &'static str, path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let ids = load_ids(&path)?;
        info!("Loaded {} entries from {} cache {}", ids.len(), name, path.display());
        Ok(Self { name, path, ids })
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: Identifier) -> bool {
        self.ids.contains(&id)
    }

    /// Record identifiers as done, skipping ones already present.
    ///
    /// The file is written before memory is updated, so a failed write never
    /// leaves the in-memory set claiming more than the disk holds.
    /// Returns how many identifiers were new.
    pub fn insert_all(&mut self, ids: impl IntoIterator<Item = Identifier>) -> StoreResult<usize> {
        let mut seen = HashSet::new();
        let fresh: Vec<Identifier> = ids
            .into_iter()
            .filter(|id| !self.ids.contains(id) && seen.insert(*id))
            .collect();

        append_ids(&self.path, &fresh)?;
        self.ids.extend(fresh.iter().copied());
        Ok(fresh.len())
    }

    pub fn insert(&mut self, id: Identifier) -> StoreResult<bool> {
        Ok(self.insert_all(std::iter::once(id))? == 1)
    }
}
