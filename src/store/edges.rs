//! Edge store: one row per walked source identifier

use super::{needs_header, open_append, StoreError, StoreResult};
use crate::models::Identifier;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct EdgeStore {
    path: PathBuf,
}

impl EdgeStore {
    /// Open the store, writing `source_id,<adjacency_label>` iff the file is new.
    pub fn initialize(path: impl Into<PathBuf>, adjacency_label: &str) -> StoreResult<Self> {
        let path = path.into();
        if needs_header(&path)? {
            let store = Self { path };
            store.write_row(["source_id", adjacency_label])?;
            return Ok(store);
        }
        info!("Edges file {} already exists, won't overwrite", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `source, adjacent_1, adjacent_2, ...` as a single row.
    pub fn append_edge(&self, source: Identifier, adjacent: &[Identifier]) -> StoreResult<()> {
        let row = std::iter::once(source)
            .chain(adjacent.iter().copied())
            .map(|id| id.to_string());
        self.write_row(row)
    }

    fn write_row<I, S>(&self, fields: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let file = open_append(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(file);
        writer
            .write_record(fields)
            .map_err(|e| StoreError::csv(&self.path, e))?;
        writer.flush().map_err(|e| StoreError::io(&self.path, e))
    }
}
