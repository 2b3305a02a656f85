//! Node store: one sanitized profile row per hydrated identifier

use super::{needs_header, open_append, StoreError, StoreResult};
use crate::models::{ProfileRecord, PROFILE_COLUMNS};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct NodeStore {
    path: PathBuf,
}

impl NodeStore {
    /// Open the store, writing the profile header iff the file is new.
    pub fn initialize(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if !needs_header(&path)? {
            info!("Nodes file {} already exists, won't overwrite", path.display());
            return Ok(Self { path });
        }

        let mut writer = Self::writer(&path)?;
        writer
            .write_record(PROFILE_COLUMNS)
            .map_err(|e| StoreError::csv(&path, e))?;
        writer.flush().map_err(|e| StoreError::io(&path, e))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sanitize descriptions and append one row per record.
    pub fn append_records(&self, records: &[ProfileRecord]) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut writer = Self::writer(&self.path)?;
        for record in records {
            let mut clean = record.clone();
            clean.sanitize();
            writer
                .serialize(&clean)
                .map_err(|e| StoreError::csv(&self.path, e))?;
        }
        writer.flush().map_err(|e| StoreError::io(&self.path, e))?;
        Ok(records.len())
    }

    fn writer(path: &Path) -> StoreResult<csv::Writer<std::fs::File>> {
        let file = open_append(path)?;
        Ok(csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file))
    }
}
