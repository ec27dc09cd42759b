//! Local CSV file source.

use super::DataSource;
use crate::dataset::Dataset;
use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Reads the census CSV from disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for FileSource {
    fn fetch(&self) -> Result<Dataset> {
        info!("Reading {}", self.path.display());
        let bytes = std::fs::read(&self.path).map_err(|e| {
            PipelineError::SourceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        Dataset::from_csv_bytes(bytes)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
