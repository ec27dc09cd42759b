//! Optional on-disk copies of intermediate datasets.

use crate::dataset::Dataset;
use crate::error::{Result, ResultExt};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the fetched, untransformed dataset.
pub const RAW_FILE_NAME: &str = "city_census.csv";

/// File name of the imputed and filtered dataset.
pub const TRANSFORMED_FILE_NAME: &str = "filtered_census.csv";

/// A directory that receives CSV snapshots between stages.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the fetched dataset. Returns the file written.
    pub fn stage_raw(&self, dataset: &Dataset) -> Result<PathBuf> {
        self.stage(RAW_FILE_NAME, dataset)
    }

    /// Write the transformed dataset. Returns the file written.
    pub fn stage_transformed(&self, dataset: &Dataset) -> Result<PathBuf> {
        self.stage(TRANSFORMED_FILE_NAME, dataset)
    }

    fn stage(&self, file_name: &str, dataset: &Dataset) -> Result<PathBuf> {
        let path = self.dir.join(file_name);
        dataset
            .write_csv_path(&path)
            .context(format!("Failed to stage {}", path.display()))?;
        debug!("Staged {} rows to {}", dataset.height(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_files_reload_equal() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path().join("staging"));
        let ds = Dataset::from_csv_bytes("state,age,weight\nIowa,35,\nIowa,40,80.5\n").unwrap();

        let raw = staging.stage_raw(&ds).unwrap();
        let transformed = staging.stage_transformed(&ds).unwrap();

        assert!(raw.ends_with(RAW_FILE_NAME));
        assert!(transformed.ends_with(TRANSFORMED_FILE_NAME));
        assert_eq!(Dataset::from_csv_path(&raw).unwrap(), ds);
    }
}
