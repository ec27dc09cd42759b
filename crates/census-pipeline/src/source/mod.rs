//! Data sources for the fetch stage.
//!
//! A [`DataSource`] yields the raw census table as a [`Dataset`]. The
//! pipeline never assumes a transport; [`HttpSource`] and [`FileSource`]
//! cover the two configured kinds.
//!
//! # Implementing a New Source
//!
//! Implement [`DataSource`] for your type and hand it to
//! [`PipelineBuilder::source`](crate::pipeline::PipelineBuilder::source).

mod file;
mod http;

pub use file::FileSource;
pub use http::HttpSource;

use crate::config::SourceConfig;
use crate::dataset::Dataset;
use crate::error::Result;

/// Where raw census data comes from.
///
/// Implementations must be `Send` so a pipeline can be moved to a worker
/// thread.
pub trait DataSource: Send {
    /// Read the whole source and parse it.
    ///
    /// Transport failures map to
    /// [`SourceUnavailable`](crate::error::PipelineError::SourceUnavailable);
    /// content that is not a single CSV table maps to
    /// [`MalformedInput`](crate::error::PipelineError::MalformedInput).
    fn fetch(&self) -> Result<Dataset>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Build the source a configuration names.
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn DataSource>> {
    Ok(match config {
        SourceConfig::Http { url, timeout_secs } => {
            Box::new(HttpSource::new(url.clone(), *timeout_secs)?)
        }
        SourceConfig::File { path } => Box::new(FileSource::new(path.clone())),
    })
}
