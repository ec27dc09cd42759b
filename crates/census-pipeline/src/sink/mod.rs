//! Relational sinks for the load stage.
//!
//! A [`DataSink`] replaces a named table with the rows of a dataset. The
//! replacement is all-or-nothing: on failure the previous content of the
//! table is kept and [`SinkWrite`](crate::error::PipelineError::SinkWrite)
//! is returned.

mod sqlite;

pub use sqlite::SqliteSink;

use crate::dataset::Dataset;
use crate::error::Result;

/// Destination of the load stage.
pub trait DataSink: Send {
    /// Drop and recreate `table` with exactly the rows of `dataset`.
    ///
    /// Returns the number of rows written. Loading the same dataset twice
    /// leaves the table in the same state as loading it once.
    fn replace_table(&mut self, table: &str, dataset: &Dataset) -> Result<usize>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}
