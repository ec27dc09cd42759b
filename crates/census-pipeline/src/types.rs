//! Result types shared between the pipeline and its callers.

use crate::imputers::ImputationReport;
use crate::profiler::SummaryStatistics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one successful pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run
    pub duration_ms: u64,
    /// Rows read from the source
    pub rows_fetched: usize,
    /// Rows left after filtering
    pub rows_after_filter: usize,
    /// How missing weights were resolved
    pub imputation: ImputationReport,
    /// Table that was replaced
    pub table_name: String,
    /// Rows written to the sink
    pub rows_loaded: usize,
    /// CSV snapshots written to the staging directory, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub staged_files: Vec<PathBuf>,
    /// Aggregates of the loaded rows
    pub summary: SummaryStatistics,
}
