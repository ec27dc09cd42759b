//! Summary statistics over the loaded dataset.

use crate::dataset::{AGE_COLUMN, Dataset, WEIGHT_COLUMN};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scalar aggregates reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub mean_age: f64,
    pub mean_weight: f64,
    pub total_rows: usize,
}

/// Computes [`SummaryStatistics`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsSummarizer;

impl StatisticsSummarizer {
    /// Mean age, mean of the non-null weights, and row count.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::EmptyDataset`] for zero rows.
    /// - [`PipelineError::InsufficientData`] if a column has no non-null value.
    pub fn summarize(dataset: &Dataset) -> Result<SummaryStatistics> {
        if dataset.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }

        let stats = SummaryStatistics {
            mean_age: column_mean(dataset, AGE_COLUMN)?,
            mean_weight: column_mean(dataset, WEIGHT_COLUMN)?,
            total_rows: dataset.height(),
        };

        debug!("Summary: {:?}", stats);
        Ok(stats)
    }
}

fn column_mean(dataset: &Dataset, name: &str) -> Result<f64> {
    let column = dataset
        .frame()
        .column(name)
        .map_err(|_| PipelineError::MissingColumn(name.to_string()))?;

    column.as_materialized_series().mean().ok_or_else(|| {
        PipelineError::InsufficientData {
            column: name.to_string(),
        }
    })
}
