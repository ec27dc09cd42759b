//! Grouped median imputation with a dataset-wide fallback.

use super::group_statistics::{GroupKey, GroupStatistics};
use crate::config::MissingFallbackPolicy;
use crate::dataset::{Dataset, Row, WEIGHT_COLUMN};
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Counts of how each missing weight was resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputationReport {
    /// Filled with the median of the row's `(state, age)` group.
    pub filled_from_group: usize,
    /// Filled with the dataset-wide median.
    pub filled_from_global: usize,
    /// Left null because no weight was known anywhere.
    pub left_null: usize,
    /// The dataset-wide median, if any weight was known.
    pub global_median: Option<f64>,
}

impl ImputationReport {
    /// Total number of values that were filled.
    pub fn total_filled(&self) -> usize {
        self.filled_from_group + self.filled_from_global
    }
}

/// Fills null `weight` entries from group medians, then the global median.
///
/// Medians are taken over the values present before imputation, so the
/// order in which rows are filled never changes the result. Non-null
/// weights are left as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupedMedianImputer {
    policy: MissingFallbackPolicy,
}

impl GroupedMedianImputer {
    pub fn new(policy: MissingFallbackPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MissingFallbackPolicy {
        self.policy
    }

    /// Impute missing weights.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InsufficientData`] when a weight is missing,
    /// no weight is known anywhere in the dataset, and the policy is
    /// [`MissingFallbackPolicy::Fail`].
    pub fn impute(&self, dataset: Dataset) -> Result<(Dataset, ImputationReport)> {
        if dataset.weight_null_count() == 0 {
            return Ok((dataset, ImputationReport::default()));
        }

        let stats = GroupStatistics::from_dataset(&dataset)?;
        let mut report = ImputationReport {
            global_median: stats.global_median(),
            ..Default::default()
        };

        if stats.global_median().is_none() && self.policy == MissingFallbackPolicy::Fail {
            return Err(PipelineError::InsufficientData {
                column: WEIGHT_COLUMN.to_string(),
            });
        }

        let filled: Vec<Option<f64>> = dataset
            .rows()?
            .map(|row| fill_one(&row, &stats, &mut report))
            .collect();

        if report.left_null > 0 {
            warn!(
                "No weight known in the dataset; {} value(s) left null",
                report.left_null
            );
        }
        debug!(
            "Imputed weight: {} from group, {} from global median {:?}",
            report.filled_from_group, report.filled_from_global, report.global_median
        );

        let weight = Series::new(WEIGHT_COLUMN.into(), filled);
        let dataset = dataset.with_weight(weight)?;
        Ok((dataset, report))
    }
}

fn fill_one(row: &Row<'_>, stats: &GroupStatistics, report: &mut ImputationReport) -> Option<f64> {
    if row.weight.is_some() {
        return row.weight;
    }

    let group = match (row.state, row.age) {
        (Some(state), Some(age)) => stats.group_median(&GroupKey::new(state, age)),
        _ => None,
    };

    if let Some(value) = group {
        report.filled_from_group += 1;
        return Some(value);
    }

    match stats.global_median() {
        Some(value) => {
            report.filled_from_global += 1;
            Some(value)
        }
        None => {
            report.left_null += 1;
            None
        }
    }
}
