//! Per-group and dataset-wide weight medians.

use crate::dataset::{AGE_COLUMN, Dataset, STATE_COLUMN, WEIGHT_COLUMN};
use crate::error::Result;
use polars::prelude::*;
use std::collections::HashMap;

/// Rows are grouped by state and age.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub state: String,
    pub age: i64,
}

impl GroupKey {
    pub fn new(state: impl Into<String>, age: i64) -> Self {
        Self {
            state: state.into(),
            age,
        }
    }
}

/// Medians of the non-null weights, computed once before any value is filled.
///
/// Groups with no non-null weight have no entry. Rows with a null state or
/// age belong to no group but still contribute to the global median.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupStatistics {
    group_medians: HashMap<GroupKey, f64>,
    global_median: Option<f64>,
}

impl GroupStatistics {
    /// Compute every median from the weights present in `dataset`.
    ///
    /// Nulls are skipped by Polars' median, so a group whose weights are
    /// all null ends up without an entry.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let grouped = dataset
            .frame()
            .clone()
            .lazy()
            .group_by([col(STATE_COLUMN), col(AGE_COLUMN)])
            .agg([col(WEIGHT_COLUMN).median()])
            .collect()?;

        let states = grouped.column(STATE_COLUMN)?.as_materialized_series().str()?;
        let ages = grouped.column(AGE_COLUMN)?.as_materialized_series().i64()?;
        let medians = grouped.column(WEIGHT_COLUMN)?.as_materialized_series().f64()?;

        let group_medians = states
            .into_iter()
            .zip(ages)
            .zip(medians)
            .filter_map(|((state, age), median)| {
                Some((GroupKey::new(state?, age?), median?))
            })
            .collect();

        let global_median = dataset
            .frame()
            .column(WEIGHT_COLUMN)?
            .as_materialized_series()
            .median();

        Ok(Self {
            group_medians,
            global_median,
        })
    }

    /// Median weight of a group, if the group has any known weight.
    pub fn group_median(&self, key: &GroupKey) -> Option<f64> {
        self.group_medians.get(key).copied()
    }

    /// Median of every known weight in the dataset.
    pub fn global_median(&self) -> Option<f64> {
        self.global_median
    }

    /// Number of groups with a median.
    pub fn group_count(&self) -> usize {
        self.group_medians.len()
    }
}
