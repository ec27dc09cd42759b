//! Imputation of missing `weight` values.
//!
//! Nulls are filled from the median weight of rows sharing the same
//! `(state, age)`, falling back to the median over the whole dataset.
//! What happens when no weight is known at all is set by
//! [`MissingFallbackPolicy`](crate::config::MissingFallbackPolicy).

mod group_statistics;
mod grouped_median;

pub use group_statistics::{GroupKey, GroupStatistics};
pub use grouped_median::{GroupedMedianImputer, ImputationReport};
