//! Summary statistics for a processed dataset.

mod statistics;

pub use statistics::{StatisticsSummarizer, SummaryStatistics};

use crate::dataset::Dataset;
use crate::error::Result;

/// Summarize with [`StatisticsSummarizer`].
pub fn summarize(dataset: &Dataset) -> Result<SummaryStatistics> {
    StatisticsSummarizer::summarize(dataset)
}
