//! The five pipeline stages.
//!
//! Each stage is available as a free function with explicit inputs and
//! outputs, so an external orchestrator can wrap it with its own retry
//! policy. The typestate wrappers ([`Fetched`], [`Transformed`],
//! [`Validated`], [`Loaded`]) chain the same functions so that stages can
//! only run in order.

use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::filter::{census_predicate, filter};
use crate::imputers::{GroupedMedianImputer, ImputationReport};
use crate::profiler::{StatisticsSummarizer, SummaryStatistics};
use crate::quality::Validator;
use crate::sink::DataSink;
use crate::source::DataSource;

/// Read the raw dataset from a source.
pub fn fetch(source: &dyn DataSource) -> Result<Dataset> {
    source.fetch()
}

/// Impute missing weights, then keep the rows matching the configured filter.
pub fn transform(dataset: Dataset, config: &PipelineConfig) -> Result<Dataset> {
    transform_with_report(dataset, config).map(|(dataset, _)| dataset)
}

/// [`transform`], also returning how the missing weights were resolved.
///
/// Medians are computed over the whole fetched dataset, before filtering.
pub fn transform_with_report(
    dataset: Dataset,
    config: &PipelineConfig,
) -> Result<(Dataset, ImputationReport)> {
    let imputer = GroupedMedianImputer::new(config.missing_fallback);
    let (imputed, report) = imputer.impute(dataset)?;
    let filtered = filter(&imputed, &census_predicate(&config.filter))?;
    Ok((filtered, report))
}

/// Fail-fast structural checks.
pub fn validate(dataset: &Dataset, config: &PipelineConfig) -> Result<()> {
    Validator::new(config.require_complete_weight).validate(dataset)
}

/// Replace the configured table with the dataset. Returns rows written.
pub fn load(dataset: &Dataset, sink: &mut dyn DataSink, table: &str) -> Result<usize> {
    sink.replace_table(table, dataset)
}

/// Scalar aggregates of the loaded dataset.
pub fn summarize(dataset: &Dataset) -> Result<SummaryStatistics> {
    StatisticsSummarizer::summarize(dataset)
}

/// Raw data read from the source.
#[derive(Debug, Clone)]
pub struct Fetched {
    dataset: Dataset,
}

impl Fetched {
    pub fn from_source(source: &dyn DataSource) -> Result<Self> {
        Ok(Self::new(fetch(source)?))
    }

    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn transform(self, config: &PipelineConfig) -> Result<Transformed> {
        let (dataset, imputation) = transform_with_report(self.dataset, config)?;
        Ok(Transformed {
            dataset,
            imputation,
        })
    }
}

/// Imputed and filtered data.
#[derive(Debug, Clone)]
pub struct Transformed {
    dataset: Dataset,
    imputation: ImputationReport,
}

impl Transformed {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn imputation(&self) -> &ImputationReport {
        &self.imputation
    }

    pub fn validate(self, config: &PipelineConfig) -> Result<Validated> {
        validate(&self.dataset, config)?;
        Ok(Validated {
            dataset: self.dataset,
            imputation: self.imputation,
        })
    }
}

/// Data that passed validation and may be loaded.
#[derive(Debug, Clone)]
pub struct Validated {
    dataset: Dataset,
    imputation: ImputationReport,
}

impl Validated {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn load(self, sink: &mut dyn DataSink, table: &str) -> Result<Loaded> {
        let rows_loaded = load(&self.dataset, sink, table)?;
        Ok(Loaded {
            dataset: self.dataset,
            imputation: self.imputation,
            rows_loaded,
        })
    }
}

/// Data persisted to the sink.
#[derive(Debug, Clone)]
pub struct Loaded {
    dataset: Dataset,
    imputation: ImputationReport,
    rows_loaded: usize,
}

impl Loaded {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn imputation(&self) -> &ImputationReport {
        &self.imputation
    }

    pub fn rows_loaded(&self) -> usize {
        self.rows_loaded
    }

    pub fn summarize(&self) -> Result<SummaryStatistics> {
        summarize(&self.dataset)
    }
}
