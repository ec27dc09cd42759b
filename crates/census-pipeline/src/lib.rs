//! Census Batch Pipeline Library
//!
//! A scheduled batch job built with Rust and Polars: fetch a census CSV,
//! impute missing weights, filter, validate, load into SQLite and summarize.
//!
//! # Overview
//!
//! - **Fetch**: read the raw CSV over HTTP(S) or from disk ([`source`])
//! - **Transform**: fill null weights from the `(state, age)` group median,
//!   falling back to the dataset-wide median ([`imputers`]), then keep rows
//!   with `age > 30 AND state == "Iowa"` ([`filter`])
//! - **Validate**: required columns, types, non-emptiness ([`quality`])
//! - **Load**: replace a table in one transaction ([`sink`])
//! - **Summarize**: mean age, mean weight, row count ([`profiler`])
//!
//! Each stage is also a free function in [`pipeline::stages`], so an external
//! orchestrator can wrap stages with its own retry policy.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use census_pipeline::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .database_path("census.db")
//!     .staging_dir("staging")
//!     .build()?;
//!
//! let report = Pipeline::builder()
//!     .config(config)
//!     .on_event(|event| println!("[{:.0}%] {}", event.progress * 100.0, event.message))
//!     .build()?
//!     .run()?;
//!
//! println!("{:?}", report.summary);
//! ```
//!
//! # Running Stages Individually
//!
//! ```rust,ignore
//! use census_pipeline::pipeline::stages;
//! use census_pipeline::{FileSource, PipelineConfig, SqliteSink};
//!
//! let config = PipelineConfig::default();
//! let raw = stages::fetch(&FileSource::new("city_census.csv"))?;
//! let transformed = stages::transform(raw, &config)?;
//! stages::validate(&transformed, &config)?;
//! stages::load(&transformed, &mut SqliteSink::open("census.db")?, "census_data")?;
//! let summary = stages::summarize(&transformed)?;
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod imputers;
pub mod pipeline;
pub mod profiler;
pub mod quality;
pub mod sink;
pub mod source;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, FilterConfig, MissingFallbackPolicy, PipelineConfig,
    PipelineConfigBuilder, SourceConfig,
};
pub use dataset::{AGE_COLUMN, Dataset, Row, STATE_COLUMN, WEIGHT_COLUMN};
pub use error::{PipelineError, Result, ResultExt};
pub use filter::{AgeAbove, And, FnPredicate, RowPredicate, StateEquals, census_predicate};
pub use imputers::{GroupKey, GroupStatistics, GroupedMedianImputer, ImputationReport};
pub use pipeline::{
    CancellationToken, ClosureObserver, Pipeline, PipelineBuilder, PipelineStage, StageEvent,
    StageObserver, StagingArea,
};
pub use profiler::{StatisticsSummarizer, SummaryStatistics};
pub use quality::Validator;
pub use sink::{DataSink, SqliteSink};
pub use source::{DataSource, FileSource, HttpSource};
pub use types::PipelineReport;
