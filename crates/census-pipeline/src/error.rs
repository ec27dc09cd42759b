//! Error types for the census pipeline.
//!
//! Every stage either completes or fails with one of the variants below.
//! Nothing is swallowed or downgraded to a warning inside the library; the
//! caller (CLI or an external orchestrator) decides on retries and alerting
//! using [`PipelineError::is_retryable`].
//!
//! Errors are serializable so an orchestrator can forward them as
//! structured `{code, message}` payloads.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Fetching the source failed (network, timeout, bad HTTP status).
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// The source is not a single well-formed CSV table.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A stage that needs rows was given none.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// No statistic exists to resolve missing values in a column.
    #[error("Insufficient data in column '{column}': no non-null values to derive a fallback")]
    InsufficientData { column: String },

    /// Writing to the sink failed; the previous table content is kept.
    #[error("Failed to write to sink: {0}")]
    SinkWrite(String),

    /// A required column is absent.
    #[error("Column '{0}' not found in dataset")]
    MissingColumn(String),

    /// A required column has an unexpected type.
    #[error("Column '{column}' has type {found}, expected {expected}")]
    ColumnType {
        column: String,
        expected: String,
        found: String,
    },

    /// The run was cancelled before a stage started.
    #[error("Pipeline cancelled")]
    Cancelled,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for orchestrators and log processors.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
            Self::MalformedInput(_) => "MALFORMED_INPUT",
            Self::EmptyDataset => "EMPTY_DATASET",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::SinkWrite(_) => "SINK_WRITE",
            Self::MissingColumn(_) => "MISSING_COLUMN",
            Self::ColumnType { .. } => "COLUMN_TYPE",
            Self::Cancelled => "CANCELLED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Whether re-running the failed stage with the same input may succeed.
    ///
    /// Only transient I/O against the outside world qualifies: fetching the
    /// source and writing the sink. Data-quality failures need intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SourceUnavailable(_) | Self::SinkWrite(_) => true,
            Self::WithContext { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 3)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.serialize_field("retryable", &self.is_retryable())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}
