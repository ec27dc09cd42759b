//! Stage events and cancellation support for the census pipeline.
//!
//! The pipeline reports what it is doing through a [`StageObserver`] rather
//! than logging from inside stages, so an orchestrator can forward events to
//! whatever sink it uses. A [`CancellationToken`] can stop a run from another
//! thread; it is checked between stages only.
//!
//! # Example
//!
//! ```rust,ignore
//! use census_pipeline::{CancellationToken, Pipeline};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! // In another thread
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     token_clone.cancel();
//! });
//!
//! let report = Pipeline::builder()
//!     .config(config)
//!     .cancellation_token(token)
//!     .on_event(|event| println!("[{:?}] {}", event.stage, event.message))
//!     .build()?
//!     .run();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of one pipeline run, plus the three terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading the raw CSV from the source
    Fetching,
    /// Imputing missing weights and filtering rows
    Transforming,
    /// Checking structure and non-emptiness
    Validating,
    /// Replacing the sink table
    Loading,
    /// Computing summary statistics
    Summarizing,
    /// Run finished successfully
    Complete,
    /// Run was cancelled between stages
    Cancelled,
    /// Run stopped on an error
    Failed,
}

impl PipelineStage {
    /// The five working stages, in execution order.
    pub const ORDER: [PipelineStage; 5] = [
        Self::Fetching,
        Self::Transforming,
        Self::Validating,
        Self::Loading,
        Self::Summarizing,
    ];

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Fetching => "Fetching Data",
            Self::Transforming => "Transforming Data",
            Self::Validating => "Validating Data",
            Self::Loading => "Loading Data",
            Self::Summarizing => "Summarizing Data",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run this stage typically takes (0.0 - 1.0).
    ///
    /// The working stages sum to 1.0; terminal states weigh nothing.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Fetching => 0.35,
            Self::Transforming => 0.25,
            Self::Validating => 0.05,
            Self::Loading => 0.30,
            Self::Summarizing => 0.05,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Fetching => 0.0,
            Self::Transforming => 0.35,
            Self::Validating => 0.60,
            Self::Loading => 0.65,
            Self::Summarizing => 0.95,
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Whether the run ends with this stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed)
    }
}

/// One event emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    /// Stage the event belongs to
    pub stage: PipelineStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Human-readable message
    pub message: String,

    /// Rows in the dataset when the stage finished, if applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
}

impl StageEvent {
    /// A stage is starting.
    pub fn started(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: stage.base_progress().clamp(0.0, 1.0),
            message: message.into(),
            rows: None,
        }
    }

    /// A stage finished with `rows` rows in hand.
    pub fn finished(stage: PipelineStage, rows: usize, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: (stage.base_progress() + stage.weight()).clamp(0.0, 1.0),
            message: message.into(),
            rows: Some(rows),
        }
    }

    /// The run completed.
    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Complete,
            progress: 1.0,
            message: message.into(),
            rows: None,
        }
    }

    /// The run was cancelled before `next` started.
    pub fn cancelled(next: PipelineStage) -> Self {
        Self {
            stage: PipelineStage::Cancelled,
            progress: next.base_progress(),
            message: format!("Pipeline cancelled before {}", next.display_name()),
            rows: None,
        }
    }

    /// The run failed during `stage`.
    pub fn failed(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Failed,
            progress: stage.base_progress(),
            message: format!("{} failed: {}", stage.display_name(), message.into()),
            rows: None,
        }
    }
}

/// Receives events during a pipeline run.
///
/// Implementations must be `Send + Sync` so a run can happen on a worker
/// thread while events go elsewhere.
///
/// # Example
///
/// ```rust,ignore
/// use census_pipeline::{StageEvent, StageObserver};
///
/// struct TracingObserver;
///
/// impl StageObserver for TracingObserver {
///     fn on_event(&self, event: &StageEvent) {
///         tracing::info!(stage = ?event.stage, "{}", event.message);
///     }
/// }
/// ```
pub trait StageObserver: Send + Sync {
    fn on_event(&self, event: &StageEvent);
}

/// Wrapper that implements [`StageObserver`] using a closure.
pub struct ClosureObserver<F>
where
    F: Fn(&StageEvent) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureObserver<F>
where
    F: Fn(&StageEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> StageObserver for ClosureObserver<F>
where
    F: Fn(&StageEvent) + Send + Sync,
{
    fn on_event(&self, event: &StageEvent) {
        (self.callback)(event);
    }
}

/// Token for cancelling a running pipeline.
///
/// Clones share state, so [`cancel()`](Self::cancel) may be called from any
/// thread. The pipeline checks the token before each stage and returns
/// [`PipelineError::Cancelled`](crate::error::PipelineError::Cancelled) once
/// it is set. A stage that has started always runs to completion or failure.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(StageEvent: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation of the pipeline.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if [`cancel()`](Self::cancel) has been called on this
    /// token or any of its clones.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused for another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
