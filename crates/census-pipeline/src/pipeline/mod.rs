//! Pipeline module.
//!
//! This module provides the census pipeline, its stages and the
//! event/cancellation plumbing around them.

mod builder;
pub mod progress;
pub mod stages;
pub mod staging;

pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{CancellationToken, ClosureObserver, PipelineStage, StageEvent, StageObserver};
pub use stages::{Fetched, Loaded, Transformed, Validated};
pub use staging::StagingArea;
