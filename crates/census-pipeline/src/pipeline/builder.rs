//! Main census pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! running fetch → transform → validate → load → summarize once.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::progress::{
    CancellationToken, ClosureObserver, PipelineStage, StageEvent, StageObserver,
};
use crate::pipeline::stages::Fetched;
use crate::pipeline::staging::StagingArea;
use crate::sink::{DataSink, SqliteSink};
use crate::source::{self, DataSource};
use crate::types::PipelineReport;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The census batch pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use census_pipeline::{Pipeline, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .source_file("data/city_census.csv")
///     .database_path("census.db")
///     .build()?;
///
/// let report = Pipeline::builder()
///     .config(config)
///     .on_event(|event| println!("[{:.0}%] {}", event.progress * 100.0, event.message))
///     .build()?
///     .run()?;
///
/// println!("Mean weight: {}", report.summary.mean_weight);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    source: Box<dyn DataSource>,
    sink: Option<Box<dyn DataSink>>,
    observer: Option<Arc<dyn StageObserver>>,
    cancellation_token: CancellationToken,
}

// Runs may be moved to a worker thread by an orchestrator.
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage once.
    ///
    /// The cancellation token is checked before each stage. The observer
    /// receives a start and finish event per stage, then exactly one of
    /// `Complete`, `Cancelled` or `Failed`.
    ///
    /// # Errors
    ///
    /// Returns the first stage error unchanged, or
    /// [`PipelineError::Cancelled`] if the token fired.
    pub fn run(&mut self) -> Result<PipelineReport> {
        let mut stage = PipelineStage::Fetching;

        match self.run_internal(&mut stage) {
            Ok(report) => {
                self.emit(StageEvent::complete(format!(
                    "Loaded {} rows into '{}'",
                    report.rows_loaded, report.table_name
                )));
                Ok(report)
            }
            Err(e) => {
                if e.is_cancelled() {
                    warn!("Pipeline cancelled before {}", stage.display_name());
                    self.emit(StageEvent::cancelled(stage));
                } else {
                    error!("{} failed: {}", stage.display_name(), e);
                    self.emit(StageEvent::failed(stage, e.to_string()));
                }
                Err(e)
            }
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    fn emit(&self, event: StageEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }

    /// Mark `next` as the current stage once the token allows it to start.
    fn enter(&self, stage: &mut PipelineStage, next: PipelineStage, message: &str) -> Result<()> {
        *stage = next;
        self.check_cancelled()?;
        info!("{}", message);
        self.emit(StageEvent::started(next, message));
        Ok(())
    }

    fn run_internal(&mut self, stage: &mut PipelineStage) -> Result<PipelineReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        let staging = self.config.staging_dir.as_ref().map(StagingArea::new);
        let mut staged_files = Vec::new();

        // Fetch
        self.enter(
            stage,
            PipelineStage::Fetching,
            &format!("Fetching from {}", self.source.describe()),
        )?;
        let fetched = Fetched::from_source(self.source.as_ref())?;
        let rows_fetched = fetched.dataset().height();
        if let Some(staging) = &staging {
            staged_files.push(staging.stage_raw(fetched.dataset())?);
        }
        self.emit(StageEvent::finished(
            PipelineStage::Fetching,
            rows_fetched,
            format!("Fetched {} rows", rows_fetched),
        ));

        // Transform
        self.enter(stage, PipelineStage::Transforming, "Imputing and filtering")?;
        let transformed = fetched.transform(&self.config)?;
        let rows_after_filter = transformed.dataset().height();
        let imputation = transformed.imputation().clone();
        debug!("Imputation: {:?}", imputation);
        if let Some(staging) = &staging {
            staged_files.push(staging.stage_transformed(transformed.dataset())?);
        }
        self.emit(StageEvent::finished(
            PipelineStage::Transforming,
            rows_after_filter,
            format!(
                "Filled {} weights, kept {} of {} rows",
                imputation.total_filled(),
                rows_after_filter,
                rows_fetched
            ),
        ));

        // Validate
        self.enter(stage, PipelineStage::Validating, "Validating")?;
        let validated = transformed.validate(&self.config)?;
        self.emit(StageEvent::finished(
            PipelineStage::Validating,
            rows_after_filter,
            "Validation passed",
        ));

        // Load
        let table_name = self.config.table_name.clone();
        self.enter(
            stage,
            PipelineStage::Loading,
            &format!("Replacing table '{}'", table_name),
        )?;
        let sink = self.sink()?;
        let loaded = validated.load(sink, &table_name)?;
        let rows_loaded = loaded.rows_loaded();
        self.emit(StageEvent::finished(
            PipelineStage::Loading,
            rows_loaded,
            format!("Loaded {} rows", rows_loaded),
        ));

        // Summarize
        self.enter(stage, PipelineStage::Summarizing, "Summarizing")?;
        let summary = loaded.summarize()?;
        self.emit(StageEvent::finished(
            PipelineStage::Summarizing,
            summary.total_rows,
            format!(
                "mean_age={:.2} mean_weight={:.2} total_rows={}",
                summary.mean_age, summary.mean_weight, summary.total_rows
            ),
        ));

        Ok(PipelineReport {
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            rows_fetched,
            rows_after_filter,
            imputation,
            table_name,
            rows_loaded,
            staged_files,
            summary,
        })
    }

    /// The configured sink, opening the SQLite database on first use.
    fn sink(&mut self) -> Result<&mut dyn DataSink> {
        if self.sink.is_none() {
            let sink = SqliteSink::open(&self.config.database_path)?;
            self.sink = Some(Box::new(sink));
        }
        match self.sink.as_deref_mut() {
            Some(sink) => Ok(sink),
            None => Err(PipelineError::SinkWrite("no sink available".to_string())),
        }
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Source and sink default to what the configuration names: an HTTP or file
/// source, and a SQLite database at `database_path`.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    source: Option<Box<dyn DataSource>>,
    sink: Option<Box<dyn DataSink>>,
    observer: Option<Arc<dyn StageObserver>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the source named by the configuration.
    pub fn source(mut self, source: impl DataSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Override the SQLite sink named by the configuration.
    pub fn sink(mut self, sink: impl DataSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Set an observer for stage events.
    pub fn observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Set a closure that receives stage events.
    ///
    /// For more complex scenarios, use [`observer`](Self::observer).
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(&StageEvent) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(ClosureObserver::new(callback)));
        self
    }

    /// Set a cancellation token for stopping the pipeline between stages.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the configuration does not
    /// validate or the configured source cannot be created.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let source = match self.source {
            Some(source) => source,
            None => source::from_config(&config.source)?,
        };

        Ok(Pipeline {
            config,
            source,
            sink: self.sink,
            observer: self.observer,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use std::sync::Mutex;

    struct FixedSource(&'static str);

    impl DataSource for FixedSource {
        fn fetch(&self) -> Result<Dataset> {
            Dataset::from_csv_bytes(self.0)
        }

        fn describe(&self) -> String {
            "fixture".to_string()
        }
    }

    const RAW: &str = "state,age,weight\nIowa,35,70\nIowa,35,\nIowa,40,80\nOhio,50,90\n";

    fn recorder() -> (Arc<Mutex<Vec<StageEvent>>>, impl Fn(&StageEvent) + Send + Sync + 'static) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        (events, move |e: &StageEvent| sink.lock().unwrap().push(e.clone()))
    }

    #[test]
    fn test_run_emits_stage_events_in_order() {
        let (events, callback) = recorder();
        let mut pipeline = Pipeline::builder()
            .source(FixedSource(RAW))
            .sink(SqliteSink::open_in_memory().unwrap())
            .on_event(callback)
            .build()
            .unwrap();

        let report = pipeline.run().unwrap();
        assert_eq!(report.rows_fetched, 4);
        assert_eq!(report.rows_after_filter, 3);
        assert_eq!(report.rows_loaded, 3);
        assert_eq!(report.imputation.filled_from_group, 1);

        let stages: Vec<PipelineStage> = events.lock().unwrap().iter().map(|e| e.stage).collect();
        let mut expected = Vec::new();
        for stage in PipelineStage::ORDER {
            expected.push(stage);
            expected.push(stage);
        }
        expected.push(PipelineStage::Complete);
        assert_eq!(stages, expected);
    }

    #[test]
    fn test_cancelled_before_start() {
        let (events, callback) = recorder();
        let token = CancellationToken::new();
        token.cancel();

        let mut pipeline = Pipeline::builder()
            .source(FixedSource(RAW))
            .sink(SqliteSink::open_in_memory().unwrap())
            .cancellation_token(token)
            .on_event(callback)
            .build()
            .unwrap();

        let err = pipeline.run().unwrap_err();
        assert!(err.is_cancelled());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].stage, PipelineStage::Cancelled);
    }

    #[test]
    fn test_cancel_between_stages() {
        let token = CancellationToken::new();
        let token_clone = token.clone();

        // Cancel as soon as fetching finishes; transform must not start.
        let mut pipeline = Pipeline::builder()
            .source(FixedSource(RAW))
            .sink(SqliteSink::open_in_memory().unwrap())
            .cancellation_token(token)
            .on_event(move |e: &StageEvent| {
                if e.stage == PipelineStage::Fetching && e.rows.is_some() {
                    token_clone.cancel();
                }
            })
            .build()
            .unwrap();

        let err = pipeline.run().unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[test]
    fn test_failure_reports_failed_stage() {
        let (events, callback) = recorder();
        let config = PipelineConfig::builder().state("Texas").build().unwrap();

        let mut pipeline = Pipeline::builder()
            .config(config)
            .source(FixedSource(RAW))
            .sink(SqliteSink::open_in_memory().unwrap())
            .on_event(callback)
            .build()
            .unwrap();

        let err = pipeline.run().unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset));

        let events = events.lock().unwrap();
        let last = events.last().unwrap();
        assert_eq!(last.stage, PipelineStage::Failed);
        assert!(last.message.contains("Validating Data"));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.table_name = "bad name".to_string();

        let result = Pipeline::builder().config(config).build();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_source_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("city_census.csv");
        std::fs::write(&csv, RAW).unwrap();

        let config = PipelineConfig::builder()
            .source_file(&csv)
            .database_path(dir.path().join("census.db"))
            .build()
            .unwrap();

        let mut pipeline = Pipeline::builder().config(config).build().unwrap();
        let report = pipeline.run().unwrap();
        assert_eq!(report.rows_loaded, 3);

        let sink = SqliteSink::open(dir.path().join("census.db")).unwrap();
        assert_eq!(sink.row_count("census_data").unwrap(), 3);
    }
}
