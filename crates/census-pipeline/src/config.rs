//! Configuration types for the census pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup. Configurations can also be
//! read from JSON so an orchestrator can keep one file per deployment.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Census CSV served by the upstream assignment repository.
pub const DEFAULT_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/practical-bootcamp/week4-assignment1-template/main/city_census.csv";

/// Default timeout for source requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default table the load stage replaces.
pub const DEFAULT_TABLE_NAME: &str = "census_data";

/// Default SQLite database file.
pub const DEFAULT_DATABASE_PATH: &str = "census.db";

/// Table names are interpolated into DDL, so only plain identifiers pass.
static SQL_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("identifier regex is valid"));

/// Whether `name` is a plain SQL identifier usable as a table name.
pub fn is_valid_table_name(name: &str) -> bool {
    SQL_IDENTIFIER.is_match(name)
}

/// Where the fetch stage reads the raw CSV from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// HTTP(S) GET returning a CSV document.
    Http {
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// A CSV file on the local filesystem.
    File { path: PathBuf },
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Http {
            url: DEFAULT_SOURCE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Row filter applied after imputation: `age > min_age AND state == state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Rows must have an age strictly greater than this.
    /// Default: 30
    pub min_age: i64,
    /// Rows must belong to exactly this state.
    /// Default: "Iowa"
    pub state: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_age: 30,
            state: "Iowa".to_string(),
        }
    }
}

/// What the imputer does when a null weight has no fallback at all,
/// i.e. every weight in the dataset is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingFallbackPolicy {
    /// Fail the transform stage with `InsufficientData`.
    #[default]
    Fail,
    /// Leave the entries null and report how many were left.
    LeaveNull,
}

/// Configuration for one pipeline run.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use census_pipeline::config::{PipelineConfig, MissingFallbackPolicy};
///
/// let config = PipelineConfig::builder()
///     .source_file("data/city_census.csv")
///     .table_name("census_data")
///     .missing_fallback(MissingFallbackPolicy::Fail)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where to fetch the raw CSV from.
    /// Default: HTTP GET of [`DEFAULT_SOURCE_URL`]
    pub source: SourceConfig,

    /// SQLite database file the load stage writes to.
    /// Default: "census.db"
    pub database_path: PathBuf,

    /// Table replaced on every load.
    /// Default: "census_data"
    pub table_name: String,

    /// Row filter parameters.
    pub filter: FilterConfig,

    /// Behaviour when the weight column has no non-null value at all.
    /// Default: Fail
    pub missing_fallback: MissingFallbackPolicy,

    /// Whether validation rejects datasets that still have null weights.
    /// Default: true
    pub require_complete_weight: bool,

    /// Directory for staged CSV copies of the fetched and transformed data.
    /// If None, nothing is written besides the sink.
    /// Default: None
    pub staging_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            filter: FilterConfig::default(),
            missing_fallback: MissingFallbackPolicy::default(),
            require_complete_weight: true,
            staging_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration.
    ///
    /// Missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigValidationError> {
        let config: PipelineConfig =
            serde_json::from_str(json).map_err(|e| ConfigValidationError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigValidationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigValidationError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        match &self.source {
            SourceConfig::Http { url, timeout_secs } => {
                if url.trim().is_empty() {
                    return Err(ConfigValidationError::EmptyField("source.url".to_string()));
                }
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigValidationError::InvalidSourceUrl(url.clone()));
                }
                if *timeout_secs == 0 {
                    return Err(ConfigValidationError::InvalidTimeout(*timeout_secs));
                }
            }
            SourceConfig::File { path } => {
                if path.as_os_str().is_empty() {
                    return Err(ConfigValidationError::EmptyField("source.path".to_string()));
                }
            }
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyField("database_path".to_string()));
        }

        if !is_valid_table_name(&self.table_name) {
            return Err(ConfigValidationError::InvalidTableName(
                self.table_name.clone(),
            ));
        }

        if self.filter.min_age < 0 {
            return Err(ConfigValidationError::InvalidMinAge(self.filter.min_age));
        }

        if self.filter.state.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("filter.state".to_string()));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Required field '{0}' is empty")]
    EmptyField(String),

    #[error("Invalid source URL: '{0}' (must start with http:// or https://)")]
    InvalidSourceUrl(String),

    #[error("Invalid timeout: {0} seconds (must be at least 1)")]
    InvalidTimeout(u64),

    #[error("Invalid table name: '{0}' (letters, digits and underscores only)")]
    InvalidTableName(String),

    #[error("Invalid minimum age: {0} (must not be negative)")]
    InvalidMinAge(i64),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl From<ConfigValidationError> for crate::error::PipelineError {
    fn from(e: ConfigValidationError) -> Self {
        crate::error::PipelineError::InvalidConfig(e.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    source: Option<SourceConfig>,
    database_path: Option<PathBuf>,
    table_name: Option<String>,
    min_age: Option<i64>,
    state: Option<String>,
    missing_fallback: Option<MissingFallbackPolicy>,
    require_complete_weight: Option<bool>,
    staging_dir: Option<PathBuf>,
}

impl PipelineConfigBuilder {
    /// Fetch the CSV over HTTP(S) with the default timeout.
    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.source = Some(SourceConfig::Http {
            url: url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        });
        self
    }

    /// Fetch the CSV over HTTP(S) with an explicit timeout.
    pub fn source_url_with_timeout(mut self, url: impl Into<String>, timeout_secs: u64) -> Self {
        self.source = Some(SourceConfig::Http {
            url: url.into(),
            timeout_secs,
        });
        self
    }

    /// Read the CSV from a local file instead of the network.
    pub fn source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(SourceConfig::File { path: path.into() });
        self
    }

    /// Set the SQLite database file.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Set the table replaced by the load stage.
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Keep only rows with `age` strictly greater than this.
    pub fn min_age(mut self, age: i64) -> Self {
        self.min_age = Some(age);
        self
    }

    /// Keep only rows of this state.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Set the behaviour for weights with no fallback statistic.
    pub fn missing_fallback(mut self, policy: MissingFallbackPolicy) -> Self {
        self.missing_fallback = Some(policy);
        self
    }

    /// Enable or disable the "no null weights" validation check.
    pub fn require_complete_weight(mut self, require: bool) -> Self {
        self.require_complete_weight = Some(require);
        self
    }

    /// Stage intermediate CSV files in this directory.
    pub fn staging_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(path.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = FilterConfig::default();
        let config = PipelineConfig {
            source: self.source.unwrap_or_default(),
            database_path: self
                .database_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            table_name: self
                .table_name
                .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            filter: FilterConfig {
                min_age: self.min_age.unwrap_or(defaults.min_age),
                state: self.state.unwrap_or(defaults.state),
            },
            missing_fallback: self.missing_fallback.unwrap_or_default(),
            require_complete_weight: self.require_complete_weight.unwrap_or(true),
            staging_dir: self.staging_dir,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.table_name, "census_data");
        assert_eq!(config.filter.min_age, 30);
        assert_eq!(config.filter.state, "Iowa");
        assert_eq!(config.missing_fallback, MissingFallbackPolicy::Fail);
        assert!(config.require_complete_weight);
        assert!(config.staging_dir.is_none());
        assert!(matches!(config.source, SourceConfig::Http { .. }));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .source_file("data/city_census.csv")
            .database_path("/tmp/out.db")
            .table_name("iowa_over_30")
            .min_age(40)
            .state("Ohio")
            .missing_fallback(MissingFallbackPolicy::LeaveNull)
            .require_complete_weight(false)
            .staging_dir("/tmp/staging")
            .build()
            .unwrap();

        assert_eq!(
            config.source,
            SourceConfig::File {
                path: PathBuf::from("data/city_census.csv")
            }
        );
        assert_eq!(config.table_name, "iowa_over_30");
        assert_eq!(config.filter.min_age, 40);
        assert_eq!(config.filter.state, "Ohio");
        assert_eq!(config.missing_fallback, MissingFallbackPolicy::LeaveNull);
        assert!(!config.require_complete_weight);
        assert_eq!(config.staging_dir, Some(PathBuf::from("/tmp/staging")));
    }

    #[test]
    fn test_validation_rejects_unsafe_table_name() {
        let result = PipelineConfig::builder()
            .table_name("census; DROP TABLE users")
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidTableName(_)
        ));
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let result = PipelineConfig::builder()
            .source_url_with_timeout("https://example.com/data.csv", 0)
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidTimeout(0)
        ));
    }

    #[test]
    fn test_validation_rejects_non_http_url() {
        let result = PipelineConfig::builder()
            .source_url("ftp://example.com/data.csv")
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidSourceUrl(_)
        ));
    }

    #[test]
    fn test_validation_rejects_negative_min_age() {
        let result = PipelineConfig::builder().min_age(-1).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidMinAge(-1)
        ));
    }

    #[test]
    fn test_validation_rejects_blank_state() {
        let result = PipelineConfig::builder().state("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyField(_)
        ));
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "source": { "type": "file", "path": "fixtures/census.csv" },
            "table_name": "filtered_census",
            "missing_fallback": "leave_null"
        }"#;

        let config = PipelineConfig::from_json_str(json).expect("Should deserialize partial JSON");

        assert_eq!(config.table_name, "filtered_census");
        assert_eq!(config.missing_fallback, MissingFallbackPolicy::LeaveNull);
        // Unspecified fields keep their defaults
        assert_eq!(config.filter, FilterConfig::default());
        assert_eq!(config.database_path, PathBuf::from("census.db"));
    }

    #[test]
    fn test_config_from_json_http_default_timeout() {
        let json = r#"{ "source": { "type": "http", "url": "https://example.com/c.csv" } }"#;
        let config = PipelineConfig::from_json_str(json).unwrap();
        assert_eq!(
            config.source,
            SourceConfig::Http {
                url: "https://example.com/c.csv".to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            }
        );
    }

    #[test]
    fn test_config_from_invalid_json() {
        let result = PipelineConfig::from_json_str("{ not json");
        assert!(matches!(result.unwrap_err(), ConfigValidationError::Parse(_)));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = PipelineConfig::builder()
            .staging_dir("stage")
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
