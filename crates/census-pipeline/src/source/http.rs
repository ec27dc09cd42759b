//! HTTP(S) CSV source.

use super::DataSource;
use crate::dataset::Dataset;
use crate::error::{PipelineError, Result};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::info;

/// Downloads the census CSV with a blocking GET.
pub struct HttpSource {
    url: String,
    client: Client,
}

impl HttpSource {
    /// Create a source with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the HTTP client cannot be
    /// created.
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PipelineError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(url, client))
    }

    /// Use a preconfigured client.
    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DataSource for HttpSource {
    fn fetch(&self) -> Result<Dataset> {
        info!("Downloading {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| PipelineError::SourceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::SourceUnavailable(format!(
                "{} returned HTTP {}",
                self.url, status
            )));
        }

        let body = response
            .bytes()
            .map_err(|e| PipelineError::SourceUnavailable(e.to_string()))?;

        Dataset::from_csv_bytes(body.to_vec())
    }

    fn describe(&self) -> String {
        format!("http {}", self.url)
    }
}
