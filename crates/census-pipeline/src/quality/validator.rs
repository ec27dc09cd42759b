//! Structural validation of a transformed dataset.

use crate::dataset::{Dataset, WEIGHT_COLUMN, required_schema};
use crate::error::{PipelineError, Result};
use tracing::debug;

/// Fail-fast checks run before a dataset is loaded.
///
/// Checks, in order:
/// 1. every required column is present,
/// 2. every required column has its expected type,
/// 3. the dataset has at least one row,
/// 4. optionally, no `weight` value is null.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    require_complete_weight: bool,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            require_complete_weight: true,
        }
    }
}

impl Validator {
    pub fn new(require_complete_weight: bool) -> Self {
        Self {
            require_complete_weight,
        }
    }

    /// Run every check; the first failure is returned.
    pub fn validate(&self, dataset: &Dataset) -> Result<()> {
        let frame = dataset.frame();

        for (name, expected) in required_schema() {
            let column = frame
                .column(name)
                .map_err(|_| PipelineError::MissingColumn(name.to_string()))?;

            if column.dtype() != &expected {
                return Err(PipelineError::ColumnType {
                    column: name.to_string(),
                    expected: expected.to_string(),
                    found: column.dtype().to_string(),
                });
            }
        }

        if dataset.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }

        if self.require_complete_weight && dataset.weight_null_count() > 0 {
            return Err(PipelineError::InsufficientData {
                column: WEIGHT_COLUMN.to_string(),
            });
        }

        debug!("Validated {} rows", dataset.height());
        Ok(())
    }
}

/// Validate with the default checks.
pub fn validate(dataset: &Dataset) -> Result<()> {
    Validator::default().validate(dataset)
}
