//! In-memory census dataset.
//!
//! A [`Dataset`] is a Polars [`DataFrame`] that is guaranteed to carry the
//! three columns every stage relies on, with fixed types:
//!
//! | column   | type      | nullable |
//! |----------|-----------|----------|
//! | `state`  | `String`  | yes      |
//! | `age`    | `Int64`   | yes      |
//! | `weight` | `Float64` | yes      |
//!
//! Any other source columns are carried along untouched, in source order.
//! CSV reading and writing live in the `io` submodule.

mod io;

use crate::error::{PipelineError, Result};
use crate::utils::is_float_dtype;
use polars::prelude::*;

/// Name of the state column.
pub const STATE_COLUMN: &str = "state";
/// Name of the age column.
pub const AGE_COLUMN: &str = "age";
/// Name of the weight column.
pub const WEIGHT_COLUMN: &str = "weight";

/// Required columns and the type each is coerced to.
pub fn required_schema() -> [(&'static str, DataType); 3] {
    [
        (STATE_COLUMN, DataType::String),
        (AGE_COLUMN, DataType::Int64),
        (WEIGHT_COLUMN, DataType::Float64),
    ]
}

/// Borrowed view of the required fields of one row.
///
/// Null cells are `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row<'a> {
    pub state: Option<&'a str>,
    pub age: Option<i64>,
    pub weight: Option<f64>,
}

/// Tabular census data with typed required columns.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
}

impl Dataset {
    /// Wrap a DataFrame, coercing the required columns to their types.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::MissingColumn`] if a required column is absent.
    /// - [`PipelineError::MalformedInput`] if a required column holds values
    ///   that cannot be read as its type (e.g. `"heavy"` in `weight`).
    pub fn new(frame: DataFrame) -> Result<Self> {
        let frame = coerce_required_columns(frame)?;
        Ok(Self { frame })
    }

    /// Wrap a frame derived from an existing dataset (same schema).
    pub(crate) fn from_derived_frame(frame: DataFrame) -> Self {
        Self { frame }
    }

    /// An empty dataset with only the required columns.
    pub fn empty() -> Self {
        let columns = required_schema()
            .into_iter()
            .map(|(name, dtype)| Column::new_empty(name.into(), &dtype))
            .collect::<Vec<_>>();
        let frame = DataFrame::new(columns).unwrap_or_else(|_| DataFrame::empty());
        Self { frame }
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Borrow the underlying DataFrame.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Unwrap into the underlying DataFrame.
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Number of null entries in `weight`.
    pub fn weight_null_count(&self) -> usize {
        self.frame
            .column(WEIGHT_COLUMN)
            .map(|c| c.null_count())
            .unwrap_or(0)
    }

    /// Iterate the required fields of every row, in order.
    pub fn rows(&self) -> Result<impl Iterator<Item = Row<'_>> + '_> {
        let states = self.typed_column(STATE_COLUMN)?.str()?;
        let ages = self.typed_column(AGE_COLUMN)?.i64()?;
        let weights = self.typed_column(WEIGHT_COLUMN)?.f64()?;

        Ok(states
            .into_iter()
            .zip(ages)
            .zip(weights)
            .map(|((state, age), weight)| Row { state, age, weight }))
    }

    /// Replace the `weight` column with a new series of the same length.
    pub(crate) fn with_weight(mut self, weight: Series) -> Result<Self> {
        self.frame.replace(WEIGHT_COLUMN, weight)?;
        Ok(self)
    }

    fn typed_column(&self, name: &str) -> Result<&Series> {
        self.frame
            .column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| PipelineError::MissingColumn(name.to_string()))
    }
}

/// Datasets are equal when schemas match and every cell matches,
/// nulls included.
impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.frame.schema() == other.frame.schema() && self.frame.equals_missing(&other.frame)
    }
}

fn coerce_required_columns(mut frame: DataFrame) -> Result<DataFrame> {
    for (name, dtype) in required_schema() {
        let column = frame
            .column(name)
            .map_err(|_| PipelineError::MissingColumn(name.to_string()))?;

        if name == AGE_COLUMN && is_float_dtype(column.dtype()) {
            reject_fractional_ages(column.as_materialized_series())?;
        }

        let mut series = column.as_materialized_series().clone();
        if series.dtype() != &dtype {
            series = series.strict_cast(&dtype).map_err(|e| {
                PipelineError::MalformedInput(format!(
                    "column '{}' cannot be read as {}: {}",
                    name, dtype, e
                ))
            })?;
        }
        if name == WEIGHT_COLUMN {
            series = nan_to_null(&series)?;
        }

        frame.replace(name, series)?;
    }

    Ok(frame)
}

/// Ages are whole years; `30.5` would otherwise truncate to `30`.
fn reject_fractional_ages(ages: &Series) -> Result<()> {
    let ages = ages.cast(&DataType::Float64)?;
    let fractional = ages
        .f64()?
        .into_iter()
        .flatten()
        .find(|age| !age.is_finite() || age.fract() != 0.0);

    match fractional {
        Some(age) => Err(PipelineError::MalformedInput(format!(
            "column '{}' holds non-integral value {}",
            AGE_COLUMN, age
        ))),
        None => Ok(()),
    }
}

/// NaN is a missing weight, not a value.
fn nan_to_null(weights: &Series) -> Result<Series> {
    let values: Vec<Option<f64>> = weights
        .f64()?
        .into_iter()
        .map(|w| w.filter(|v| !v.is_nan()))
        .collect();
    Ok(Series::new(WEIGHT_COLUMN.into(), values))
}
