//! CSV reading and writing for [`Dataset`].
//!
//! Reading happens in two passes. A strict structural scan with the `csv`
//! crate rejects documents Polars would otherwise patch up silently (ragged
//! records, duplicate or missing headers); Polars then parses the document,
//! reading `state` as text and `weight` as float and inferring the rest.
//! The usual missing-value markers (`NA`, `N/A`, `NaN`, ...) become nulls.
//! Writing emits nulls as empty fields so missing weights survive a round
//! trip.

use super::{Dataset, STATE_COLUMN, WEIGHT_COLUMN};
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

impl Dataset {
    /// Parse a CSV document with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MalformedInput`] if the document is empty,
    /// has no usable header, has records whose field count differs from the
    /// header, or holds values a required column cannot be coerced to.
    /// Returns [`PipelineError::MissingColumn`] if a required column is absent.
    pub fn from_csv_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        let headers = check_structure(&bytes)?;

        let null_values: Vec<PlSmallStr> = MISSING_MARKERS.iter().map(|m| (*m).into()).collect();
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .with_schema_overwrite(Some(Arc::new(text_and_float_overrides(&headers))))
            .map_parse_options(|opts| {
                opts.with_null_values(Some(NullValues::AllColumns(null_values.clone())))
            })
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| PipelineError::MalformedInput(e.to_string()))?;

        debug!("Parsed CSV: {:?}", frame.shape());
        Dataset::new(frame)
    }

    /// Read a CSV document from any reader.
    pub fn from_csv_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_csv_bytes(bytes)
    }

    /// Read a CSV file from disk.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        Self::from_csv_bytes(bytes)
    }

    /// Serialize as CSV with a header row, preserving column order.
    /// Nulls are written as empty fields.
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut frame = self.frame.clone();
        CsvWriter::new(writer)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .with_null_value(String::new())
            .finish(&mut frame)?;
        Ok(())
    }

    /// Serialize to an in-memory CSV document.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(buffer)
    }

    /// Write a CSV file, creating parent directories as needed.
    pub fn write_csv_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        self.write_csv(&mut file)?;
        file.flush()?;
        Ok(())
    }
}

/// Field values read as missing, in any column. A weight of `NA`, `N/A` or
/// `NaN` is imputed rather than rejected.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Read `state` as text (so `01` keeps its leading zero) and `weight` as
/// float, for whichever of the two the header contains.
fn text_and_float_overrides(headers: &[String]) -> Schema {
    let mut schema = Schema::default();
    for header in headers {
        if header == STATE_COLUMN {
            schema.with_column(STATE_COLUMN.into(), DataType::String);
        } else if header == WEIGHT_COLUMN {
            schema.with_column(WEIGHT_COLUMN.into(), DataType::Float64);
        }
    }
    schema
}

/// Reject anything that is not a single rectangular table with a header.
/// Returns the header names.
fn check_structure(bytes: &[u8]) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::MalformedInput(format!("unreadable header: {}", e)))?
        .clone();

    if headers.is_empty() {
        return Err(PipelineError::MalformedInput(
            "document has no header row".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for name in headers.iter() {
        if name.trim().is_empty() {
            return Err(PipelineError::MalformedInput(
                "header contains an empty column name".to_string(),
            ));
        }
        if !seen.insert(name) {
            return Err(PipelineError::MalformedInput(format!(
                "duplicate column '{}' in header",
                name
            )));
        }
    }

    for record in reader.records() {
        record.map_err(|e| PipelineError::MalformedInput(e.to_string()))?;
    }

    Ok(headers.iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
state,age,weight
Iowa,35,70.5
Iowa,35,
Ohio,40,80
";

    #[test]
    fn test_load_infers_and_coerces_types() {
        let dataset = Dataset::from_csv_bytes(SAMPLE).unwrap();

        assert_eq!(dataset.height(), 3);
        assert_eq!(dataset.column_names(), vec!["state", "age", "weight"]);
        assert_eq!(dataset.weight_null_count(), 1);

        let schema = dataset.frame().schema();
        assert_eq!(schema.get("age"), Some(&DataType::Int64));
        assert_eq!(schema.get("weight"), Some(&DataType::Float64));
    }

    #[test]
    fn test_load_integer_weights_become_float() {
        let dataset = Dataset::from_csv_bytes("state,age,weight\nIowa,35,70\n").unwrap();
        let schema = dataset.frame().schema();
        assert_eq!(schema.get("weight"), Some(&DataType::Float64));
    }

    #[test]
    fn test_load_all_null_weight_column() {
        let dataset = Dataset::from_csv_bytes("state,age,weight\nIowa,35,\nIowa,36,\n").unwrap();
        assert_eq!(dataset.weight_null_count(), 2);
        let schema = dataset.frame().schema();
        assert_eq!(schema.get("weight"), Some(&DataType::Float64));
    }

    #[test]
    fn test_load_rejects_ragged_rows() {
        let err = Dataset::from_csv_bytes("state,age,weight\nIowa,35,70,extra\n").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));

        let err = Dataset::from_csv_bytes("state,age,weight\nIowa,35\n").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
    }

    #[test]
    fn test_load_keeps_state_as_text() {
        let dataset = Dataset::from_csv_bytes("state,age,weight\n01,35,70\n19,40,80\n").unwrap();
        let states: Vec<Option<&str>> = dataset.rows().unwrap().map(|r| r.state).collect();
        assert_eq!(states, vec![Some("01"), Some("19")]);
    }

    #[test]
    fn test_load_missing_markers_become_null() {
        let dataset = Dataset::from_csv_bytes(
            "state,age,weight\nIowa,35,NA\nIowa,36,N/A\nIowa,37,NaN\nIowa,38,80\nNA,39,\n",
        )
        .unwrap();

        assert_eq!(dataset.height(), 5);
        assert_eq!(dataset.weight_null_count(), 4);
        let rows: Vec<_> = dataset.rows().unwrap().collect();
        assert_eq!(rows[3].weight, Some(80.0));
        assert_eq!(rows[4].state, None);
    }

    #[test]
    fn test_load_rejects_fractional_age() {
        let err = Dataset::from_csv_bytes("state,age,weight\nIowa,30.5,70\nIowa,31.9,80\n")
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
    }

    #[test]
    fn test_load_rejects_empty_document() {
        let err = Dataset::from_csv_bytes("").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
    }

    #[test]
    fn test_load_rejects_duplicate_header() {
        let err = Dataset::from_csv_bytes("state,age,age,weight\nIowa,35,35,70\n").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
    }

    #[test]
    fn test_load_missing_required_column() {
        let err = Dataset::from_csv_bytes("state,age\nIowa,35\n").unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(ref c) if c == "weight"));
    }

    #[test]
    fn test_load_header_only() {
        let dataset = Dataset::from_csv_bytes("state,age,weight\n").unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.width(), 3);
    }

    #[test]
    fn test_write_uses_empty_field_for_null() {
        let dataset = Dataset::from_csv_bytes(SAMPLE).unwrap();
        let text = String::from_utf8(dataset.to_csv_bytes().unwrap()).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "state,age,weight");
        assert_eq!(lines[2], "Iowa,35,");
        assert!(!text.contains("null"));
    }

    #[test]
    fn test_csv_roundtrip_preserves_nulls() {
        let original = Dataset::from_csv_bytes(
            "name,state,age,weight\n\"Doe, J\",Iowa,35,70.25\nRoe,Iowa,35,\nPoe,,41,80\n",
        )
        .unwrap();

        let bytes = original.to_csv_bytes().unwrap();
        let reloaded = Dataset::from_csv_bytes(bytes).unwrap();

        assert_eq!(reloaded, original);
        assert_eq!(reloaded.weight_null_count(), 1);
    }

    #[test]
    fn test_write_and_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("census.csv");

        let original = Dataset::from_csv_bytes(SAMPLE).unwrap();
        original.write_csv_path(&path).unwrap();

        let reloaded = Dataset::from_csv_path(&path).unwrap();
        assert_eq!(reloaded, original);
    }
}
