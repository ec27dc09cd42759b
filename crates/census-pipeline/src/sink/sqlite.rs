//! SQLite sink backed by `rusqlite`.

use super::DataSink;
use crate::config::is_valid_table_name;
use crate::dataset::Dataset;
use crate::error::{PipelineError, Result};
use crate::utils::{DtypeCategory, get_dtype_category};
use polars::prelude::*;
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use std::path::Path;
use tracing::{debug, info};

/// Writes datasets into a SQLite database.
pub struct SqliteSink {
    conn: Connection,
    location: String,
}

impl SqliteSink {
    /// Open (or create) a database file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                PipelineError::SinkWrite(format!(
                    "cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let conn = Connection::open(path).map_err(sink_error)?;
        Ok(Self {
            conn,
            location: path.display().to_string(),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(sink_error)?;
        Ok(Self {
            conn,
            location: ":memory:".to_string(),
        })
    }

    /// Number of rows currently in `table`.
    pub fn row_count(&self, table: &str) -> Result<usize> {
        check_table_name(table)?;
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", quote(table)), [], |row| {
                row.get(0)
            })
            .map_err(sink_error)?;
        Ok(count as usize)
    }

    /// Every row of `table` in insertion order.
    pub fn read_rows(&self, table: &str) -> Result<Vec<Vec<Value>>> {
        check_table_name(table)?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote(table)))
            .map_err(sink_error)?;
        let width = stmt.column_count();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(sink_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sink_error)?;
        Ok(rows)
    }

    /// Column names of `table` with their declared SQL types.
    pub fn table_columns(&self, table: &str) -> Result<Vec<(String, String)>> {
        check_table_name(table)?;
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote(table)))
            .map_err(sink_error)?;
        let columns = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))
            .map_err(sink_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sink_error)?;
        Ok(columns)
    }
}

impl DataSink for SqliteSink {
    fn replace_table(&mut self, table: &str, dataset: &Dataset) -> Result<usize> {
        check_table_name(table)?;
        let frame = dataset.frame();

        let columns = frame
            .get_columns()
            .iter()
            .map(|c| sql_values(c.as_materialized_series()))
            .collect::<Result<Vec<_>>>()?;

        let definitions = frame
            .get_columns()
            .iter()
            .map(|c| format!("{} {}", quote(c.name()), sql_type(c.dtype())))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; frame.width()].join(", ");

        let tx = self.conn.transaction().map_err(sink_error)?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({definitions});",
            table = quote(table),
        ))
        .map_err(sink_error)?;

        {
            let mut insert = tx
                .prepare(&format!(
                    "INSERT INTO {} VALUES ({})",
                    quote(table),
                    placeholders
                ))
                .map_err(sink_error)?;

            for row in 0..frame.height() {
                insert
                    .execute(params_from_iter(columns.iter().map(|c| &c[row])))
                    .map_err(sink_error)?;
            }
        }

        tx.commit().map_err(sink_error)?;

        info!(
            "Replaced table '{}' in {} with {} rows",
            table,
            self.location,
            frame.height()
        );
        Ok(frame.height())
    }

    fn describe(&self) -> String {
        format!("sqlite {}", self.location)
    }
}

fn sink_error(e: rusqlite::Error) -> PipelineError {
    PipelineError::SinkWrite(e.to_string())
}

fn check_table_name(table: &str) -> Result<()> {
    if is_valid_table_name(table) {
        Ok(())
    } else {
        Err(PipelineError::SinkWrite(format!(
            "'{}' is not a valid table name",
            table
        )))
    }
}

/// Double-quote an identifier, escaping embedded quotes.
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn sql_type(dtype: &DataType) -> &'static str {
    match get_dtype_category(dtype) {
        DtypeCategory::Integer | DtypeCategory::Boolean => "INTEGER",
        DtypeCategory::Float => "REAL",
        DtypeCategory::String | DtypeCategory::Other => "TEXT",
    }
}

/// Convert one column to SQL values; nulls become `NULL`.
fn sql_values(series: &Series) -> Result<Vec<Value>> {
    let values = match get_dtype_category(series.dtype()) {
        DtypeCategory::Integer => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::Integer))
            .collect(),
        DtypeCategory::Float => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::Real))
            .collect(),
        DtypeCategory::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |b| Value::Integer(i64::from(b))))
            .collect(),
        DtypeCategory::String | DtypeCategory::Other => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
            .collect(),
    };
    debug!("Converted column '{}' for SQL", series.name());
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn census() -> Dataset {
        Dataset::new(
            df![
                "name" => ["a", "b"],
                "state" => ["Iowa", "Iowa"],
                "age" => [35i64, 40],
                "weight" => [Some(70.5), None],
            ]
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_replace_table_writes_rows_and_types() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let written = sink.replace_table("census_data", &census()).unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            sink.table_columns("census_data").unwrap(),
            vec![
                ("name".to_string(), "TEXT".to_string()),
                ("state".to_string(), "TEXT".to_string()),
                ("age".to_string(), "INTEGER".to_string()),
                ("weight".to_string(), "REAL".to_string()),
            ]
        );
        assert_eq!(
            sink.read_rows("census_data").unwrap(),
            vec![
                vec![
                    Value::Text("a".into()),
                    Value::Text("Iowa".into()),
                    Value::Integer(35),
                    Value::Real(70.5),
                ],
                vec![
                    Value::Text("b".into()),
                    Value::Text("Iowa".into()),
                    Value::Integer(40),
                    Value::Null,
                ],
            ]
        );
    }

    #[test]
    fn test_load_twice_is_idempotent() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let ds = census();

        sink.replace_table("census_data", &ds).unwrap();
        let first = sink.read_rows("census_data").unwrap();
        sink.replace_table("census_data", &ds).unwrap();
        let second = sink.read_rows("census_data").unwrap();

        assert_eq!(first, second);
        assert_eq!(sink.row_count("census_data").unwrap(), 2);
    }

    #[test]
    fn test_replace_overwrites_previous_content() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        sink.replace_table("census_data", &census()).unwrap();

        let smaller = Dataset::new(
            df!["state" => ["Ohio"], "age" => [50i64], "weight" => [90.0]].unwrap(),
        )
        .unwrap();
        sink.replace_table("census_data", &smaller).unwrap();

        assert_eq!(sink.row_count("census_data").unwrap(), 1);
        assert_eq!(sink.table_columns("census_data").unwrap().len(), 3);
    }

    #[test]
    fn test_failed_load_keeps_previous_table() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        sink.replace_table("census_data", &census()).unwrap();

        // SQLite rejects tables wider than 2000 columns, after the DROP ran.
        let mut columns = vec![
            Column::new("state".into(), ["Iowa"]),
            Column::new("age".into(), [35i64]),
            Column::new("weight".into(), [70.0]),
        ];
        columns.extend((0..2000).map(|i| Column::new(format!("extra_{i}").into(), [i as i64])));
        let too_wide = Dataset::new(DataFrame::new(columns).unwrap()).unwrap();

        let err = sink.replace_table("census_data", &too_wide).unwrap_err();
        assert!(matches!(err, PipelineError::SinkWrite(_)));
        assert_eq!(sink.row_count("census_data").unwrap(), 2);
        assert_eq!(sink.table_columns("census_data").unwrap().len(), 4);
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let err = sink
            .replace_table("x; DROP TABLE y", &census())
            .unwrap_err();
        assert!(matches!(err, PipelineError::SinkWrite(_)));
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("census.db");

        {
            let mut sink = SqliteSink::open(&path).unwrap();
            sink.replace_table("census_data", &census()).unwrap();
        }

        let sink = SqliteSink::open(&path).unwrap();
        assert_eq!(sink.row_count("census_data").unwrap(), 2);
    }

    #[test]
    fn test_open_under_regular_file_is_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = SqliteSink::open(blocker.join("db").join("census.db"))
            .err()
            .expect("open should fail");
        assert!(matches!(err, PipelineError::SinkWrite(_)));
        assert!(err.is_retryable());
    }
}
