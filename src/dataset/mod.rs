//! Dataset loading
//!
//! Reads raw records from a local Parquet, JSON or JSON-lines file. Rows are
//! handed out as JSON objects; shape checks happen later in
//! [`crate::validate`].

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::types::RawRecord;
use crate::{Error, Result};

pub mod columnar;
pub mod split;

pub use split::{train_test_split, Split, MIN_SPLIT_RECORDS};

/// Supported on-disk dataset formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Parquet,
    Json,
    JsonLines,
}

impl DatasetFormat {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "parquet" => Ok(DatasetFormat::Parquet),
            "json" => Ok(DatasetFormat::Json),
            "jsonl" | "ndjson" => Ok(DatasetFormat::JsonLines),
            _ => Err(Error::dataset(format!(
                "unsupported dataset file '{}': expected .parquet, .json or .jsonl",
                path.display()
            ))),
        }
    }
}

/// Name of the run directory for a dataset file (its file stem)
pub fn run_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::dataset(format!("cannot derive run name from '{}'", path.display())))
}

/// Load up to `sample_size` records from `path`.
///
/// Parquet files only materialize the columns named in `fields`; JSON rows
/// are kept whole.
pub fn load_records(path: &Path, fields: &[&str], sample_size: Option<usize>) -> Result<Vec<RawRecord>> {
    let format = DatasetFormat::from_path(path)?;
    tracing::info!(path = %path.display(), ?format, ?sample_size, "Loading dataset");

    let records = match format {
        DatasetFormat::Parquet => columnar::read_records(path, fields, sample_size)?,
        DatasetFormat::Json => {
            let text = fs::read_to_string(path)?;
            let rows: Vec<Value> = serde_json::from_str(&text)?;
            into_objects(rows.into_iter().take(sample_size.unwrap_or(usize::MAX)))?
        }
        DatasetFormat::JsonLines => {
            let text = fs::read_to_string(path)?;
            let rows = text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .take(sample_size.unwrap_or(usize::MAX))
                .map(serde_json::from_str::<Value>)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            into_objects(rows)?
        }
    };

    tracing::info!(records = records.len(), "Loaded dataset");
    Ok(records)
}

fn into_objects(rows: impl IntoIterator<Item = Value>) -> Result<Vec<RawRecord>> {
    rows.into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Value::Object(map) => Ok(map),
            other => Err(Error::dataset(format!(
                "row {} is not an object (found {})",
                row,
                json_kind(&other)
            ))),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_detection() {
        let cases = [
            ("data/a.parquet", DatasetFormat::Parquet),
            ("a.JSON", DatasetFormat::Json),
            ("a.jsonl", DatasetFormat::JsonLines),
            ("a.ndjson", DatasetFormat::JsonLines),
        ];
        for (path, expected) in cases {
            assert_eq!(DatasetFormat::from_path(Path::new(path)).unwrap(), expected);
        }
        assert!(DatasetFormat::from_path(Path::new("a.csv")).is_err());
        assert!(DatasetFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_run_name() {
        assert_eq!(run_name(&PathBuf::from("/data/se_cs_768.parquet")).unwrap(), "se_cs_768");
        assert_eq!(run_name(Path::new("small.jsonl")).unwrap(), "small");
    }

    #[test]
    fn test_non_object_rows_rejected() {
        let err = into_objects(vec![serde_json::json!({"id": 1}), serde_json::json!(3)]).unwrap_err();
        assert!(matches!(err, Error::Dataset(msg) if msg.contains("row 1")));
    }
}
