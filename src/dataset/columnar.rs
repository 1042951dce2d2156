//! Parquet dataset reader
//!
//! Converts the requested columns of each row into JSON values so Parquet
//! rows go through the same validation path as JSON input.

use arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::arrow::ProjectionMask;
use serde_json::{Number, Value};
use std::fs::File;
use std::path::Path;

use crate::types::RawRecord;
use crate::{Error, Result};

/// Read up to `limit` rows, keeping only `fields`
pub fn read_records(path: &Path, fields: &[&str], limit: Option<usize>) -> Result<Vec<RawRecord>> {
    let reader = open_projected(path, fields)?;
    let limit = limit.unwrap_or(usize::MAX);
    let mut records = Vec::new();

    for batch in reader {
        if records.len() >= limit {
            break;
        }
        let batch = batch?;
        let remaining = limit - records.len();
        records.extend(batch_to_records(&batch, fields, remaining)?);
    }

    Ok(records)
}

/// Open `path` with a projection onto the top-level columns named in `fields`.
///
/// Other columns are never decoded. A field absent from the file schema is a
/// [`Error::Dataset`].
pub fn open_projected(path: &Path, fields: &[&str]) -> Result<ParquetRecordBatchReader> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let total_rows = builder.metadata().file_metadata().num_rows();

    let roots = fields
        .iter()
        .map(|name| {
            builder
                .schema()
                .index_of(name)
                .map_err(|_| Error::dataset(format!("column '{}' not found in dataset", name)))
        })
        .collect::<Result<Vec<_>>>()?;
    let mask = ProjectionMask::roots(builder.parquet_schema(), roots);
    tracing::debug!(total_rows, columns = ?fields, "Opened Parquet dataset");

    Ok(builder.with_projection(mask).build()?)
}

/// Convert the first `limit` rows of `batch`
pub fn batch_to_records(batch: &RecordBatch, fields: &[&str], limit: usize) -> Result<Vec<RawRecord>> {
    let columns = fields
        .iter()
        .map(|name| {
            batch
                .column_by_name(name)
                .map(|col| (*name, col.as_ref()))
                .ok_or_else(|| Error::dataset(format!("column '{}' not found in dataset", name)))
        })
        .collect::<Result<Vec<_>>>()?;

    let rows = batch.num_rows().min(limit);
    let mut records = Vec::with_capacity(rows);

    for row in 0..rows {
        let mut record = RawRecord::new();
        for (name, column) in &columns {
            record.insert(name.to_string(), value_at(*column, row)?);
        }
        records.push(record);
    }

    Ok(records)
}

/// JSON value of `array[row]`
fn value_at(array: &dyn Array, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match array.data_type() {
        DataType::Null => Value::Null,
        DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
        DataType::Int8 => Value::from(array.as_primitive::<Int8Type>().value(row)),
        DataType::Int16 => Value::from(array.as_primitive::<Int16Type>().value(row)),
        DataType::Int32 => Value::from(array.as_primitive::<Int32Type>().value(row)),
        DataType::Int64 => Value::from(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::from(array.as_primitive::<UInt8Type>().value(row)),
        DataType::UInt16 => Value::from(array.as_primitive::<UInt16Type>().value(row)),
        DataType::UInt32 => Value::from(array.as_primitive::<UInt32Type>().value(row)),
        DataType::UInt64 => Value::from(array.as_primitive::<UInt64Type>().value(row)),
        DataType::Float32 => float(array.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => float(array.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Value::String(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(row).to_string()),
        DataType::List(_) => list(array.as_list::<i32>().value(row))?,
        DataType::LargeList(_) => list(array.as_list::<i64>().value(row))?,
        DataType::FixedSizeList(_, _) => list(array.as_fixed_size_list().value(row))?,
        other => {
            return Err(Error::dataset(format!(
                "unsupported column type: {:?}",
                other
            )))
        }
    };

    Ok(value)
}

fn list(values: ArrayRef) -> Result<Value> {
    (0..values.len())
        .map(|i| value_at(values.as_ref(), i))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// Non-finite floats have no JSON form and become `null`
fn float(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}
