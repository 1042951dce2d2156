//! Record validation
//!
//! Turns raw dataset rows into [`Record`]s whose embeddings are non-empty and
//! share one sub-vector dimension. The dimension comes from the first
//! structurally usable row; every row, that one included, is then checked
//! against it in a second pass. Rows that fail are logged and dropped.

use serde_json::Value;

use crate::types::{MultiVector, RawRecord, Record, RecordId};
use crate::{Error, Result};

/// Outcome of a validation run
#[derive(Debug, Clone)]
pub struct Validated {
    pub records: Vec<Record>,
    pub expected_dim: usize,
    pub skipped: usize,
}

/// Validate `records`, keeping only `id` and embedding fields.
///
/// Fails with [`Error::Configuration`] when no record yields a dimension.
pub fn validate(records: &[RawRecord], id_field: &str, embedding_field: &str) -> Result<Vec<Record>> {
    validate_with_stats(records, id_field, embedding_field).map(|v| v.records)
}

/// Same as [`validate`] but also reports the inferred dimension and the
/// number of dropped rows.
pub fn validate_with_stats(
    records: &[RawRecord],
    id_field: &str,
    embedding_field: &str,
) -> Result<Validated> {
    let expected_dim = infer_dimension(records, embedding_field).ok_or_else(|| {
        Error::configuration(format!(
            "no valid dimension found in field '{}' across {} records",
            embedding_field,
            records.len()
        ))
    })?;

    tracing::info!(expected_dim, records = records.len(), "Validating records");

    let mut clean = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for (row, raw) in records.iter().enumerate() {
        let raw_id = raw.get(id_field);
        let Some(id) = raw_id.and_then(RecordId::from_json) else {
            tracing::warn!(
                row,
                id = ?raw_id,
                field = id_field,
                "Skipping record without a usable identifier"
            );
            skipped += 1;
            continue;
        };

        match raw
            .get(embedding_field)
            .and_then(|emb| parse_embedding(emb, expected_dim))
        {
            Some(embedding) => clean.push(Record { id, embedding }),
            None => {
                tracing::warn!(
                    %id,
                    expected_dim,
                    "Skipping record due to inhomogeneous embedding shape"
                );
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        tracing::info!(kept = clean.len(), skipped, "Validation finished");
    }

    Ok(Validated {
        records: clean,
        expected_dim,
        skipped,
    })
}

/// Length of the first sub-vector of the first record whose embedding is a
/// non-empty array starting with a non-empty array.
pub fn infer_dimension(records: &[RawRecord], embedding_field: &str) -> Option<usize> {
    records.iter().find_map(|raw| match raw.get(embedding_field) {
        Some(Value::Array(subvectors)) => match subvectors.first() {
            Some(Value::Array(first)) if !first.is_empty() => Some(first.len()),
            _ => None,
        },
        _ => None,
    })
}

/// Convert an embedding value, or `None` if it is not a non-empty array of
/// numeric arrays of length `expected_dim`.
fn parse_embedding(value: &Value, expected_dim: usize) -> Option<MultiVector> {
    let subvectors = value.as_array()?;
    if subvectors.is_empty() {
        return None;
    }

    subvectors
        .iter()
        .map(|sub| {
            let values = sub.as_array()?;
            if values.len() != expected_dim {
                return None;
            }
            values.iter().map(Value::as_f64).collect::<Option<Vec<f64>>>()
        })
        .collect()
}
