//! Core types for mvgt

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::distance::Metric;

/// A record as read from the source dataset, before any shape checks.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// A single sub-vector of a multi-vector embedding
pub type SubVector = Vec<f64>;

/// Ordered set of equally sized sub-vectors
pub type MultiVector = Vec<SubVector>;

/// Record identifier, either a string or an integer in the source data
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl RecordId {
    /// Interpret a raw JSON value as an identifier.
    ///
    /// Only integers representable as `i64` and strings qualify.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(RecordId::Str(s.clone())),
            serde_json::Value::Number(n) => n.as_i64().map(RecordId::Int),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(i) => write!(f, "{}", i),
            RecordId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Int(value)
    }
}

impl From<i32> for RecordId {
    fn from(value: i32) -> Self {
        RecordId::Int(value as i64)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Str(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId::Str(value)
    }
}

/// Validated record: identifier plus a dimensionally consistent multi-vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub embedding: MultiVector,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, embedding: MultiVector) -> Self {
        Self {
            id: id.into(),
            embedding,
        }
    }

    /// Number of sub-vectors
    pub fn num_vectors(&self) -> usize {
        self.embedding.len()
    }

    /// Dimension of the first sub-vector (0 for an empty embedding)
    pub fn vector_dim(&self) -> usize {
        self.embedding.first().map(Vec::len).unwrap_or(0)
    }
}

/// One scored candidate
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborEntry {
    pub id: RecordId,
    pub dist: f64,
}

/// Top-k neighbors for one metric, ascending by distance.
///
/// `ids[i]` is the neighbor at distance `dists[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub ids: Vec<RecordId>,
    pub dists: Vec<f64>,
}

impl Neighborhood {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<NeighborEntry> for Neighborhood {
    fn from_iter<I: IntoIterator<Item = NeighborEntry>>(iter: I) -> Self {
        let (ids, dists) = iter.into_iter().map(|n| (n.id, n.dist)).unzip();
        Self { ids, dists }
    }
}

/// Exact top-k result for one test record.
///
/// Serializes as `{"id": .., "top_{k}_euclidean": {..}, "top_{k}_cosine": {..}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthRecord {
    pub id: RecordId,
    pub k: usize,
    pub euclidean: Neighborhood,
    pub cosine: Neighborhood,
}

impl GroundTruthRecord {
    pub fn neighborhood(&self, metric: Metric) -> &Neighborhood {
        match metric {
            Metric::Euclidean => &self.euclidean,
            Metric::Cosine => &self.cosine,
        }
    }
}

/// Output key for the neighborhood of `metric` at depth `k`
pub fn neighborhood_key(k: usize, metric: Metric) -> String {
    format!("top_{}_{}", k, metric.name())
}

impl Serialize for GroundTruthRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry(&neighborhood_key(self.k, Metric::Euclidean), &self.euclidean)?;
        map.serialize_entry(&neighborhood_key(self.k, Metric::Cosine), &self.cosine)?;
        map.end()
    }
}
