//! Recall evaluation against persisted ground truth
//!
//! Loads `neighbours.json` and measures how many of the exact top-k
//! neighbors an approximate system returned.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::distance::Metric;
use crate::output::{run_key, NEIGHBOURS_FILE};
use crate::storage::StorageBackend;
use crate::types::{neighborhood_key, GroundTruthRecord, Neighborhood, RecordId};
use crate::{Error, Result};

/// Row of `neighbours.json` before its `top_{k}_*` keys are interpreted
#[derive(Deserialize)]
struct RawGroundTruth {
    id: RecordId,
    #[serde(flatten)]
    neighborhoods: HashMap<String, Neighborhood>,
}

/// Result list of an approximate search for one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: RecordId,
    pub ids: Vec<RecordId>,
}

/// Mean recall over a result set
#[derive(Debug, Clone, Serialize)]
pub struct RecallReport {
    pub metric: Metric,
    pub k: usize,
    /// Queries that were found in the ground truth and scored
    pub queries: usize,
    /// Queries absent from the ground truth
    pub unknown: usize,
    pub recall: f64,
}

/// Parsed ground truth of one run
#[derive(Debug, Clone)]
pub struct GroundTruth {
    k: usize,
    records: Vec<GroundTruthRecord>,
    by_id: HashMap<RecordId, usize>,
}

impl GroundTruth {
    /// Parse a `neighbours.json` document
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let raw: Vec<RawGroundTruth> = serde_json::from_slice(data)?;

        let k = match raw.first() {
            Some(first) => discover_k(first.neighborhoods.keys())?,
            None => 0,
        };

        let mut records = Vec::with_capacity(raw.len());
        for mut row in raw {
            let mut take = |metric: Metric| {
                let key = neighborhood_key(k, metric);
                row.neighborhoods.remove(&key).ok_or_else(|| {
                    Error::dataset(format!("ground truth for '{}' missing key '{}'", row.id, key))
                })
            };
            let euclidean = take(Metric::Euclidean)?;
            let cosine = take(Metric::Cosine)?;

            if euclidean.ids.len() != euclidean.dists.len() || cosine.ids.len() != cosine.dists.len()
            {
                return Err(Error::dataset(format!(
                    "ground truth for '{}' has mismatched ids/dists lengths",
                    row.id
                )));
            }

            records.push(GroundTruthRecord {
                id: row.id,
                k,
                euclidean,
                cosine,
            });
        }

        Ok(Self::from_records(k, records))
    }

    pub fn from_records(k: usize, records: Vec<GroundTruthRecord>) -> Self {
        let by_id = records
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.id.clone(), idx))
            .collect();
        Self { k, records, by_id }
    }

    /// Load `neighbours.json` from `run_dir`
    pub async fn load(storage: &dyn StorageBackend, run_dir: &str) -> Result<Self> {
        let key = run_key(run_dir, NEIGHBOURS_FILE);
        tracing::info!(%key, "Loading ground truth");
        let data = storage.get(&key).await?;
        Self::from_slice(&data)
    }

    /// Depth the ground truth was computed at
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[GroundTruthRecord] {
        &self.records
    }

    /// Exact neighbor ids of `query` under `metric`
    pub fn neighbors(&self, metric: Metric, query: &RecordId) -> Option<&[RecordId]> {
        self.by_id
            .get(query)
            .map(|&idx| self.records[idx].neighborhood(metric).ids.as_slice())
    }

    /// Mean recall@k of `results` under `metric`.
    ///
    /// Queries missing from the ground truth are counted but not scored.
    pub fn evaluate(&self, metric: Metric, results: &[QueryResult], k: usize) -> Result<RecallReport> {
        if k == 0 {
            return Err(Error::configuration("k must be greater than 0"));
        }
        if k > self.k {
            tracing::warn!(k, ground_truth_k = self.k, "k exceeds ground truth depth");
        }

        let mut total = 0.0;
        let mut queries = 0;
        let mut unknown = 0;

        for result in results {
            match self.neighbors(metric, &result.id) {
                Some(truth) => {
                    total += recall_at_k(truth, &result.ids, k);
                    queries += 1;
                }
                None => {
                    tracing::debug!(id = %result.id, "Query not present in ground truth");
                    unknown += 1;
                }
            }
        }

        let recall = if queries == 0 { 0.0 } else { total / queries as f64 };

        Ok(RecallReport {
            metric,
            k,
            queries,
            unknown,
            recall,
        })
    }
}

/// Fraction of `truth[..k]` found in `candidates[..k]`.
///
/// An empty truth list counts as fully recalled.
pub fn recall_at_k(truth: &[RecordId], candidates: &[RecordId], k: usize) -> f64 {
    let truth = &truth[..truth.len().min(k)];
    if truth.is_empty() {
        return 1.0;
    }

    let expected: HashSet<&RecordId> = truth.iter().collect();
    let found: HashSet<&RecordId> = candidates
        .iter()
        .take(k)
        .filter(|id| expected.contains(id))
        .collect();

    found.len() as f64 / truth.len() as f64
}

/// Read `k` out of a `top_{k}_{metric}` key
fn discover_k<'a>(mut keys: impl Iterator<Item = &'a String>) -> Result<usize> {
    keys.find_map(|key| {
        let rest = key.strip_prefix("top_")?;
        let (k, metric) = rest.split_once('_')?;
        metric.parse::<Metric>().ok()?;
        k.parse::<usize>().ok()
    })
    .ok_or_else(|| Error::dataset("ground truth has no top_{k}_{metric} entries"))
}
