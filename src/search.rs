//! Exhaustive k-nearest-neighbor search
//!
//! Every test record is scored against every train record under both
//! metrics. Candidates are stable-sorted by distance, so equal distances keep
//! train-set order, and truncated to `k`. Scoring is parallel across test
//! records but results always come back in test-set order.

use indicatif::ProgressBar;
use rayon::prelude::*;

use crate::distance::{aggregate, uniform_weights, Metric};
use crate::types::{GroundTruthRecord, NeighborEntry, Neighborhood, Record};
use crate::{Error, Result};

/// Brute-force scorer over a fixed training set
pub struct NeighborFinder<'a> {
    train: &'a [Record],
    weights: Vec<f64>,
    vector_dim: usize,
    threads: usize,
    progress: ProgressBar,
}

impl<'a> NeighborFinder<'a> {
    /// Prepare a finder over `train`.
    ///
    /// Weights are uniform over the first train record's sub-vectors; every
    /// train record must share its sub-vector count and dimension.
    pub fn new(train: &'a [Record]) -> Result<Self> {
        let first = train.first().ok_or_else(|| {
            Error::insufficient_data("no valid training data found after validation")
        })?;

        let finder = Self {
            train,
            weights: uniform_weights(first.num_vectors()),
            vector_dim: first.vector_dim(),
            threads: 0,
            progress: ProgressBar::hidden(),
        };

        for record in train {
            finder.check_shape(record)?;
        }

        Ok(finder)
    }

    /// Worker threads used by [`run`](Self::run); `0` means one per core.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Progress bar advanced once per scored test record
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn num_vectors(&self) -> usize {
        self.weights.len()
    }

    pub fn vector_dim(&self) -> usize {
        self.vector_dim
    }

    /// Reject records whose shape differs from the training set's.
    pub fn check_shape(&self, record: &Record) -> Result<()> {
        if record.num_vectors() != self.num_vectors() {
            return Err(Error::ShapeMismatch {
                id: record.id.to_string(),
                detail: format!(
                    "expected {} sub-vectors, found {}",
                    self.num_vectors(),
                    record.num_vectors()
                ),
            });
        }

        if let Some(sub) = record.embedding.iter().find(|v| v.len() != self.vector_dim) {
            return Err(Error::ShapeMismatch {
                id: record.id.to_string(),
                detail: format!(
                    "expected sub-vector dimension {}, found {}",
                    self.vector_dim,
                    sub.len()
                ),
            });
        }

        Ok(())
    }

    /// Ground truth for every record of `test`, in input order.
    ///
    /// All shapes are checked before scoring starts, so a mismatch yields no
    /// partial results.
    pub fn run(&self, test: &[Record], k: usize) -> Result<Vec<GroundTruthRecord>> {
        for record in test {
            self.check_shape(record)?;
        }

        tracing::info!(
            k,
            test = test.len(),
            train = self.train.len(),
            num_vectors = self.num_vectors(),
            vector_dim = self.vector_dim,
            "Finding nearest neighbors"
        );

        self.progress.set_length(test.len() as u64);

        let results: Vec<GroundTruthRecord> = if self.threads == 1 {
            test.iter().map(|query| self.score(query, k)).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.threads)
                .build()
                .map_err(|e| Error::internal(format!("Failed to build thread pool: {}", e)))?;
            pool.install(|| test.par_iter().map(|query| self.score(query, k)).collect())
        };

        self.progress.finish();
        Ok(results)
    }

    /// Ground truth for a single record.
    pub fn search(&self, query: &Record, k: usize) -> Result<GroundTruthRecord> {
        self.check_shape(query)?;
        Ok(self.score(query, k))
    }

    fn score(&self, query: &Record, k: usize) -> GroundTruthRecord {
        let mut euclidean = Vec::with_capacity(self.train.len());
        let mut cosine = Vec::with_capacity(self.train.len());

        for (idx, candidate) in self.train.iter().enumerate() {
            let emb_a = &query.embedding;
            let emb_b = &candidate.embedding;
            euclidean.push((idx, aggregate(emb_a, emb_b, &self.weights, Metric::Euclidean)));
            cosine.push((idx, aggregate(emb_a, emb_b, &self.weights, Metric::Cosine)));
        }

        let record = GroundTruthRecord {
            id: query.id.clone(),
            k,
            euclidean: self.top_k(euclidean, k),
            cosine: self.top_k(cosine, k),
        };

        self.progress.inc(1);
        record
    }

    /// Stable ascending sort, then keep the first `k`
    fn top_k(&self, mut scored: Vec<(usize, f64)>, k: usize) -> Neighborhood {
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        scored
            .into_iter()
            .map(|(idx, dist)| NeighborEntry {
                id: self.train[idx].id.clone(),
                dist,
            })
            .collect()
    }
}

/// Exhaustive top-`k` ground truth of `test_set` against `train_set`.
pub fn find_ground_truth(
    test_set: &[Record],
    train_set: &[Record],
    k: usize,
) -> Result<Vec<GroundTruthRecord>> {
    NeighborFinder::new(train_set)?.run(test_set, k)
}
