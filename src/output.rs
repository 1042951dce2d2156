//! Ground-truth run documents
//!
//! A run directory holds `train.json`, `test.json` and `neighbours.json`.
//! All three are encoded in memory first and only written once encoding has
//! succeeded. If a write fails, documents already written by that run are
//! deleted again.

use bytes::Bytes;

use crate::storage::StorageBackend;
use crate::types::{GroundTruthRecord, Record};
use crate::Result;

pub const TRAIN_FILE: &str = "train.json";
pub const TEST_FILE: &str = "test.json";
pub const NEIGHBOURS_FILE: &str = "neighbours.json";

/// Encoded documents of one run
#[derive(Debug, Clone)]
pub struct RunDocuments {
    pub train: Bytes,
    pub test: Bytes,
    pub neighbours: Bytes,
}

impl RunDocuments {
    /// Train and test are compact, neighbours is indented for inspection
    pub fn encode(
        train: &[Record],
        test: &[Record],
        ground_truth: &[GroundTruthRecord],
    ) -> Result<Self> {
        Ok(Self {
            train: Bytes::from(serde_json::to_vec(train)?),
            test: Bytes::from(serde_json::to_vec(test)?),
            neighbours: Bytes::from(serde_json::to_vec_pretty(ground_truth)?),
        })
    }

    /// Write all documents under `run_dir`, replacing an earlier run there
    pub async fn write(&self, storage: &dyn StorageBackend, run_dir: &str) -> Result<()> {
        let neighbours_key = run_key(run_dir, NEIGHBOURS_FILE);
        if storage.exists(&neighbours_key).await? {
            tracing::warn!(%run_dir, "Overwriting existing ground truth");
        }

        let mut written = Vec::with_capacity(3);
        for (name, data) in [
            (TRAIN_FILE, &self.train),
            (TEST_FILE, &self.test),
            (NEIGHBOURS_FILE, &self.neighbours),
        ] {
            let key = run_key(run_dir, name);
            tracing::info!(%key, bytes = data.len(), "Writing document");
            if let Err(e) = storage.put(&key, data.clone()).await {
                rollback(storage, &written).await;
                return Err(e);
            }
            written.push(key);
        }
        Ok(())
    }
}

async fn rollback(storage: &dyn StorageBackend, keys: &[String]) {
    for key in keys {
        if let Err(e) = storage.delete(key).await {
            tracing::warn!(%key, error = %e, "Failed to remove partial document");
        }
    }
}

/// Storage key of `file` inside `run_dir`
pub fn run_key(run_dir: &str, file: &str) -> String {
    if run_dir.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", run_dir.trim_end_matches('/'), file)
    }
}
