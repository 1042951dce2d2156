//! End-to-end ground-truth generation
//!
//! load → split → validate (train, test) → exhaustive search → write.
//! Everything up to encoding runs on a blocking thread; nothing is written
//! unless every stage succeeded.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;

use crate::dataset::{self, train_test_split};
use crate::output::RunDocuments;
use crate::search::NeighborFinder;
use crate::storage::StorageBackend;
use crate::validate::validate_with_stats;
use crate::{Error, Result};

/// Parameters of one generation run
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub data_file: PathBuf,
    pub id_column: String,
    pub embedding_column: String,
    pub sample_size: Option<usize>,
    pub test_fraction: f64,
    pub seed: u64,
    pub k: usize,
    pub threads: usize,
    pub show_progress: bool,
}

impl GenerateConfig {
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            id_column: "id".to_string(),
            embedding_column: "embedding".to_string(),
            sample_size: None,
            test_fraction: dataset::split::DEFAULT_TEST_FRACTION,
            seed: dataset::split::DEFAULT_SPLIT_SEED,
            k: 100,
            threads: 0,
            show_progress: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::configuration("k must be greater than 0"));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(Error::configuration(format!(
                "test fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.id_column.is_empty() || self.embedding_column.is_empty() {
            return Err(Error::configuration("column names must not be empty"));
        }
        Ok(())
    }

    /// Run directory name, derived from the dataset file name
    pub fn run_dir(&self) -> Result<String> {
        dataset::run_name(&self.data_file)
    }
}

/// What a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_dir: String,
    pub loaded: usize,
    pub train: usize,
    pub test: usize,
    pub skipped_train: usize,
    pub skipped_test: usize,
    pub vector_dim: usize,
    pub num_vectors: usize,
    pub k: usize,
}

/// Generate and persist ground truth for `config.data_file`
pub async fn generate(config: &GenerateConfig, storage: &dyn StorageBackend) -> Result<RunSummary> {
    config.validate()?;
    let run_dir = config.run_dir()?;

    let job = config.clone();
    let (docs, mut summary) = tokio::task::spawn_blocking(move || compute(&job))
        .await
        .map_err(|e| Error::internal(format!("ground truth task failed: {}", e)))??;

    tracing::info!(%run_dir, "Saving documents");
    docs.write(storage, &run_dir).await?;

    summary.run_dir = run_dir;
    tracing::info!(
        train = summary.train,
        test = summary.test,
        k = summary.k,
        "Ground truth generated"
    );
    Ok(summary)
}

/// Blocking part of a run: everything except the writes
pub fn compute(config: &GenerateConfig) -> Result<(RunDocuments, RunSummary)> {
    let fields = [config.id_column.as_str(), config.embedding_column.as_str()];
    let records = dataset::load_records(&config.data_file, &fields, config.sample_size)?;
    let loaded = records.len();

    let split = train_test_split(records, config.test_fraction, config.seed)?;

    let train = validate_with_stats(&split.train, &config.id_column, &config.embedding_column)?;
    let test = validate_with_stats(&split.test, &config.id_column, &config.embedding_column)?;

    let finder = NeighborFinder::new(&train.records)?
        .with_threads(config.threads)
        .with_progress(progress_bar(config.show_progress, test.records.len())?);
    let ground_truth = finder.run(&test.records, config.k)?;

    let docs = RunDocuments::encode(&train.records, &test.records, &ground_truth)?;

    let summary = RunSummary {
        run_dir: String::new(),
        loaded,
        train: train.records.len(),
        test: test.records.len(),
        skipped_train: train.skipped,
        skipped_test: test.skipped,
        vector_dim: finder.vector_dim(),
        num_vectors: finder.num_vectors(),
        k: config.k,
    };

    Ok((docs, summary))
}

fn progress_bar(enabled: bool, len: usize) -> Result<ProgressBar> {
    if !enabled {
        return Ok(ProgressBar::hidden());
    }

    let progress = ProgressBar::with_draw_target(Some(len as u64), ProgressDrawTarget::stderr());
    progress.set_style(
        ProgressStyle::with_template(
            "Finding neighbors [{elapsed_precise}] {wide_bar} {pos}/{len} {eta}",
        )
        .map_err(|e| Error::internal(format!("invalid progress template: {}", e)))?,
    );
    Ok(progress)
}
