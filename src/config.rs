use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::dataset::split::{DEFAULT_SPLIT_SEED, DEFAULT_TEST_FRACTION};
use crate::pipeline::GenerateConfig;

const DEFAULT_K: usize = 100;

/// Top-level application configuration loaded from file + environment.
///
/// Environment keys use `MVGT_` followed by `section__field`, e.g.
/// `MVGT_SEARCH__K=10` or `MVGT_DATASET__ID_COLUMN=doc_id`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub dataset: DatasetSection,
    pub split: SplitSection,
    pub search: SearchSection,
    pub output: OutputSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from disk and environment.
    pub fn load() -> Result<Self> {
        let config_path = env::var("MVGT_CONFIG").unwrap_or_else(|_| "mvgt.toml".to_string());

        let mut builder = config::Config::builder();

        if Path::new(&config_path).exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(&config_path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MVGT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build()?;
        let mut config: Self = settings.try_deserialize()?;

        if config.logging.level.trim().is_empty() {
            config.logging.level = "info".to_string();
        }

        Ok(config)
    }

    /// Resolve the parameters of a `generate` run.
    pub fn generate_config(&self) -> Result<GenerateConfig> {
        let data_file = self
            .dataset
            .data_file
            .clone()
            .context("dataset.data_file must be specified")?;

        let config = GenerateConfig {
            data_file,
            id_column: self.dataset.id_column.clone(),
            embedding_column: self.dataset.embedding_column.clone(),
            sample_size: self.dataset.sample_size,
            test_fraction: self.split.test_fraction,
            seed: self.split.seed,
            k: self.search.k,
            threads: self.search.threads,
            show_progress: self.search.progress,
        };
        config.validate().context("invalid run configuration")?;

        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetSection {
    pub data_file: Option<PathBuf>,
    pub id_column: String,
    pub embedding_column: String,
    pub sample_size: Option<usize>,
}

impl Default for DatasetSection {
    fn default() -> Self {
        Self {
            data_file: None,
            id_column: "id".to_string(),
            embedding_column: "embedding".to_string(),
            sample_size: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SplitSection {
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for SplitSection {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SPLIT_SEED,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub k: usize,
    /// Worker threads for scoring, 0 = one per core
    pub threads: usize,
    pub progress: bool,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            threads: 0,
            progress: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub output_dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output_data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Text,
}
