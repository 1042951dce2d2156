//! mvgt command-line binary

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mvgt::config::{AppConfig, LogFormat};
use mvgt::eval::{GroundTruth, QueryResult};
use mvgt::pipeline;
use mvgt::storage::local::LocalStorage;
use mvgt::Metric;

/// Generate brute-force ground truth for multi-vector datasets
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a dataset, compute exact top-k neighbors and write the run documents
    Generate(GenerateArgs),
    /// Score approximate search results against a generated run
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Dataset file (.parquet, .json or .jsonl)
    #[arg(long, alias = "data_file")]
    data_file: Option<PathBuf>,

    /// Identifier column
    #[arg(long, alias = "id_column")]
    id_column: Option<String>,

    /// Multi-vector embedding column
    #[arg(long, alias = "embedding_column")]
    embedding_column: Option<String>,

    /// Only read the first N records
    #[arg(long, alias = "sample_size")]
    sample_size: Option<usize>,

    /// Number of neighbors to keep per test record
    #[arg(long)]
    k: Option<usize>,

    /// Root directory for run outputs
    #[arg(long, alias = "output_dir")]
    output_dir: Option<PathBuf>,

    /// Scoring threads, 0 = one per core
    #[arg(long)]
    threads: Option<usize>,

    /// Seed for the train/test split
    #[arg(long)]
    seed: Option<u64>,

    /// Fraction of records held out as test queries
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

impl GenerateArgs {
    fn apply(self, config: &mut AppConfig) {
        if let Some(v) = self.data_file {
            config.dataset.data_file = Some(v);
        }
        if let Some(v) = self.id_column {
            config.dataset.id_column = v;
        }
        if let Some(v) = self.embedding_column {
            config.dataset.embedding_column = v;
        }
        if self.sample_size.is_some() {
            config.dataset.sample_size = self.sample_size;
        }
        if let Some(v) = self.k {
            config.search.k = v;
        }
        if let Some(v) = self.output_dir {
            config.output.output_dir = v;
        }
        if let Some(v) = self.threads {
            config.search.threads = v;
        }
        if let Some(v) = self.seed {
            config.split.seed = v;
        }
        if let Some(v) = self.test_fraction {
            config.split.test_fraction = v;
        }
        if self.no_progress {
            config.search.progress = false;
        }
    }
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Run directory containing neighbours.json
    #[arg(long)]
    run_dir: PathBuf,

    /// JSON array of {"id", "ids"} result lists
    #[arg(long)]
    results: PathBuf,

    /// euclidean or cosine
    #[arg(long, default_value = "cosine")]
    metric: Metric,

    /// Recall depth, defaults to the ground truth's k
    #[arg(long)]
    k: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config)?;

    let outcome = match cli.command {
        Command::Generate(args) => {
            args.apply(&mut config);
            run_generate(&config).await
        }
        Command::Evaluate(args) => run_evaluate(args).await,
    };

    if let Err(err) = &outcome {
        tracing::error!(error = %format!("{:#}", err), "Run failed");
    }
    outcome
}

async fn run_generate(config: &AppConfig) -> anyhow::Result<()> {
    let generate_config = config.generate_config()?;

    tracing::info!(
        data_file = %generate_config.data_file.display(),
        k = generate_config.k,
        sample_size = ?generate_config.sample_size,
        "Generating ground truth"
    );

    let storage = LocalStorage::new(&config.output.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output.output_dir.display()
        )
    })?;

    let summary = pipeline::generate(&generate_config, &storage)
        .await
        .context("ground truth generation failed")?;

    tracing::info!(
        output = %storage.root().join(&summary.run_dir).display(),
        skipped_train = summary.skipped_train,
        skipped_test = summary.skipped_test,
        "Done"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

async fn run_evaluate(args: EvaluateArgs) -> anyhow::Result<()> {
    let storage = LocalStorage::new(&args.run_dir)?;
    let ground_truth = GroundTruth::load(&storage, "")
        .await
        .with_context(|| format!("failed to load ground truth from {}", args.run_dir.display()))?;

    let data = tokio::fs::read(&args.results)
        .await
        .with_context(|| format!("failed to read {}", args.results.display()))?;
    let results: Vec<QueryResult> =
        serde_json::from_slice(&data).context("results must be a JSON array of {id, ids}")?;

    let k = args.k.unwrap_or(ground_truth.k());
    let report = ground_truth.evaluate(args.metric, &results, k)?;

    tracing::info!(
        metric = %report.metric,
        k = report.k,
        queries = report.queries,
        recall = report.recall,
        "Evaluation finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.logging.level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("mvgt=info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
