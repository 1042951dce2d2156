use std::path::PathBuf;

use mvgt::config::{AppConfig, DatasetSection, LogFormat, SearchSection, SplitSection};

#[test]
fn data_file_is_required() {
    let config = AppConfig::default();
    let result = config.generate_config();
    assert!(
        result.is_err(),
        "Expected missing dataset.data_file to fail validation"
    );
}

#[test]
fn defaults_match_reference_run() {
    let config = AppConfig {
        dataset: DatasetSection {
            data_file: Some(PathBuf::from("se_cs_768.parquet")),
            ..Default::default()
        },
        ..Default::default()
    };

    let run = config
        .generate_config()
        .expect("default configuration should be valid");

    assert_eq!(run.id_column, "id");
    assert_eq!(run.embedding_column, "embedding");
    assert_eq!(run.k, 100);
    assert_eq!(run.seed, 42);
    assert_eq!(run.test_fraction, 0.1);
    assert_eq!(run.sample_size, None);
    assert_eq!(run.run_dir().unwrap(), "se_cs_768");
    assert_eq!(config.output.output_dir, PathBuf::from("output_data"));
    assert!(matches!(config.logging.format, LogFormat::Text));
}

#[test]
fn zero_k_is_rejected() {
    let config = AppConfig {
        dataset: DatasetSection {
            data_file: Some(PathBuf::from("data.jsonl")),
            ..Default::default()
        },
        search: SearchSection {
            k: 0,
            ..Default::default()
        },
        ..Default::default()
    };

    assert!(config.generate_config().is_err());
}

#[test]
fn test_fraction_out_of_range_is_rejected() {
    let config = AppConfig {
        dataset: DatasetSection {
            data_file: Some(PathBuf::from("data.jsonl")),
            ..Default::default()
        },
        split: SplitSection {
            test_fraction: 1.0,
            ..Default::default()
        },
        ..Default::default()
    };

    assert!(config.generate_config().is_err());
}

#[test]
fn config_file_is_loaded() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("mvgt.toml");
    std::fs::write(
        &path,
        r#"
[dataset]
data_file = "datasets/small.parquet"
id_column = "doc_id"
sample_size = 500

[search]
k = 10
threads = 2

[logging]
format = "json"
"#,
    )
    .unwrap();

    std::env::set_var("MVGT_CONFIG", &path);
    let config = AppConfig::load().expect("config file should parse");
    std::env::remove_var("MVGT_CONFIG");

    assert_eq!(config.dataset.id_column, "doc_id");
    assert_eq!(config.dataset.embedding_column, "embedding");
    assert_eq!(config.dataset.sample_size, Some(500));
    assert_eq!(config.search.k, 10);
    assert_eq!(config.search.threads, 2);
    assert!(config.search.progress);
    assert!(matches!(config.logging.format, LogFormat::Json));
    assert_eq!(config.logging.level, "info");

    let run = config.generate_config().unwrap();
    assert_eq!(run.run_dir().unwrap(), "small");
}
