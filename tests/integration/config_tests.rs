use clap::Parser;
use linkdupe::cli::{Cli, OutputFormat};
use linkdupe::config::Config;
use linkdupe::error::FatalConfigError;
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all LINKDUPE_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("LINKDUPE_") {
            std::env::remove_var(key);
        }
    }
    std::env::remove_var("NO_COLOR");
}

#[test]
fn test_config_missing_file_gives_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();

    let config = Config::load_from_path(dir.path().join("absent.toml"));

    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
workers = 6
chunk_size = 65536
min_size = 1024
skip_hidden = true
ignore_patterns = ["*.tmp", "build/"]
output = "json"
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&path);

    assert_eq!(config.workers, Some(6));
    assert_eq!(config.chunk_size, 65536);
    assert_eq!(config.min_size, Some(1024));
    assert_eq!(config.max_size, None);
    assert!(config.skip_hidden);
    assert_eq!(config.ignore_patterns, vec!["*.tmp", "build/"]);
    assert_eq!(config.output, OutputFormat::Json);
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "workers = 6\noutput = \"csv\"\n").unwrap();

    std::env::set_var("LINKDUPE_WORKERS", "12");
    let config = Config::load_from_path(&path);
    clear_env();

    assert_eq!(config.workers, Some(12));
    assert_eq!(config.output, OutputFormat::Csv);
}

#[test]
fn test_cli_overrides_env_and_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "workers = 6\nmin_size = 10\nignore_patterns = [\"*.log\"]\n").unwrap();

    std::env::set_var("LINKDUPE_WORKERS", "12");
    let mut config = Config::load_from_path(&path);
    clear_env();

    let cli = Cli::try_parse_from([
        "linkdupe",
        "--workers",
        "3",
        "--min-size",
        "1KB",
        "--ignore",
        "*.bak",
        "--output",
        "json",
        "/data",
    ])
    .unwrap();
    config.merge_cli(&cli);

    assert_eq!(config.workers, Some(3));
    assert_eq!(config.min_size, Some(1000));
    assert_eq!(config.ignore_patterns, vec!["*.log", "*.bak"]);
    assert_eq!(config.output, OutputFormat::Json);
}

#[test]
fn test_unset_cli_flags_keep_loaded_values() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "workers = 5\nskip_hidden = true\n").unwrap();

    let mut config = Config::load_from_path(&path);
    let cli = Cli::try_parse_from(["linkdupe", "/data"]).unwrap();
    config.merge_cli(&cli);

    assert_eq!(config.workers, Some(5));
    assert!(config.skip_hidden);
    assert_eq!(config.output, OutputFormat::Text);
}

#[test]
fn test_invalid_toml_falls_back_to_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "workers = \"many\"\n[[[broken").unwrap();

    assert!(Config::try_load_from_path(&path).is_err());
    assert_eq!(Config::load_from_path(&path), Config::default());
}

#[test]
fn test_zero_workers_from_file_is_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "workers = 0\n").unwrap();

    let config = Config::load_from_path(&path);

    assert_eq!(config.validate(), Err(FatalConfigError::InvalidWorkers));
}

#[test]
fn test_config_save_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("saved").join("config.toml");

    let config = Config {
        workers: Some(4),
        skip_hidden: true,
        output: OutputFormat::Csv,
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, toml::to_string_pretty(&config).unwrap());
    assert_eq!(Config::load_from_path(&path), config);
}
