mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::io::Write;
use std::time::Duration;

use dirwatch::config::{DEFAULT_TIMEOUT, load_and_validate, load_from_path};
use dirwatch::{ChannelCapacity, DirwatchError};
use tempfile::NamedTempFile;

type TestResult = Result<(), Box<dyn Error>>;

fn config_file(contents: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn loads_a_complete_stream_config() -> TestResult {
    init_tracing();
    let file = config_file(
        r#"
timeout_ms = 250
capacity = "rendezvous"
subtree = true

[events]
creations = true
modifications = false
deletions = true
"#,
    )?;

    let options = load_and_validate(file.path())?;

    assert_eq!(options.timeout, Duration::from_millis(250));
    assert_eq!(options.capacity, ChannelCapacity::Rendezvous);
    assert_eq!(options.subtree, Some(true));
    assert!(!options.config.watch_modifications);
    assert!(options.runtime.is_none());
    Ok(())
}

#[test]
fn raw_loading_skips_semantic_checks() -> TestResult {
    init_tracing();
    let file = config_file("timeout_ms = 0\n")?;

    let raw = load_from_path(file.path())?;
    assert_eq!(raw.timeout_ms, 0);

    assert!(matches!(
        load_and_validate(file.path()),
        Err(DirwatchError::ConfigError(_))
    ));
    Ok(())
}

#[test]
fn empty_file_uses_defaults() -> TestResult {
    init_tracing();
    let file = config_file("")?;

    let options = load_and_validate(file.path())?;

    assert_eq!(options.timeout, DEFAULT_TIMEOUT);
    assert_eq!(options.capacity, ChannelCapacity::default());
    assert_eq!(options.subtree, None);
    Ok(())
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    init_tracing();
    let file = config_file("timeout_ms = [\n")?;

    assert!(matches!(
        load_and_validate(file.path()),
        Err(DirwatchError::TomlError(_))
    ));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let result = load_and_validate(dir.path().join("absent.toml"));

    assert!(matches!(result, Err(DirwatchError::IoError(_))));
    Ok(())
}
