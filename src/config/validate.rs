// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{RawStreamConfig, StreamOptions, WatchConfig};
use crate::errors::{DirwatchError, Result};

impl TryFrom<RawStreamConfig> for StreamOptions {
    type Error = DirwatchError;

    fn try_from(raw: RawStreamConfig) -> std::result::Result<Self, Self::Error> {
        let timeout = Duration::from_millis(raw.timeout_ms);
        validate_timeout(timeout)?;
        validate_kinds(&raw.events)?;

        Ok(StreamOptions {
            timeout,
            capacity: raw.capacity,
            subtree: raw.subtree,
            config: raw.events,
            runtime: None,
        })
    }
}

/// A watcher that watches nothing is a configuration error.
pub fn validate_kinds(config: &WatchConfig) -> Result<()> {
    if config.is_empty() {
        return Err(DirwatchError::config(
            "watch config must select at least one of creations, modifications or deletions",
        ));
    }
    Ok(())
}

pub fn validate_timeout(timeout: Duration) -> Result<()> {
    if timeout.is_zero() {
        return Err(DirwatchError::config(
            "timeout must be a non-zero positive duration",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelCapacity;

    fn parse(toml_src: &str) -> Result<StreamOptions> {
        let raw: RawStreamConfig = toml::from_str(toml_src)?;
        StreamOptions::try_from(raw)
    }

    #[test]
    fn empty_file_gives_defaults() {
        let opts = parse("").unwrap();
        assert_eq!(opts.timeout, Duration::from_millis(500));
        assert_eq!(opts.capacity, ChannelCapacity::Rendezvous);
        assert_eq!(opts.subtree, None);
        assert_eq!(opts.config, WatchConfig::default());
    }

    #[test]
    fn reads_every_setting() {
        let opts = parse(
            r#"
timeout_ms = 50
capacity = 16
subtree = false

[events]
modifications = false
"#,
        )
        .unwrap();

        assert_eq!(opts.timeout, Duration::from_millis(50));
        assert_eq!(opts.capacity, ChannelCapacity::from_count(16));
        assert_eq!(opts.subtree, Some(false));
        assert!(opts.config.watch_creations);
        assert!(!opts.config.watch_modifications);
        assert!(opts.config.watch_deletions);
    }

    #[test]
    fn zero_timeout_is_a_config_error() {
        match parse("timeout_ms = 0") {
            Err(DirwatchError::ConfigError(msg)) => assert!(msg.contains("timeout")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn empty_kind_set_is_a_config_error() {
        let src = r#"
[events]
creations = false
modifications = false
deletions = false
"#;
        assert!(matches!(parse(src), Err(DirwatchError::ConfigError(_))));
    }

    #[test]
    fn bad_capacity_is_rejected_while_parsing() {
        assert!(matches!(parse("capacity = 0"), Err(DirwatchError::TomlError(_))));
        assert!(matches!(
            parse("capacity = \"huge\""),
            Err(DirwatchError::TomlError(_))
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(parse("timeout = 5"), Err(DirwatchError::TomlError(_))));
    }
}
