// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;
use tokio::runtime::Handle;

use crate::types::ChannelCapacity;

/// Default pause between two drains of a stream's watcher.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Which kinds of change a watcher reports. All enabled by default.
///
/// In TOML this is the `[events]` table:
///
/// ```toml
/// [events]
/// creations = true
/// modifications = false
/// deletions = true
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    #[serde(rename = "creations")]
    pub watch_creations: bool,
    #[serde(rename = "modifications")]
    pub watch_modifications: bool,
    #[serde(rename = "deletions")]
    pub watch_deletions: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            watch_creations: true,
            watch_modifications: true,
            watch_deletions: true,
        }
    }
}

impl WatchConfig {
    /// A config with every kind disabled; enable kinds with the setters.
    pub fn none() -> Self {
        Self {
            watch_creations: false,
            watch_modifications: false,
            watch_deletions: false,
        }
    }

    pub fn creations(mut self, on: bool) -> Self {
        self.watch_creations = on;
        self
    }

    pub fn modifications(mut self, on: bool) -> Self {
        self.watch_modifications = on;
        self
    }

    pub fn deletions(mut self, on: bool) -> Self {
        self.watch_deletions = on;
        self
    }

    /// True when no kind is selected.
    pub fn is_empty(&self) -> bool {
        !(self.watch_creations || self.watch_modifications || self.watch_deletions)
    }
}

/// Stream settings as written in a TOML file.
///
/// This is the raw shape; use [`StreamOptions::try_from`] (or
/// [`load_and_validate`](crate::config::load_and_validate)) to get checked
/// options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStreamConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub capacity: ChannelCapacity,

    /// Watch the whole subtree. Absent means: yes for directories.
    #[serde(default)]
    pub subtree: Option<bool>,

    #[serde(default)]
    pub events: WatchConfig,
}

fn default_timeout_ms() -> u64 {
    saturating_millis(DEFAULT_TIMEOUT)
}

/// Whole milliseconds in `d`, capped at `u64::MAX`.
pub(crate) fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Default for RawStreamConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            capacity: ChannelCapacity::default(),
            subtree: None,
            events: WatchConfig::default(),
        }
    }
}

/// Options for [`watch_stream`](crate::watch_stream).
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Pause between two drains of the watcher. Must be non-zero.
    pub timeout: Duration,
    pub capacity: ChannelCapacity,
    /// `None` watches the subtree when the target is a directory.
    pub subtree: Option<bool>,
    pub config: WatchConfig,
    /// Runtime the producer task is spawned on. Defaults to the current one.
    pub runtime: Option<Handle>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            capacity: ChannelCapacity::default(),
            subtree: None,
            config: WatchConfig::default(),
            runtime: None,
        }
    }
}

impl StreamOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_capacity(mut self, capacity: ChannelCapacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_subtree(mut self, subtree: bool) -> Self {
        self.subtree = Some(subtree);
        self
    }

    pub fn with_config(mut self, config: WatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_saturate_instead_of_wrapping() {
        assert_eq!(saturating_millis(Duration::from_millis(500)), 500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
        assert_eq!(default_timeout_ms(), 500);
    }
}
