// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawStreamConfig, StreamOptions};
use crate::errors::Result;

/// Read a stream config file and return the raw settings.
///
/// This only performs TOML deserialization; semantic checks (non-zero
/// timeout, at least one event kind) happen in [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawStreamConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawStreamConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Read a stream config file and turn it into checked [`StreamOptions`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<StreamOptions> {
    let raw = load_from_path(path)?;
    StreamOptions::try_from(raw)
}
