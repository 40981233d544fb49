// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirwatchError {
    /// The caller asked for something that can never work (missing target,
    /// empty kind set, subtree on a plain file, zero timeout, ...).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An operation was attempted on a watcher that has been closed.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The watch backend reported something the kind/path mapping cannot
    /// represent. Indicates a platform mapping bug.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Watch backend error: {0}")]
    NotifyError(#[from] notify::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DirwatchError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        DirwatchError::ConfigError(msg.into())
    }

    pub(crate) fn closed() -> Self {
        DirwatchError::InvalidState("watcher has been closed".to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DirwatchError>;
