// src/config/mod.rs

//! Watch and stream configuration.
//!
//! - [`model`] holds the in-memory types ([`WatchConfig`], [`StreamOptions`])
//!   and the raw TOML shape ([`RawStreamConfig`]).
//! - [`loader`] reads TOML files.
//! - [`validate`] turns raw settings into checked [`StreamOptions`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{DEFAULT_TIMEOUT, RawStreamConfig, StreamOptions, WatchConfig};
