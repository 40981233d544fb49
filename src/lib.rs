// src/lib.rs

//! Watch files and directories for creations, modifications and deletions.
//!
//! Two ways to consume changes:
//! - synchronously, through a [`Watcher`]: [`poll`](Watcher::poll) one event,
//!   [`drain`](Watcher::drain) everything available, or iterate;
//! - asynchronously, through an [`EventStream`] fed by a Tokio task that
//!   drains a watcher on a timer and respects consumer backpressure.
//!
//! Both go through one process-wide OS watch facility
//! ([`NotifyFacility`](facility::NotifyFacility)), created on first use.
//! Build a [`WatcherFactory`] by hand to inject another facility, e.g.
//! [`FakeFacility`](facility::FakeFacility) in tests.

pub mod config;
pub mod errors;
pub mod event;
pub mod facility;
pub mod fs;
pub mod logging;
pub mod stream;
pub mod types;
pub mod watch;

use std::path::Path;

pub use config::{StreamOptions, WatchConfig};
pub use errors::{DirwatchError, Result};
pub use event::{ChangeEvent, ChangeKind};
pub use stream::{EventStream, FinishReason, StreamSummary};
pub use types::ChannelCapacity;
pub use watch::{Events, Watcher, WatcherFactory};

/// Watch `target` with the shared native facility.
///
/// `subtree` defaults to whether `target` is a directory; `config` defaults
/// to every event kind.
pub fn watch(
    target: impl AsRef<Path>,
    subtree: Option<bool>,
    config: Option<WatchConfig>,
) -> Result<Watcher> {
    WatcherFactory::shared()?.watch(target, subtree, config)
}

/// Stream the events of directory `target` with the shared native facility.
///
/// See [`WatcherFactory::watch_stream`].
pub fn watch_stream(target: impl AsRef<Path>, options: StreamOptions) -> Result<EventStream> {
    WatcherFactory::shared()?.watch_stream(target, options)
}
