// src/stream/mod.rs

//! Asynchronous streaming of watcher events.
//!
//! [`WatcherFactory::watch_stream`] wraps a directory watcher in one Tokio
//! task that, every `timeout`:
//! - drains the watcher,
//! - forwards each event, in order, into a bounded or rendezvous channel,
//!   waiting whenever the consumer falls behind.
//!
//! The loop stops when the consumer closes or drops its [`EventStream`],
//! or when the watched directory goes away. Either way the watcher is
//! closed before the task ends.
//!
//! The loop's semantics live in the pure [`core`] state machine; [`pump`]
//! is the async shell that runs it.

pub mod channel;
pub mod core;
pub(crate) mod pump;

use std::path::Path;

use tokio::runtime::Handle;
use tracing::debug;

use crate::config::StreamOptions;
use crate::config::validate::validate_timeout;
use crate::errors::{DirwatchError, Result};
use crate::watch::WatcherFactory;

pub use channel::EventStream;
pub use self::core::{PumpCommand, PumpCore, PumpEvent, PumpState};

/// Why a stream's producer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The consumer closed or dropped the stream.
    ConsumerClosed,
    /// The OS invalidated the watch, typically because the target was
    /// removed.
    WatcherInvalidated,
}

/// Returned by [`EventStream::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub reason: FinishReason,
    /// Events the consumer actually received through `recv`/`try_recv`.
    pub forwarded: u64,
    /// Events the producer handed to the channel. Exceeds `forwarded` by
    /// whatever a bounded channel still held when the stream was closed.
    pub sent: u64,
}

/// How the producer task ended, before the consumer side is accounted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProducerReport {
    pub(crate) reason: FinishReason,
    pub(crate) sent: u64,
}

impl WatcherFactory {
    /// Watch the directory `target` and stream its events.
    ///
    /// Fails with [`DirwatchError::ConfigError`] if `target` is not an
    /// existing directory, the timeout is zero, the kind set is empty, or
    /// no Tokio runtime is available (neither current nor given through
    /// [`StreamOptions::with_runtime`]).
    pub fn watch_stream(
        &self,
        target: impl AsRef<Path>,
        options: StreamOptions,
    ) -> Result<EventStream> {
        let target = target.as_ref();

        if !self.fs().exists(target) {
            return Err(DirwatchError::config(format!(
                "watch target does not exist: {}",
                target.display()
            )));
        }
        if !self.fs().is_dir(target) {
            return Err(DirwatchError::config(format!(
                "streams can only watch directories, got: {}",
                target.display()
            )));
        }
        validate_timeout(options.timeout)?;

        let runtime = match options.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| {
                DirwatchError::config(
                    "watch_stream needs a Tokio runtime: call it from within one or pass a handle",
                )
            })?,
        };

        let subtree = options.subtree.unwrap_or(true);
        let watcher = self.create_watcher(target, subtree, &options.config)?;
        debug!(
            key = %watcher.key(),
            root = ?target,
            capacity = %options.capacity,
            timeout = ?options.timeout,
            "starting event stream"
        );

        let (sink, rx) = channel::channel(options.capacity);
        let pump = pump::Pump::new(PumpCore::new(options.timeout), watcher, sink);
        let producer = runtime.spawn(pump.run());

        Ok(EventStream::new(rx, producer, target.to_path_buf()))
    }
}
