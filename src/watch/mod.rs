// src/watch/mod.rs

//! Synchronous watching.
//!
//! - [`factory`] validates a watch request and registers it.
//! - [`watcher`] owns one registration: poll, drain, flush, close.
//! - [`events`] is the pull-style iteration view over a watcher.
//! - [`translate`] maps raw facility notifications onto [`ChangeEvent`]s.
//!
//! [`ChangeEvent`]: crate::event::ChangeEvent

pub mod events;
pub mod factory;
pub mod translate;
pub mod watcher;

pub use events::Events;
pub use factory::WatcherFactory;
pub use watcher::Watcher;
