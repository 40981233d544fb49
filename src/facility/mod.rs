// src/facility/mod.rs

//! The OS watch facility seam.
//!
//! A [`WatchFacility`] multiplexes every registration in the process. Each
//! [`Watcher`](crate::watch::Watcher) holds one [`RegistrationKey`] into it
//! and never touches another watcher's state.
//!
//! - [`native`] is the production implementation built on `notify`.
//! - [`fake`] is a scripted, in-memory implementation for tests.

pub mod fake;
pub mod native;

use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::Result;

pub use fake::FakeFacility;
pub use native::NotifyFacility;

/// Opaque handle identifying one registration inside a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationKey(u64);

impl RegistrationKey {
    /// Allocate a process-unique key.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RegistrationKey(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Event kind as reported by a facility.
///
/// `Other` carries anything a backend produced outside the three kinds a
/// watcher understands; translating it is an invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawKind {
    Created,
    Deleted,
    Modified,
    Other(String),
}

/// One undelivered notification, as held by a facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNotification {
    pub kind: RawKind,
    /// Path of the affected entry relative to the registered target.
    /// `None` means the backend delivered a notification without a path.
    pub context: Option<PathBuf>,
    /// How many times this identical notification occurred since the last
    /// poll. Always at least 1.
    pub count: u32,
}

impl RawNotification {
    pub fn new(kind: RawKind, context: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            context: Some(context.into()),
            count: 1,
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count.max(1);
        self
    }

    /// True when `other` is the same notification (kind and path), so the
    /// two can be folded into one with a higher count.
    pub fn same_as(&self, other: &RawNotification) -> bool {
        self.kind == other.kind && self.context == other.context
    }
}

/// Abstract OS watch facility.
///
/// Implementations must be safe for concurrent registration and
/// cancellation from multiple watchers; `poll` must never block.
pub trait WatchFacility: Send + Sync + Debug {
    /// Register `target` for the given kinds, optionally including its
    /// whole subtree.
    fn register(&self, target: &Path, recursive: bool, kinds: &[RawKind])
    -> Result<RegistrationKey>;

    /// Take every notification pending for `key`, oldest first. Returns an
    /// empty list for unknown keys.
    fn poll(&self, key: RegistrationKey) -> Vec<RawNotification>;

    /// Whether the registration is still live (not cancelled and not
    /// invalidated by the OS).
    fn is_valid(&self, key: RegistrationKey) -> bool;

    /// Drop the registration. Unknown keys are ignored.
    fn cancel(&self, key: RegistrationKey);
}

/// Push `notification` onto `pending`, folding it into the last entry if
/// they are identical.
pub(crate) fn push_coalesced(pending: &mut Vec<RawNotification>, notification: RawNotification) {
    if let Some(last) = pending.last_mut() {
        if last.same_as(&notification) {
            last.count = last.count.saturating_add(notification.count);
            return;
        }
    }
    pending.push(notification);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_consecutive_notifications_are_folded() {
        let mut pending = Vec::new();
        push_coalesced(&mut pending, RawNotification::new(RawKind::Modified, "a"));
        push_coalesced(&mut pending, RawNotification::new(RawKind::Modified, "a"));
        push_coalesced(&mut pending, RawNotification::new(RawKind::Modified, "a"));

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].count, 3);
    }

    #[test]
    fn different_notifications_are_kept_apart() {
        let mut pending = Vec::new();
        push_coalesced(&mut pending, RawNotification::new(RawKind::Modified, "a"));
        push_coalesced(&mut pending, RawNotification::new(RawKind::Modified, "b"));
        push_coalesced(&mut pending, RawNotification::new(RawKind::Modified, "a"));
        push_coalesced(&mut pending, RawNotification::new(RawKind::Deleted, "a"));

        let counts: Vec<u32> = pending.iter().map(|n| n.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 1]);
    }

    #[test]
    fn keys_are_unique() {
        let a = RegistrationKey::next();
        let b = RegistrationKey::next();
        assert_ne!(a, b);
    }
}
