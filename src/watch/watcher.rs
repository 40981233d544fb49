// src/watch/watcher.rs

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::errors::{DirwatchError, Result};
use crate::event::ChangeEvent;
use crate::facility::{RegistrationKey, WatchFacility};
use crate::watch::events::Events;
use crate::watch::translate::translate;

/// Handle to one registration with a [`WatchFacility`].
///
/// A single native poll may hand back many notifications at once; the
/// watcher keeps the surplus in a FIFO buffer and gives them out one per
/// [`poll`](Watcher::poll), oldest first.
///
/// Dropping the watcher closes it.
pub struct Watcher {
    facility: Arc<dyn WatchFacility>,
    key: RegistrationKey,
    target: PathBuf,
    recursive: bool,
    buffer: VecDeque<ChangeEvent>,
    closed: bool,
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("key", &self.key)
            .field("target", &self.target)
            .field("recursive", &self.recursive)
            .field("buffered", &self.buffer.len())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    pub(crate) fn new(
        facility: Arc<dyn WatchFacility>,
        key: RegistrationKey,
        target: PathBuf,
        recursive: bool,
    ) -> Self {
        Self {
            facility,
            key,
            target,
            recursive,
            buffer: VecDeque::new(),
            closed: false,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn key(&self) -> RegistrationKey {
        self.key
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// True while the registration is live: not closed, and not
    /// invalidated by the OS (e.g. because the target was removed).
    pub fn is_open(&self) -> bool {
        !self.closed && self.facility.is_valid(self.key)
    }

    /// True once [`close`](Watcher::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_not_closed(&self) -> Result<()> {
        if self.closed {
            return Err(DirwatchError::closed());
        }
        Ok(())
    }

    /// Return the next pending event, or `None` if nothing is pending.
    ///
    /// Never blocks. Events the OS delivered before an invalidation are
    /// still returned; only a closed watcher fails.
    pub fn poll(&mut self) -> Result<Option<ChangeEvent>> {
        self.ensure_not_closed()?;

        if let Some(event) = self.buffer.pop_front() {
            return Ok(Some(event));
        }

        let mut batch = self.facility.poll(self.key);
        match batch.len() {
            0 => Ok(None),
            1 => translate(batch.remove(0)).map(Some),
            n => {
                trace!(key = %self.key, count = n, "buffering native batch");
                let events = batch
                    .into_iter()
                    .map(translate)
                    .collect::<Result<Vec<_>>>()?;
                self.buffer.extend(events);
                Ok(self.buffer.pop_front())
            }
        }
    }

    /// Collect everything currently available, in arrival order.
    pub fn drain(&mut self) -> Result<Vec<ChangeEvent>> {
        let mut events = Vec::new();
        while let Some(event) = self.poll()? {
            events.push(event);
        }
        Ok(events)
    }

    /// Throw away buffered events and whatever the OS has pending for this
    /// registration.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_not_closed()?;
        self.discard_pending();
        Ok(())
    }

    fn discard_pending(&mut self) {
        let buffered = self.buffer.len();
        self.buffer.clear();
        let pending = self.facility.poll(self.key).len();
        if buffered + pending > 0 {
            debug!(key = %self.key, buffered, pending, "discarded undelivered events");
        }
    }

    /// Release the registration. Calling this more than once is a no-op.
    ///
    /// Afterwards [`poll`](Watcher::poll), [`drain`](Watcher::drain) and
    /// [`flush`](Watcher::flush) fail with
    /// [`DirwatchError::InvalidState`].
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.discard_pending();
        self.facility.cancel(self.key);
        self.closed = true;
        debug!(key = %self.key, root = ?self.target, "watcher closed");
    }

    /// Pull view over the currently available events. See [`Events`].
    pub fn events(&mut self) -> Events<'_> {
        Events::new(self)
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.close();
    }
}

impl<'a> IntoIterator for &'a mut Watcher {
    type Item = Result<ChangeEvent>;
    type IntoIter = Events<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.events()
    }
}
