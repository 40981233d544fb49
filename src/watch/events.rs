// src/watch/events.rs

//! Pull-style iteration over a [`Watcher`].
//!
//! Each step polls the watcher once. The view ends as soon as a poll comes
//! back empty, the watcher is closed, or a poll fails (the error is yielded
//! once, then the view ends). It never waits for new events: iterate again
//! later to pick up whatever arrived in the meantime.

use crate::errors::Result;
use crate::event::ChangeEvent;
use crate::watch::watcher::Watcher;

#[derive(Debug)]
pub struct Events<'a> {
    watcher: &'a mut Watcher,
    exhausted: bool,
}

impl<'a> Events<'a> {
    pub(crate) fn new(watcher: &'a mut Watcher) -> Self {
        Self {
            watcher,
            exhausted: false,
        }
    }

    /// Poll once. `Ok(None)` means the view has ended.
    pub fn advance(&mut self) -> Result<Option<ChangeEvent>> {
        if self.exhausted || self.watcher.is_closed() {
            self.exhausted = true;
            return Ok(None);
        }
        match self.watcher.poll() {
            Ok(Some(event)) => Ok(Some(event)),
            Ok(None) => {
                self.exhausted = true;
                Ok(None)
            }
            Err(err) => {
                self.exhausted = true;
                Err(err)
            }
        }
    }

    /// True once the view has nothing more to give.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl Iterator for Events<'_> {
    type Item = Result<ChangeEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().transpose()
    }
}

impl std::iter::FusedIterator for Events<'_> {}
