// src/facility/fake.rs

//! Scripted in-memory watch facility.
//!
//! Tests push batches of [`RawNotification`]s for a registration and then
//! observe how a watcher or stream delivers them. Nothing here touches the
//! real filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::{DirwatchError, Result};
use crate::facility::{RawKind, RawNotification, RegistrationKey, WatchFacility};

/// What the fake knows about one registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRegistration {
    pub target: PathBuf,
    pub recursive: bool,
    pub kinds: Vec<RawKind>,
    pub valid: bool,
    /// Pending native poll results. Each inner vector is returned whole by
    /// one `poll` call, modelling a backend that delivers in batches.
    pub batches: Vec<Vec<RawNotification>>,
}

#[derive(Debug, Default)]
struct FakeState {
    registrations: HashMap<RegistrationKey, FakeRegistration>,
    cancelled: Vec<RegistrationKey>,
    polls: usize,
    fail_register: Option<String>,
}

/// In-memory [`WatchFacility`]. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct FakeFacility {
    state: Arc<Mutex<FakeState>>,
}

impl FakeFacility {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `register` calls fail with the given message.
    pub fn fail_registrations(&self, msg: impl Into<String>) {
        self.state().fail_register = Some(msg.into());
    }

    /// Queue one native batch for `key`. Empty batches are ignored.
    pub fn push_batch(&self, key: RegistrationKey, batch: Vec<RawNotification>) {
        if batch.is_empty() {
            return;
        }
        if let Some(reg) = self.state().registrations.get_mut(&key) {
            reg.batches.push(batch);
        }
    }

    /// Queue a single notification as its own batch.
    pub fn push(&self, key: RegistrationKey, notification: RawNotification) {
        self.push_batch(key, vec![notification]);
    }

    /// Simulate the OS invalidating the registration (e.g. target removed).
    pub fn invalidate(&self, key: RegistrationKey) {
        if let Some(reg) = self.state().registrations.get_mut(&key) {
            reg.valid = false;
        }
    }

    /// Key of the live registration for `target`, if any.
    pub fn key_for(&self, target: impl AsRef<Path>) -> Option<RegistrationKey> {
        let target = target.as_ref();
        self.state()
            .registrations
            .iter()
            .find(|(_, reg)| reg.target == target)
            .map(|(key, _)| *key)
    }

    pub fn registration(&self, key: RegistrationKey) -> Option<FakeRegistration> {
        self.state().registrations.get(&key).cloned()
    }

    pub fn registration_count(&self) -> usize {
        self.state().registrations.len()
    }

    /// Keys passed to `cancel`, in call order.
    pub fn cancelled(&self) -> Vec<RegistrationKey> {
        self.state().cancelled.clone()
    }

    /// Number of `poll` calls made so far.
    pub fn poll_count(&self) -> usize {
        self.state().polls
    }

    /// Number of batches queued and not yet polled for `key`.
    pub fn pending_batches(&self, key: RegistrationKey) -> usize {
        self.state()
            .registrations
            .get(&key)
            .map(|reg| reg.batches.len())
            .unwrap_or(0)
    }
}

impl WatchFacility for FakeFacility {
    fn register(
        &self,
        target: &Path,
        recursive: bool,
        kinds: &[RawKind],
    ) -> Result<RegistrationKey> {
        let mut state = self.state();
        if let Some(msg) = &state.fail_register {
            return Err(DirwatchError::IoError(std::io::Error::other(msg.clone())));
        }

        let key = RegistrationKey::next();
        state.registrations.insert(
            key,
            FakeRegistration {
                target: target.to_path_buf(),
                recursive,
                kinds: kinds.to_vec(),
                valid: true,
                batches: Vec::new(),
            },
        );
        Ok(key)
    }

    fn poll(&self, key: RegistrationKey) -> Vec<RawNotification> {
        let mut state = self.state();
        state.polls += 1;
        match state.registrations.get_mut(&key) {
            Some(reg) if !reg.batches.is_empty() => reg.batches.remove(0),
            _ => Vec::new(),
        }
    }

    fn is_valid(&self, key: RegistrationKey) -> bool {
        self.state()
            .registrations
            .get(&key)
            .map(|reg| reg.valid)
            .unwrap_or(false)
    }

    fn cancel(&self, key: RegistrationKey) {
        let mut state = self.state();
        state.cancelled.push(key);
        state.registrations.remove(&key);
    }
}
