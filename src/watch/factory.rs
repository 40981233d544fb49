// src/watch/factory.rs

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::WatchConfig;
use crate::config::validate::validate_kinds;
use crate::errors::{DirwatchError, Result};
use crate::facility::{NotifyFacility, RawKind, WatchFacility};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::watcher::Watcher;

/// Validates watch requests and registers them with a facility.
///
/// The facility and filesystem are injected so tests can run against
/// [`FakeFacility`](crate::facility::FakeFacility) and
/// [`MockFileSystem`](crate::fs::mock::MockFileSystem).
#[derive(Debug, Clone)]
pub struct WatcherFactory {
    facility: Arc<dyn WatchFacility>,
    fs: Arc<dyn FileSystem>,
}

impl WatcherFactory {
    pub fn new(facility: Arc<dyn WatchFacility>, fs: Arc<dyn FileSystem>) -> Self {
        Self { facility, fs }
    }

    /// Factory over the process-wide native facility and the real
    /// filesystem.
    pub fn shared() -> Result<Self> {
        let facility: Arc<dyn WatchFacility> = NotifyFacility::shared()?;
        Ok(Self::new(facility, Arc::new(RealFileSystem)))
    }

    pub fn facility(&self) -> &Arc<dyn WatchFacility> {
        &self.facility
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Register `target` and return an open watcher with an empty buffer.
    ///
    /// Fails with [`DirwatchError::ConfigError`] when `target` does not
    /// exist, when `config` selects no kind, or when `watch_subtree` is
    /// requested for something that is not a directory.
    pub fn create_watcher(
        &self,
        target: impl AsRef<Path>,
        watch_subtree: bool,
        config: &WatchConfig,
    ) -> Result<Watcher> {
        let target = target.as_ref();

        if !self.fs.exists(target) {
            return Err(DirwatchError::config(format!(
                "watch target does not exist: {}",
                target.display()
            )));
        }
        validate_kinds(config)?;
        if watch_subtree && !self.fs.is_dir(target) {
            return Err(DirwatchError::config(format!(
                "subtree watching requires a directory, got: {}",
                target.display()
            )));
        }

        let root = self.fs.canonicalize(target)?;
        let kinds = raw_kinds(config);
        let key = self.facility.register(&root, watch_subtree, &kinds)?;
        debug!(%key, root = ?target, watch_subtree, ?kinds, "created watcher");

        Ok(Watcher::new(
            Arc::clone(&self.facility),
            key,
            target.to_path_buf(),
            watch_subtree,
        ))
    }

    /// Like [`create_watcher`](Self::create_watcher), with defaults:
    /// `subtree` falls back to "is `target` a directory", `config` to every
    /// kind.
    pub fn watch(
        &self,
        target: impl AsRef<Path>,
        subtree: Option<bool>,
        config: Option<WatchConfig>,
    ) -> Result<Watcher> {
        let target = target.as_ref();
        let subtree = subtree.unwrap_or_else(|| self.fs.is_dir(target));
        self.create_watcher(target, subtree, &config.unwrap_or_default())
    }
}

/// Facility-level kinds for the selected change kinds.
pub(crate) fn raw_kinds(config: &WatchConfig) -> Vec<RawKind> {
    let mut kinds = Vec::with_capacity(3);
    if config.watch_creations {
        kinds.push(RawKind::Created);
    }
    if config.watch_modifications {
        kinds.push(RawKind::Modified);
    }
    if config.watch_deletions {
        kinds.push(RawKind::Deleted);
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::FakeFacility;
    use crate::fs::mock::MockFileSystem;

    fn factory() -> (WatcherFactory, FakeFacility, MockFileSystem) {
        let fake = FakeFacility::new();
        let fs = MockFileSystem::new();
        fs.add_file("/w/a.txt");
        let factory = WatcherFactory::new(Arc::new(fake.clone()), Arc::new(fs.clone()));
        (factory, fake, fs)
    }

    #[test]
    fn registers_selected_kinds_only() {
        let (factory, fake, _fs) = factory();
        let config = WatchConfig::none().deletions(true).creations(true);

        let watcher = factory.create_watcher("/w", false, &config).unwrap();
        let reg = fake.registration(watcher.key()).unwrap();

        assert_eq!(reg.kinds, vec![RawKind::Created, RawKind::Deleted]);
        assert!(!reg.recursive);
        assert!(watcher.is_open());
    }

    #[test]
    fn subtree_defaults_to_is_directory() {
        let (factory, fake, _fs) = factory();

        let dir = factory.watch("/w", None, None).unwrap();
        let file = factory.watch("/w/a.txt", None, None).unwrap();

        assert!(fake.registration(dir.key()).unwrap().recursive);
        assert!(!fake.registration(file.key()).unwrap().recursive);
    }

    #[test]
    fn missing_target_is_rejected_before_registering() {
        let (factory, fake, _fs) = factory();

        let err = factory
            .create_watcher("/nope", false, &WatchConfig::default())
            .unwrap_err();
        assert!(matches!(err, DirwatchError::ConfigError(_)));
        assert_eq!(fake.registration_count(), 0);
    }

    #[test]
    fn facility_errors_are_propagated() {
        let (factory, fake, _fs) = factory();
        fake.fail_registrations("out of watches");

        let err = factory
            .create_watcher("/w", true, &WatchConfig::default())
            .unwrap_err();
        assert!(matches!(err, DirwatchError::IoError(_)));
    }
}
