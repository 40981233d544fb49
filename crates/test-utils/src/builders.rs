use std::path::Path;
use std::sync::Arc;

use dirwatch::facility::{FakeFacility, RawKind, RawNotification};
use dirwatch::fs::mock::MockFileSystem;
use dirwatch::WatcherFactory;

/// Builder for one native batch handed out by a single `FakeFacility::poll`.
#[derive(Debug, Default)]
pub struct BatchBuilder {
    batch: Vec<RawNotification>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(self, path: &str) -> Self {
        self.with(RawKind::Created, path, 1)
    }

    pub fn modified(self, path: &str) -> Self {
        self.with(RawKind::Modified, path, 1)
    }

    pub fn deleted(self, path: &str) -> Self {
        self.with(RawKind::Deleted, path, 1)
    }

    /// A notification the OS reported `count` times.
    pub fn repeated(self, kind: RawKind, path: &str, count: u32) -> Self {
        self.with(kind, path, count)
    }

    pub fn with(mut self, kind: RawKind, path: &str, count: u32) -> Self {
        self.batch
            .push(RawNotification::new(kind, path).with_count(count));
        self
    }

    pub fn build(self) -> Vec<RawNotification> {
        self.batch
    }
}

/// A factory over a fresh fake facility and a mock filesystem containing
/// the directory `/w` and the file `/w/a.txt`.
pub struct FakeWorld {
    pub facility: FakeFacility,
    pub fs: MockFileSystem,
    pub factory: WatcherFactory,
}

impl FakeWorld {
    pub fn new() -> Self {
        let facility = FakeFacility::new();
        let fs = MockFileSystem::new();
        fs.add_dir("/w");
        fs.add_file("/w/a.txt");
        let factory = WatcherFactory::new(Arc::new(facility.clone()), Arc::new(fs.clone()));
        Self {
            facility,
            fs,
            factory,
        }
    }

    /// Queue `batch` for the live registration of `target`.
    ///
    /// Panics if nothing is registered for `target`.
    pub fn push_batch(&self, target: impl AsRef<Path>, batch: Vec<RawNotification>) {
        let key = self
            .facility
            .key_for(target.as_ref())
            .expect("no registration for target");
        self.facility.push_batch(key, batch);
    }
}

impl Default for FakeWorld {
    fn default() -> Self {
        Self::new()
    }
}
