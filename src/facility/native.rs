// src/facility/native.rs

//! Production watch facility built on `notify`.
//!
//! One `RecommendedWatcher` (inotify, FSEvents/kqueue, ReadDirectoryChanges)
//! is shared by every registration in the process. Its callback runs on the
//! backend's thread and routes each event into the pending queue of every
//! registration whose target covers the event path. Watchers then drain
//! those queues with non-blocking [`WatchFacility::poll`] calls.
//!
//! Backend watches never overlap: a target nested under another watched
//! directory is served by that directory's watch, so each OS change is
//! seen once no matter how many registrations cover it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, trace, warn};

use crate::errors::Result;
use crate::facility::{RawKind, RawNotification, RegistrationKey, WatchFacility, push_coalesced};

static SHARED: OnceLock<Arc<NotifyFacility>> = OnceLock::new();

/// State for one registration.
#[derive(Debug)]
struct Registration {
    /// Canonical target path.
    root: PathBuf,
    root_is_dir: bool,
    recursive: bool,
    kinds: Vec<RawKind>,
    pending: Vec<RawNotification>,
    valid: bool,
}

impl Registration {
    /// Relative path for `path` if this registration covers it.
    fn relative(&self, path: &Path) -> Option<PathBuf> {
        if !self.root_is_dir {
            return (path == self.root.as_path())
                .then(|| path.file_name().map(PathBuf::from))
                .flatten();
        }
        let rel = path.strip_prefix(&self.root).ok()?;
        if rel.as_os_str().is_empty() {
            return None;
        }
        if !self.recursive && rel.components().count() > 1 {
            return None;
        }
        Some(rel.to_path_buf())
    }

    fn wants(&self, kind: &RawKind) -> bool {
        self.kinds.contains(kind)
    }
}

/// Registrations of one canonical root, as the backend sees them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RootUse {
    is_dir: bool,
    recursive: usize,
    flat: usize,
}

impl RootUse {
    fn is_unused(&self) -> bool {
        self.recursive == 0 && self.flat == 0
    }
}

#[derive(Debug, Default)]
struct Routes {
    registrations: HashMap<RegistrationKey, Registration>,
}

/// The backend watcher plus the watches it currently holds.
///
/// Never locked while `Routes` is held: the backend may wait on its event
/// thread, which takes the `Routes` lock in the callback.
struct Backend {
    watcher: RecommendedWatcher,
    roots: HashMap<PathBuf, RootUse>,
    active: HashMap<PathBuf, RecursiveMode>,
}

impl Backend {
    fn retain(&mut self, root: &Path, is_dir: bool, recursive: bool) -> Result<()> {
        let entry = self.roots.entry(root.to_path_buf()).or_insert(RootUse {
            is_dir,
            ..RootUse::default()
        });
        if recursive {
            entry.recursive += 1;
        } else {
            entry.flat += 1;
        }

        if let Err(err) = self.sync(Some(root)) {
            self.forget(root, recursive);
            if let Err(rollback) = self.sync(None) {
                warn!(?root, error = %rollback, "failed to restore backend watches");
            }
            return Err(err);
        }
        Ok(())
    }

    fn release(&mut self, root: &Path, recursive: bool) {
        self.forget(root, recursive);
        if let Err(err) = self.sync(None) {
            warn!(?root, error = %err, "failed to update backend watches");
        }
    }

    fn forget(&mut self, root: &Path, recursive: bool) {
        let Some(entry) = self.roots.get_mut(root) else {
            return;
        };
        let count = if recursive {
            &mut entry.recursive
        } else {
            &mut entry.flat
        };
        *count = count.saturating_sub(1);
        if entry.is_unused() {
            self.roots.remove(root);
        }
    }

    /// Bring the backend's watches in line with [`plan_watches`].
    ///
    /// Only a failure to watch `required` is an error; other paths that
    /// can't be watched (typically removed targets) are logged and skipped.
    fn sync(&mut self, required: Option<&Path>) -> Result<()> {
        let plan = plan_watches(&self.roots);

        // Stale watches go first so two live watches never overlap.
        let stale: Vec<PathBuf> = self
            .active
            .iter()
            .filter(|(path, mode)| plan.get(*path) != Some(*mode))
            .map(|(path, _)| path.clone())
            .collect();
        for path in stale {
            self.active.remove(&path);
            // The backend drops its own watch when the target disappears,
            // so a failure here is expected after invalidation.
            if let Err(err) = self.watcher.unwatch(&path) {
                debug!(?path, error = %err, "backend unwatch failed");
            }
        }

        for (path, mode) in plan {
            if self.active.contains_key(&path) {
                continue;
            }
            match self.watcher.watch(&path, mode) {
                Ok(()) => {
                    debug!(?path, ?mode, "backend watch established");
                    self.active.insert(path, mode);
                }
                Err(err) if required == Some(path.as_path()) => return Err(err.into()),
                Err(err) => warn!(?path, error = %err, "could not watch path"),
            }
        }
        Ok(())
    }
}

/// Backend watches needed for `roots`, such that every path is covered by
/// exactly one of them.
///
/// A root nested under a directory root gets no watch of its own; instead
/// the outermost directory root is watched recursively whenever anything
/// below it is more than a plain file among its direct children.
fn plan_watches(roots: &HashMap<PathBuf, RootUse>) -> HashMap<PathBuf, RecursiveMode> {
    let mut plan = HashMap::new();
    for (path, root) in roots {
        let nested = roots
            .iter()
            .any(|(outer, o)| o.is_dir && outer != path && path.starts_with(outer));
        if nested {
            continue;
        }

        let needs_subtree = roots.iter().any(|(inner, i)| {
            inner != path
                && inner.starts_with(path)
                && (i.is_dir || inner.parent() != Some(path.as_path()))
        });
        let mode = if root.recursive > 0 || needs_subtree {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        plan.insert(path.clone(), mode);
    }
    plan
}

/// Watch facility backed by a single `notify::RecommendedWatcher`.
pub struct NotifyFacility {
    backend: Mutex<Backend>,
    routes: Arc<Mutex<Routes>>,
}

impl std::fmt::Debug for NotifyFacility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyFacility")
            .field("registrations", &self.registration_count())
            .finish_non_exhaustive()
    }
}

impl NotifyFacility {
    /// Create a standalone facility with its own backend watcher.
    ///
    /// Most callers want [`NotifyFacility::shared`] instead.
    pub fn new() -> Result<Self> {
        let routes = Arc::new(Mutex::new(Routes::default()));

        let watcher = RecommendedWatcher::new(
            {
                let routes = Arc::clone(&routes);
                move |res: notify::Result<Event>| match res {
                    Ok(event) => route_event(&routes, event),
                    Err(err) => warn!(error = %err, paths = ?err.paths, "file watch backend error"),
                }
            },
            Config::default(),
        )?;

        debug!("native watch facility created");

        Ok(Self {
            backend: Mutex::new(Backend {
                watcher,
                roots: HashMap::new(),
                active: HashMap::new(),
            }),
            routes,
        })
    }

    /// The process-wide facility, created on first use and kept for the
    /// lifetime of the process.
    pub fn shared() -> Result<Arc<NotifyFacility>> {
        if let Some(facility) = SHARED.get() {
            return Ok(Arc::clone(facility));
        }
        let facility = Arc::new(NotifyFacility::new()?);
        Ok(Arc::clone(SHARED.get_or_init(|| facility)))
    }

    /// Number of live registrations.
    pub fn registration_count(&self) -> usize {
        lock(&self.routes).registrations.len()
    }
}

impl WatchFacility for NotifyFacility {
    fn register(
        &self,
        target: &Path,
        recursive: bool,
        kinds: &[RawKind],
    ) -> Result<RegistrationKey> {
        let root = target.canonicalize()?;
        let root_is_dir = root.is_dir();

        let mut backend = lock(&self.backend);
        backend.retain(&root, root_is_dir, recursive)?;

        let key = RegistrationKey::next();
        info!(%key, ?root, recursive, ?kinds, "registered watch");

        lock(&self.routes).registrations.insert(
            key,
            Registration {
                root,
                root_is_dir,
                recursive,
                kinds: kinds.to_vec(),
                pending: Vec::new(),
                valid: true,
            },
        );
        Ok(key)
    }

    fn poll(&self, key: RegistrationKey) -> Vec<RawNotification> {
        let mut routes = lock(&self.routes);
        match routes.registrations.get_mut(&key) {
            Some(reg) => std::mem::take(&mut reg.pending),
            None => Vec::new(),
        }
    }

    fn is_valid(&self, key: RegistrationKey) -> bool {
        let routes = lock(&self.routes);
        match routes.registrations.get(&key) {
            Some(reg) => reg.valid && reg.root.exists(),
            None => false,
        }
    }

    fn cancel(&self, key: RegistrationKey) {
        let removed = lock(&self.routes).registrations.remove(&key);
        let Some(reg) = removed else {
            return;
        };
        lock(&self.backend).release(&reg.root, reg.recursive);
        info!(%key, root = ?reg.root, "cancelled watch");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Called on the backend thread for every event.
fn route_event(routes: &Mutex<Routes>, event: Event) {
    trace!(?event, "received notify event");

    if event.need_rescan() {
        warn!(paths = ?event.paths, "watch backend dropped events; some changes may be missing");
    }

    let changes = classify(&event);
    if changes.is_empty() {
        return;
    }

    let mut routes = lock(routes);
    for reg in routes.registrations.values_mut() {
        if !reg.valid {
            continue;
        }

        for (kind, path) in &changes {
            match path {
                Some(path) if *path == reg.root && *kind == RawKind::Deleted => {
                    // The target itself went away: queue a final event for a
                    // single-file target, then invalidate.
                    if !reg.root_is_dir && reg.wants(kind) {
                        if let Some(rel) = reg.relative(path) {
                            push_coalesced(&mut reg.pending, RawNotification::new(kind.clone(), rel));
                        }
                    }
                    reg.valid = false;
                    info!(root = ?reg.root, "watch target removed; registration invalidated");
                    break;
                }
                Some(path) => {
                    if !reg.wants(kind) {
                        continue;
                    }
                    if let Some(rel) = reg.relative(path) {
                        push_coalesced(&mut reg.pending, RawNotification::new(kind.clone(), rel));
                    }
                }
                None => {
                    if reg.wants(kind) {
                        error!(?event, "watch backend delivered an event without a path");
                        push_coalesced(
                            &mut reg.pending,
                            RawNotification {
                                kind: kind.clone(),
                                context: None,
                                count: 1,
                            },
                        );
                    }
                }
            }
        }
    }
}

/// Map one backend event onto `(kind, path)` pairs. Access and
/// unclassified events produce nothing.
fn classify(event: &Event) -> Vec<(RawKind, Option<PathBuf>)> {
    let kind = match event.kind {
        EventKind::Create(_) => RawKind::Created,
        EventKind::Remove(_) => RawKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => RawKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => RawKind::Created,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                out.push((RawKind::Deleted, Some(from.clone())));
            }
            if let Some(to) = event.paths.get(1) {
                out.push((RawKind::Created, Some(to.clone())));
            }
            return out;
        }
        EventKind::Modify(ModifyKind::Name(_)) => {
            // Backends that can't pair renames: decide by what's on disk now.
            return event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() {
                        RawKind::Created
                    } else {
                        RawKind::Deleted
                    };
                    (kind, Some(p.clone()))
                })
                .collect();
        }
        EventKind::Modify(_) => RawKind::Modified,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
    };

    if event.paths.is_empty() {
        return vec![(kind, None)];
    }
    event
        .paths
        .iter()
        .map(|p| (kind.clone(), Some(p.clone())))
        .collect()
}
