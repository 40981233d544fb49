// src/event.rs

//! The event value handed to consumers.

use std::fmt;
use std::path::{Path, PathBuf};

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Deleted,
    Modified,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Created => "created",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Modified => "modified",
        };
        f.write_str(s)
    }
}

/// One observed filesystem change.
///
/// `path` is relative to the watched root. `repeated` is set when the
/// backend folded several identical notifications into this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    path: PathBuf,
    kind: ChangeKind,
    repeated: bool,
}

impl ChangeEvent {
    pub(crate) fn new(path: PathBuf, kind: ChangeKind, repeated: bool) -> Self {
        Self {
            path,
            kind,
            repeated,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn repeated(&self) -> bool {
        self.repeated
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path.display())?;
        if self.repeated {
            f.write_str(" (repeated)")?;
        }
        Ok(())
    }
}
