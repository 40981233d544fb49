// src/watch/translate.rs

//! Raw facility notification → [`ChangeEvent`].

use tracing::error;

use crate::errors::{DirwatchError, Result};
use crate::event::{ChangeEvent, ChangeKind};
use crate::facility::{RawKind, RawNotification};

/// Translate one raw notification.
///
/// Fails with [`DirwatchError::InvariantViolation`] for kinds outside
/// created/deleted/modified and for notifications without a path.
pub fn translate(raw: RawNotification) -> Result<ChangeEvent> {
    let kind = match raw.kind {
        RawKind::Created => ChangeKind::Created,
        RawKind::Deleted => ChangeKind::Deleted,
        RawKind::Modified => ChangeKind::Modified,
        RawKind::Other(other) => {
            error!(kind = %other, "watch facility reported an unexpected event kind");
            return Err(DirwatchError::InvariantViolation(format!(
                "unexpected event kind: {other}"
            )));
        }
    };

    let Some(path) = raw.context else {
        error!(?kind, "watch facility reported an event without a path");
        return Err(DirwatchError::InvariantViolation(format!(
            "{kind} event has no path context"
        )));
    };

    Ok(ChangeEvent::new(path, kind, raw.count > 1))
}
