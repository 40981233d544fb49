mod common;
use crate::common::builders::{BatchBuilder, FakeWorld};
use crate::common::init_tracing;

use std::error::Error;
use std::path::Path;

use dirwatch::facility::RawKind;
use dirwatch::{ChangeKind, DirwatchError, WatchConfig};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn closed_watcher_rejects_every_operation() -> TestResult {
    init_tracing();
    let world = FakeWorld::new();
    let mut watcher = world.factory.watch("/w", None, None)?;
    world.push_batch("/w", BatchBuilder::new().created("a.txt").build());

    watcher.close();

    assert!(!watcher.is_open());
    assert!(matches!(watcher.poll(), Err(DirwatchError::InvalidState(_))));
    assert!(matches!(watcher.drain(), Err(DirwatchError::InvalidState(_))));
    assert!(matches!(watcher.flush(), Err(DirwatchError::InvalidState(_))));

    // Closing again is a no-op.
    watcher.close();
    assert_eq!(world.facility.cancelled().len(), 1);
    Ok(())
}

#[test]
fn drain_does_not_deliver_twice() -> TestResult {
    init_tracing();
    let world = FakeWorld::new();
    let mut watcher = world.factory.watch("/w", None, None)?;
    world.push_batch(
        "/w",
        BatchBuilder::new().created("a.txt").modified("a.txt").build(),
    );

    let first = watcher.drain()?;
    let second = watcher.drain()?;

    assert_eq!(first.len(), 2);
    assert!(second.is_empty());
    Ok(())
}

#[test]
fn drain_preserves_batch_order_across_batches() -> TestResult {
    init_tracing();
    let world = FakeWorld::new();
    let mut watcher = world.factory.watch("/w", None, None)?;
    world.push_batch(
        "/w",
        BatchBuilder::new().created("1").deleted("2").modified("3").build(),
    );
    world.push_batch("/w", BatchBuilder::new().created("4").build());

    let events = watcher.drain()?;
    let got: Vec<(String, ChangeKind)> = events
        .iter()
        .map(|e| (e.path().display().to_string(), e.kind()))
        .collect();

    assert_eq!(
        got,
        vec![
            ("1".to_string(), ChangeKind::Created),
            ("2".to_string(), ChangeKind::Deleted),
            ("3".to_string(), ChangeKind::Modified),
            ("4".to_string(), ChangeKind::Created),
        ]
    );
    Ok(())
}

#[test]
fn repeat_count_becomes_a_single_repeated_event() -> TestResult {
    init_tracing();
    let world = FakeWorld::new();
    let mut watcher = world.factory.watch("/w", None, None)?;
    world.push_batch(
        "/w",
        BatchBuilder::new()
            .repeated(RawKind::Modified, "a.txt", 5)
            .build(),
    );

    let events = watcher.drain()?;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), ChangeKind::Modified);
    assert_eq!(events[0].path(), Path::new("a.txt"));
    assert!(events[0].repeated());
    Ok(())
}

#[test]
fn flush_discards_buffered_and_pending_events() -> TestResult {
    init_tracing();
    let world = FakeWorld::new();
    let mut watcher = world.factory.watch("/w", None, None)?;
    world.push_batch(
        "/w",
        BatchBuilder::new().created("a").created("b").created("c").build(),
    );

    // "a" is returned, "b" and "c" sit in the buffer.
    assert!(watcher.poll()?.is_some());
    world.push_batch("/w", BatchBuilder::new().deleted("d").build());

    watcher.flush()?;

    assert_eq!(watcher.poll()?, None);
    assert!(watcher.is_open());
    Ok(())
}

#[test]
fn invalidated_watcher_is_not_open_but_still_drains() -> TestResult {
    init_tracing();
    let world = FakeWorld::new();
    let mut watcher = world.factory.watch("/w", None, None)?;
    world.push_batch("/w", BatchBuilder::new().deleted("a.txt").build());

    world.facility.invalidate(watcher.key());

    assert!(!watcher.is_open());
    assert!(!watcher.is_closed());
    assert_eq!(watcher.drain()?.len(), 1);

    watcher.close();
    assert!(matches!(watcher.poll(), Err(DirwatchError::InvalidState(_))));
    Ok(())
}

#[test]
fn subtree_on_a_file_is_a_config_error() {
    init_tracing();
    let world = FakeWorld::new();

    let result = world.factory.watch("/w/a.txt", Some(true), None);

    match result {
        Err(DirwatchError::ConfigError(msg)) => assert!(msg.contains("directory")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
    assert_eq!(world.facility.registration_count(), 0);
}

#[test]
fn empty_kind_set_is_a_config_error() {
    init_tracing();
    let world = FakeWorld::new();

    let result = world.factory.watch("/w", None, Some(WatchConfig::none()));

    assert!(matches!(result, Err(DirwatchError::ConfigError(_))));
    assert_eq!(world.facility.registration_count(), 0);
}

#[test]
fn single_file_can_be_watched_without_subtree() -> TestResult {
    init_tracing();
    let world = FakeWorld::new();

    let watcher = world.factory.watch("/w/a.txt", None, None)?;

    assert!(!watcher.is_recursive());
    assert!(watcher.is_open());
    Ok(())
}

#[test]
fn iteration_view_stops_when_idle() -> TestResult {
    init_tracing();
    let world = FakeWorld::new();
    let mut watcher = world.factory.watch("/w", None, None)?;
    world.push_batch("/w", BatchBuilder::new().created("a").created("b").build());

    let mut seen = 0;
    for event in &mut watcher {
        event?;
        seen += 1;
    }
    assert_eq!(seen, 2);

    // Nothing new arrived: a second pass ends immediately.
    assert_eq!(watcher.events().count(), 0);
    Ok(())
}
