mod common;
use crate::common::builders::{BatchBuilder, FakeWorld};

use std::path::PathBuf;

use dirwatch::facility::RawKind;
use dirwatch::ChangeKind;
use proptest::prelude::*;

// (kind, file index, repeat count) for one raw notification.
fn notification_strategy() -> impl Strategy<Value = (u8, u8, u32)> {
    (0..3u8, 0..5u8, 1..4u32)
}

fn batches_strategy() -> impl Strategy<Value = Vec<Vec<(u8, u8, u32)>>> {
    proptest::collection::vec(
        proptest::collection::vec(notification_strategy(), 0..6),
        0..6,
    )
}

fn kinds(k: u8) -> (RawKind, ChangeKind) {
    match k {
        0 => (RawKind::Created, ChangeKind::Created),
        1 => (RawKind::Modified, ChangeKind::Modified),
        _ => (RawKind::Deleted, ChangeKind::Deleted),
    }
}

proptest! {
    #[test]
    fn drain_preserves_arrival_order(batches in batches_strategy()) {
        let world = FakeWorld::new();
        let mut watcher = world.factory.watch("/w", None, None).unwrap();

        let mut expected = Vec::new();
        for batch in &batches {
            let mut builder = BatchBuilder::new();
            for &(k, file, count) in batch {
                let (raw, kind) = kinds(k);
                let name = format!("f{file}");
                builder = builder.repeated(raw, &name, count);
                expected.push((PathBuf::from(name), kind, count > 1));
            }
            world.push_batch("/w", builder.build());
        }

        let got: Vec<_> = watcher
            .drain()
            .unwrap()
            .into_iter()
            .map(|e| (e.path().to_path_buf(), e.kind(), e.repeated()))
            .collect();

        prop_assert_eq!(got, expected);
        prop_assert!(watcher.drain().unwrap().is_empty());
    }

    #[test]
    fn polling_one_at_a_time_matches_drain(batches in batches_strategy()) {
        let world = FakeWorld::new();
        let mut by_poll = world.factory.watch("/w", None, None).unwrap();
        let mut collected = Vec::new();

        for batch in &batches {
            let mut builder = BatchBuilder::new();
            for &(k, file, count) in batch {
                builder = builder.repeated(kinds(k).0, &format!("f{file}"), count);
            }
            world.push_batch("/w", builder.build());
        }
        let total: usize = batches.iter().map(Vec::len).sum();

        while let Some(event) = by_poll.poll().unwrap() {
            collected.push(event);
        }

        prop_assert_eq!(collected.len(), total);
        prop_assert_eq!(
            collected.iter().filter(|e| e.repeated()).count(),
            batches.iter().flatten().filter(|(_, _, count)| *count > 1).count()
        );
    }
}
