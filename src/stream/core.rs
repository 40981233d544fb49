// src/stream/core.rs

//! Pure state machine behind a stream's producer loop.
//!
//! The core consumes [`PumpEvent`]s and answers with one [`PumpCommand`]
//! at a time. It has no channels, timers or watchers of its own; the async
//! shell in [`pump`](super::pump) performs each command and feeds the
//! outcome back in. That keeps the loop semantics testable without Tokio.
//!
//! One cycle looks like:
//!
//! ```text
//! Tick ──► Drain ──► Drained(events) ──► Deliver(e1) ──► Delivered ──► ...
//!                                          (AwaitingConsumer)
//!      ... ──► Sleep(timeout) ──► Tick
//!              (AwaitingTimer)
//! ```
//!
//! Cancellation signals are only looked at on `Tick`, i.e. at the top of a
//! cycle.

use std::collections::VecDeque;
use std::time::Duration;

use crate::event::ChangeEvent;
use crate::stream::FinishReason;

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    /// Waiting for the first `Tick`.
    Idle,
    /// A drain has been requested.
    Draining,
    /// An event has been handed to the consumer; waiting for it to be taken.
    AwaitingConsumer,
    /// Sleeping until the next cycle.
    AwaitingTimer,
    Finished(FinishReason),
}

/// Inputs from the async shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpEvent {
    /// Top of a cycle, with the current external signals.
    Tick {
        consumer_open: bool,
        watcher_open: bool,
    },
    /// Result of a drain, in arrival order.
    Drained(Vec<ChangeEvent>),
    /// The last `Deliver` completed.
    Delivered,
    /// The consumer went away while delivering.
    ConsumerClosed,
}

/// What the async shell should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpCommand {
    Drain,
    Deliver(ChangeEvent),
    Sleep(Duration),
    Finish(FinishReason),
}

#[derive(Debug)]
pub struct PumpCore {
    state: PumpState,
    timeout: Duration,
    backlog: VecDeque<ChangeEvent>,
    /// Set once the watcher was seen invalidated: deliver what the last
    /// drain produced, then finish instead of sleeping.
    final_cycle: bool,
    sent: u64,
}

impl PumpCore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: PumpState::Idle,
            timeout,
            backlog: VecDeque::new(),
            final_cycle: false,
            sent: 0,
        }
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    /// Events the channel accepted so far. With a bounded channel these
    /// may still be waiting for the consumer.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn step(&mut self, event: PumpEvent) -> PumpCommand {
        if let PumpState::Finished(reason) = self.state {
            return PumpCommand::Finish(reason);
        }

        match event {
            PumpEvent::Tick {
                consumer_open,
                watcher_open,
            } => {
                if !consumer_open {
                    return self.finish(FinishReason::ConsumerClosed);
                }
                if !watcher_open {
                    self.final_cycle = true;
                }
                self.state = PumpState::Draining;
                PumpCommand::Drain
            }
            PumpEvent::Drained(events) => {
                self.backlog.extend(events);
                self.next_delivery()
            }
            PumpEvent::Delivered => {
                self.sent += 1;
                self.next_delivery()
            }
            PumpEvent::ConsumerClosed => self.finish(FinishReason::ConsumerClosed),
        }
    }

    fn next_delivery(&mut self) -> PumpCommand {
        if let Some(event) = self.backlog.pop_front() {
            self.state = PumpState::AwaitingConsumer;
            return PumpCommand::Deliver(event);
        }
        if self.final_cycle {
            return self.finish(FinishReason::WatcherInvalidated);
        }
        self.state = PumpState::AwaitingTimer;
        PumpCommand::Sleep(self.timeout)
    }

    fn finish(&mut self, reason: FinishReason) -> PumpCommand {
        self.backlog.clear();
        self.state = PumpState::Finished(reason);
        PumpCommand::Finish(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChangeKind;
    use std::path::PathBuf;

    const TIMEOUT: Duration = Duration::from_millis(10);

    fn tick() -> PumpEvent {
        PumpEvent::Tick {
            consumer_open: true,
            watcher_open: true,
        }
    }

    fn created(name: &str) -> ChangeEvent {
        ChangeEvent::new(PathBuf::from(name), ChangeKind::Created, false)
    }

    #[test]
    fn idle_cycle_drains_then_sleeps() {
        let mut core = PumpCore::new(TIMEOUT);

        assert_eq!(core.step(tick()), PumpCommand::Drain);
        assert_eq!(core.state(), PumpState::Draining);
        assert_eq!(
            core.step(PumpEvent::Drained(vec![])),
            PumpCommand::Sleep(TIMEOUT)
        );
        assert_eq!(core.state(), PumpState::AwaitingTimer);
    }

    #[test]
    fn events_are_delivered_one_at_a_time_in_order() {
        let mut core = PumpCore::new(TIMEOUT);
        core.step(tick());

        let cmd = core.step(PumpEvent::Drained(vec![created("a"), created("b")]));
        assert_eq!(cmd, PumpCommand::Deliver(created("a")));
        assert_eq!(core.state(), PumpState::AwaitingConsumer);

        assert_eq!(
            core.step(PumpEvent::Delivered),
            PumpCommand::Deliver(created("b"))
        );
        assert_eq!(core.step(PumpEvent::Delivered), PumpCommand::Sleep(TIMEOUT));
        assert_eq!(core.sent(), 2);
    }

    #[test]
    fn closed_consumer_finishes_at_loop_top() {
        let mut core = PumpCore::new(TIMEOUT);
        let cmd = core.step(PumpEvent::Tick {
            consumer_open: false,
            watcher_open: true,
        });
        assert_eq!(cmd, PumpCommand::Finish(FinishReason::ConsumerClosed));
    }

    #[test]
    fn consumer_leaving_mid_delivery_drops_the_backlog() {
        let mut core = PumpCore::new(TIMEOUT);
        core.step(tick());
        core.step(PumpEvent::Drained(vec![created("a"), created("b")]));

        let cmd = core.step(PumpEvent::ConsumerClosed);
        assert_eq!(cmd, PumpCommand::Finish(FinishReason::ConsumerClosed));
        assert_eq!(core.sent(), 0);
        // Finished is terminal.
        assert_eq!(
            core.step(tick()),
            PumpCommand::Finish(FinishReason::ConsumerClosed)
        );
    }

    #[test]
    fn invalidated_watcher_gets_one_last_drain() {
        let mut core = PumpCore::new(TIMEOUT);
        let cmd = core.step(PumpEvent::Tick {
            consumer_open: true,
            watcher_open: false,
        });
        assert_eq!(cmd, PumpCommand::Drain);

        assert_eq!(
            core.step(PumpEvent::Drained(vec![created("last")])),
            PumpCommand::Deliver(created("last"))
        );
        assert_eq!(
            core.step(PumpEvent::Delivered),
            PumpCommand::Finish(FinishReason::WatcherInvalidated)
        );
        assert_eq!(
            core.state(),
            PumpState::Finished(FinishReason::WatcherInvalidated)
        );
    }
}
