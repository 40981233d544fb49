// src/stream/channel.rs

//! Channel between a stream's producer task and its consumer.
//!
//! Tokio's mpsc channels need at least one slot, so rendezvous delivery is
//! built on a one-slot channel plus a per-event acknowledgement: the
//! producer's send only completes once the consumer has taken the event.

use std::path::{Path, PathBuf};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::{DirwatchError, Result};
use crate::event::ChangeEvent;
use crate::stream::{ProducerReport, StreamSummary};
use crate::types::ChannelCapacity;

#[derive(Debug)]
pub(crate) struct Delivery {
    event: ChangeEvent,
    ack: Option<oneshot::Sender<()>>,
}

impl Delivery {
    fn take(self) -> ChangeEvent {
        if let Some(ack) = self.ack {
            // The producer may have given up already; nothing to do then.
            let _ = ack.send(());
        }
        self.event
    }
}

/// The consumer is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SinkClosed;

/// Producer half.
#[derive(Debug)]
pub(crate) struct EventSink {
    tx: mpsc::Sender<Delivery>,
    rendezvous: bool,
}

impl EventSink {
    /// Hand `event` to the consumer, suspending while it is not keeping up.
    pub(crate) async fn send(&self, event: ChangeEvent) -> std::result::Result<(), SinkClosed> {
        if !self.rendezvous {
            return self
                .tx
                .send(Delivery { event, ack: None })
                .await
                .map_err(|_| SinkClosed);
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Delivery {
                event,
                ack: Some(ack_tx),
            })
            .await
            .map_err(|_| SinkClosed)?;
        ack_rx.await.map_err(|_| SinkClosed)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub(crate) fn channel(capacity: ChannelCapacity) -> (EventSink, mpsc::Receiver<Delivery>) {
    let (tx, rx) = mpsc::channel(capacity.slots());
    let sink = EventSink {
        tx,
        rendezvous: capacity == ChannelCapacity::Rendezvous,
    };
    (sink, rx)
}

/// Consumer half of [`watch_stream`](crate::watch_stream).
///
/// Events arrive in the order the watcher produced them. `recv` returns
/// `None` once the producer has stopped (consumer closed the stream, or
/// the watch target went away) and every forwarded event was taken.
///
/// Dropping the stream stops the producer at its next cycle and releases
/// the watcher.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<Delivery>,
    producer: JoinHandle<Result<ProducerReport>>,
    target: PathBuf,
    received: u64,
}

impl EventStream {
    pub(crate) fn new(
        rx: mpsc::Receiver<Delivery>,
        producer: JoinHandle<Result<ProducerReport>>,
        target: PathBuf,
    ) -> Self {
        Self {
            rx,
            producer,
            target,
            received: 0,
        }
    }

    /// The directory being watched.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        let delivery = self.rx.recv().await?;
        Some(self.accept(delivery))
    }

    /// Take an event if one is ready, without waiting.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        let delivery = self.rx.try_recv().ok()?;
        Some(self.accept(delivery))
    }

    fn accept(&mut self, delivery: Delivery) -> ChangeEvent {
        self.received += 1;
        delivery.take()
    }

    /// Events taken through [`recv`](Self::recv) and
    /// [`try_recv`](Self::try_recv) so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// True once the producer task has stopped.
    pub fn is_finished(&self) -> bool {
        self.producer.is_finished()
    }

    /// Stop accepting events. The producer notices at its next send or
    /// cycle and closes its watcher. Events still in the channel are
    /// discarded.
    pub fn close(&mut self) {
        self.rx.close();
        let mut dropped = 0usize;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(root = ?self.target, dropped, "discarded undelivered stream events");
        }
    }

    /// Close the stream and wait for the producer to wind down.
    ///
    /// Returns why the producer stopped, or the error that aborted it.
    pub async fn finish(mut self) -> Result<StreamSummary> {
        self.close();
        let report = match (&mut self.producer).await {
            Ok(result) => result?,
            Err(join_err) => {
                return Err(DirwatchError::Other(anyhow::anyhow!(
                    "stream producer task failed: {join_err}"
                )));
            }
        };
        Ok(StreamSummary {
            reason: report.reason,
            forwarded: self.received,
            sent: report.sent,
        })
    }
}
