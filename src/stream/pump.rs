// src/stream/pump.rs

use tracing::{debug, error, info, trace};

use crate::errors::Result;
use crate::stream::ProducerReport;
use crate::stream::channel::EventSink;
use crate::stream::core::{PumpCommand, PumpCore, PumpEvent};
use crate::watch::Watcher;

/// Async IO shell around [`PumpCore`].
///
/// Owns the watcher and the producer half of the channel, performs the
/// commands the core asks for, and feeds the outcomes back in. The only
/// suspension points are the timer and a send the consumer isn't ready
/// for.
#[derive(Debug)]
pub(crate) struct Pump {
    core: PumpCore,
    watcher: Watcher,
    sink: EventSink,
}

impl Pump {
    pub(crate) fn new(core: PumpCore, watcher: Watcher, sink: EventSink) -> Self {
        Self {
            core,
            watcher,
            sink,
        }
    }

    fn signals(&self) -> PumpEvent {
        PumpEvent::Tick {
            consumer_open: !self.sink.is_closed(),
            watcher_open: self.watcher.is_open(),
        }
    }

    /// Run until the consumer leaves, the watcher is invalidated, or a
    /// drain fails. The watcher is closed on every one of those paths.
    pub(crate) async fn run(mut self) -> Result<ProducerReport> {
        let key = self.watcher.key();
        info!(%key, root = ?self.watcher.target(), "stream producer started");

        let mut event = self.signals();
        let outcome = loop {
            trace!(%key, state = ?self.core.state(), ?event, "pump step");

            match self.core.step(event) {
                PumpCommand::Drain => match self.watcher.drain() {
                    Ok(events) => {
                        if !events.is_empty() {
                            debug!(%key, count = events.len(), "drained events");
                        }
                        event = PumpEvent::Drained(events);
                    }
                    Err(err) => break Err(err),
                },
                PumpCommand::Deliver(change) => {
                    event = match self.sink.send(change).await {
                        Ok(()) => PumpEvent::Delivered,
                        Err(_) => PumpEvent::ConsumerClosed,
                    };
                }
                PumpCommand::Sleep(timeout) => {
                    tokio::time::sleep(timeout).await;
                    event = self.signals();
                }
                PumpCommand::Finish(reason) => break Ok(reason),
            }
        };

        self.watcher.close();

        match outcome {
            Ok(reason) => {
                let report = ProducerReport {
                    reason,
                    sent: self.core.sent(),
                };
                info!(
                    %key,
                    reason = ?report.reason,
                    sent = report.sent,
                    "stream producer finished"
                );
                Ok(report)
            }
            Err(err) => {
                error!(%key, error = %err, "stream producer aborted");
                Err(err)
            }
        }
    }
}
