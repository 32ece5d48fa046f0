//! The event-driven aggregation loop.
//!
//! One task multiplexes three sources with a single `select!`: the
//! termination signal, the broker's event stream and the window timer.
//! Decoding, matching and accumulation run synchronously between waits, so
//! the window state is only ever touched from here and needs no locking.
//!
//! ```text
//! Running --signal | broker error--> Terminating --close()--> Closed
//! ```

use crate::aggregation::{AggregationTable, FlushedWindow, WindowAccumulator, WindowSink};
use crate::broker::{describe, BrokerAdapter, BrokerEvent, ConsumedMessage, TopicPartition};
use crate::decoder;
use crate::engine::TerminationSignal;
use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Lifecycle of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminating,
    Closed,
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// A termination signal asked for a graceful stop
    Signal(TerminationSignal),
    /// The broker reported an error; all of them are treated as fatal
    BrokerError(String),
    /// Delegating an assignment change to the broker failed
    AssignmentFailed(String),
}

impl ExitReason {
    /// True for shutdowns that should exit the process with status 0
    pub fn is_graceful(&self) -> bool {
        matches!(self, ExitReason::Signal(_))
    }
}

/// Counters kept over the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub messages: u64,
    pub decode_failures: u64,
    pub metrics_matched: u64,
    pub assignments: u64,
    pub revocations: u64,
    pub end_of_partition: u64,
    pub windows_flushed: u64,
    pub sink_failures: u64,
}

/// What a finished run hands back.
#[derive(Debug)]
pub struct LoopReport {
    pub exit: ExitReason,
    pub stats: LoopStats,
    /// The partial window that was open at shutdown. It is not emitted.
    pub discarded: FlushedWindow,
}

/// Drives a broker adapter into a window accumulator.
pub struct AggregationLoop<B, S> {
    broker: B,
    sink: S,
    table: AggregationTable,
    window: WindowAccumulator,
    period: Duration,
    state: LoopState,
    stats: LoopStats,
}

impl<B, S> AggregationLoop<B, S>
where
    B: BrokerAdapter,
    S: WindowSink,
{
    /// Create a loop flushing every `period`.
    ///
    /// # Panics
    ///
    /// `run` panics if `period` is zero.
    pub fn new(broker: B, sink: S, table: AggregationTable, period: Duration) -> Self {
        Self {
            broker,
            sink,
            table,
            window: WindowAccumulator::new(),
            period,
            state: LoopState::Running,
            stats: LoopStats::default(),
        }
    }

    /// Run until `shutdown` resolves or the broker fails, then close the
    /// broker exactly once.
    pub async fn run<F>(mut self, shutdown: F) -> LoopReport
    where
        F: Future<Output = TerminationSignal>,
    {
        tokio::pin!(shutdown);

        // Free-running from start; the first flush is one full period away.
        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            period = ?self.period,
            specifications = self.table.len(),
            "Aggregation loop running"
        );

        let mut exit = None;
        while self.state == LoopState::Running {
            tokio::select! {
                signal = &mut shutdown => {
                    tracing::info!("Caught signal {}: terminating", signal);
                    exit = Some(ExitReason::Signal(signal));
                    self.state = LoopState::Terminating;
                }
                event = self.broker.next_event() => {
                    if let ControlFlow::Break(reason) = self.dispatch(event) {
                        exit = Some(reason);
                        self.state = LoopState::Terminating;
                    }
                }
                _ = ticker.tick() => self.flush(),
            }
        }

        let discarded = self.window.flush();
        if !discarded.is_empty() {
            tracing::warn!(
                aggregates = discarded.sums.len(),
                metrics_matched = discarded.metrics_matched,
                "Discarding partial window"
            );
        }

        if let Err(e) = self.broker.close() {
            tracing::error!(category = e.category(), "Failed to close broker: {}", e);
        }
        self.state = LoopState::Closed;

        let stats = self.stats;
        tracing::info!(
            messages = stats.messages,
            decode_failures = stats.decode_failures,
            windows_flushed = stats.windows_flushed,
            "Aggregation loop closed"
        );

        LoopReport {
            // The loop only leaves Running after recording a reason.
            exit: exit.unwrap_or_else(|| ExitReason::BrokerError("loop stopped".to_string())),
            stats,
            discarded,
        }
    }

    fn dispatch(&mut self, event: BrokerEvent) -> ControlFlow<ExitReason> {
        match event {
            BrokerEvent::PartitionsAssigned(partitions) => self.on_assigned(&partitions),
            BrokerEvent::PartitionsRevoked(partitions) => self.on_revoked(&partitions),
            BrokerEvent::Message(message) => {
                self.on_message(&message);
                ControlFlow::Continue(())
            },
            BrokerEvent::EndOfPartition(partition) => {
                self.stats.end_of_partition += 1;
                tracing::info!("Reached end of {}", partition);
                ControlFlow::Continue(())
            },
            BrokerEvent::Error(error) => {
                tracing::error!("Broker error: {}", error);
                ControlFlow::Break(ExitReason::BrokerError(error))
            },
        }
    }

    fn on_assigned(&mut self, partitions: &[TopicPartition]) -> ControlFlow<ExitReason> {
        self.stats.assignments += 1;
        tracing::info!("Assigned partitions: {}", describe(partitions));

        match self.broker.assign(partitions) {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                tracing::error!(category = e.category(), "{}", e);
                ControlFlow::Break(ExitReason::AssignmentFailed(e.to_string()))
            },
        }
    }

    fn on_revoked(&mut self, partitions: &[TopicPartition]) -> ControlFlow<ExitReason> {
        self.stats.revocations += 1;
        tracing::info!("Revoked partitions: {}", describe(partitions));

        match self.broker.unassign() {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                tracing::error!(category = e.category(), "{}", e);
                ControlFlow::Break(ExitReason::AssignmentFailed(e.to_string()))
            },
        }
    }

    fn on_message(&mut self, message: &ConsumedMessage) {
        self.stats.messages += 1;

        match decoder::decode(message) {
            Ok(envelope) => {
                let touched = self.window.accumulate(&self.table, &envelope.metric);
                if touched > 0 {
                    self.stats.metrics_matched += 1;
                }
                tracing::debug!(
                    metric = %envelope.metric.name,
                    value = envelope.metric.value,
                    aggregates = touched,
                    "Metric received"
                );
            },
            Err(e) => {
                self.stats.decode_failures += 1;
                tracing::warn!(
                    topic = %e.topic,
                    partition = e.partition,
                    offset = e.offset,
                    payload = %e.payload_lossy(),
                    "Invalid metric envelope: {}",
                    e.source
                );
            },
        }
    }

    fn flush(&mut self) {
        let window = self.window.flush();
        self.stats.windows_flushed += 1;

        if let Err(e) = self.sink.emit(&window) {
            self.stats.sink_failures += 1;
            tracing::error!(window = window.sequence, "Failed to emit window: {}", e);
        }
    }
}
