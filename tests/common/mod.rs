//! Common test utilities and fixtures.

#![allow(dead_code)]

use metric_aggregator::aggregation::{FlushedWindow, WindowSink};
use metric_aggregator::broker::{BrokerAdapter, BrokerEvent, ConsumedMessage, TopicPartition};
use metric_aggregator::core::{AggregatorError, Metric, MetricEnvelope, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Calls the loop made on the broker, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerCall {
    Assign(Vec<TopicPartition>),
    Unassign,
    Close,
}

/// A broker that replays a fixed script of events and then goes quiet.
pub struct ScriptedBroker {
    events: VecDeque<BrokerEvent>,
    calls: Arc<Mutex<Vec<BrokerCall>>>,
    fail_assign: bool,
}

impl ScriptedBroker {
    pub fn new(events: Vec<BrokerEvent>) -> Self {
        Self {
            events: events.into(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_assign: false,
        }
    }

    /// A broker with nothing to deliver.
    pub fn idle() -> Self {
        Self::new(Vec::new())
    }

    pub fn failing_assign(mut self) -> Self {
        self.fail_assign = true;
        self
    }

    /// Handle for inspecting calls after the broker moved into the loop.
    pub fn calls(&self) -> Arc<Mutex<Vec<BrokerCall>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl BrokerAdapter for ScriptedBroker {
    async fn next_event(&mut self) -> BrokerEvent {
        match self.events.pop_front() {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }

    fn assign(&mut self, partitions: &[TopicPartition]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(BrokerCall::Assign(partitions.to_vec()));
        if self.fail_assign {
            return Err(AggregatorError::assignment("assignment rejected"));
        }
        Ok(())
    }

    fn unassign(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push(BrokerCall::Unassign);
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.calls.lock().unwrap().push(BrokerCall::Close);
        Ok(())
    }
}

/// Count how many times `close` was called.
pub fn close_count(calls: &Arc<Mutex<Vec<BrokerCall>>>) -> usize {
    calls
        .lock()
        .unwrap()
        .iter()
        .filter(|call| **call == BrokerCall::Close)
        .count()
}

/// A sink that keeps every window it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    windows: Arc<Mutex<Vec<FlushedWindow>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn windows(&self) -> Vec<FlushedWindow> {
        self.windows.lock().unwrap().clone()
    }
}

impl WindowSink for RecordingSink {
    fn emit(&mut self, window: &FlushedWindow) -> Result<()> {
        self.windows.lock().unwrap().push(window.clone());
        Ok(())
    }
}

/// A sink that rejects every window.
pub struct FailingSink;

impl WindowSink for FailingSink {
    fn emit(&mut self, _window: &FlushedWindow) -> Result<()> {
        Err(AggregatorError::sink("sink offline"))
    }
}

/// A message carrying one encoded metric.
pub fn metric_message(name: &str, value: f64, offset: i64) -> BrokerEvent {
    let envelope = MetricEnvelope::new(Metric::new(name, value).with_dimension("service", "0"), 0);
    let payload = serde_json::to_vec(&envelope).unwrap();
    BrokerEvent::Message(ConsumedMessage::new("metrics", 0, offset, payload))
}

/// A message whose payload is not an envelope.
pub fn garbage_message(payload: &str, offset: i64) -> BrokerEvent {
    BrokerEvent::Message(ConsumedMessage::new("metrics", 0, offset, payload.as_bytes().to_vec()))
}

/// A broker fed from a channel, for tests that need events spread over time.
pub struct ChannelBroker {
    rx: tokio::sync::mpsc::UnboundedReceiver<BrokerEvent>,
    calls: Arc<Mutex<Vec<BrokerCall>>>,
}

impl ChannelBroker {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedSender<BrokerEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let broker = Self {
            rx,
            calls: Arc::new(Mutex::new(Vec::new())),
        };
        (broker, tx)
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<BrokerCall>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl BrokerAdapter for ChannelBroker {
    async fn next_event(&mut self) -> BrokerEvent {
        match self.rx.recv().await {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }

    fn assign(&mut self, partitions: &[TopicPartition]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(BrokerCall::Assign(partitions.to_vec()));
        Ok(())
    }

    fn unassign(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push(BrokerCall::Unassign);
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.calls.lock().unwrap().push(BrokerCall::Close);
        Ok(())
    }
}
