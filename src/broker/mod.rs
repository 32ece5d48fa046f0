//! Broker adapter abstraction.
//!
//! The control loop only sees [`BrokerEvent`] values and the small
//! [`BrokerAdapter`] API; everything about the concrete client (network
//! I/O, the rebalance protocol, buffering) stays behind this seam.

pub mod kafka;

use crate::core::Result;
use std::fmt;

pub use kafka::KafkaAdapter;

/// A single partition of a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new<S: Into<String>>(topic: S, partition: i32) -> Self {
        TopicPartition {
            topic: topic.into(),
            partition,
        }
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.topic, self.partition)
    }
}

/// A message delivered by the broker, detached from the client's buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

impl ConsumedMessage {
    pub fn new<S: Into<String>>(topic: S, partition: i32, offset: i64, payload: Vec<u8>) -> Self {
        ConsumedMessage {
            topic: topic.into(),
            partition,
            offset,
            payload,
        }
    }
}

/// Everything the broker can surface to the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    /// The group handed these partitions to this consumer
    PartitionsAssigned(Vec<TopicPartition>),
    /// The group took these partitions away
    PartitionsRevoked(Vec<TopicPartition>),
    /// A message arrived
    Message(ConsumedMessage),
    /// The consumer caught up with the end of a partition
    EndOfPartition(TopicPartition),
    /// The client reported an error
    Error(String),
}

/// Operations the control loop delegates to the broker client.
#[async_trait::async_trait]
pub trait BrokerAdapter: Send {
    /// Wait for the next event. This is the loop's only suspension point on
    /// the broker side.
    async fn next_event(&mut self) -> BrokerEvent;

    /// Take ownership of the given partitions.
    fn assign(&mut self, partitions: &[TopicPartition]) -> Result<()>;

    /// Drop the current assignment.
    fn unassign(&mut self) -> Result<()>;

    /// Close the client. Consumes the adapter so it can only happen once.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Renders a partition list for log lines.
pub fn describe(partitions: &[TopicPartition]) -> String {
    partitions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
