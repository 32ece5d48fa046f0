//! Kafka implementation of [`BrokerAdapter`] on top of `rdkafka`.

use super::{describe, BrokerAdapter, BrokerEvent, ConsumedMessage, TopicPartition};
use crate::core::config::BrokerConfig;
use crate::core::{AggregatorError, Result};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, ConsumerContext, Rebalance, StreamConsumer};
use rdkafka::error::{KafkaError, KafkaResult};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::topic_partition_list::TopicPartitionList;
use rdkafka::ClientContext;
use tokio::sync::mpsc;

/// Forwards rebalance notifications and client errors into the adapter's
/// event source.
struct RebalanceContext {
    events: mpsc::UnboundedSender<BrokerEvent>,
}

impl ClientContext for RebalanceContext {
    fn error(&self, error: KafkaError, reason: &str) {
        let _ = self
            .events
            .send(BrokerEvent::Error(format!("{}: {}", error, reason)));
    }
}

impl ConsumerContext for RebalanceContext {
    fn pre_rebalance<'a>(&self, rebalance: &Rebalance<'a>) {
        let event = match rebalance {
            Rebalance::Assign(tpl) => BrokerEvent::PartitionsAssigned(partitions_of(tpl)),
            Rebalance::Revoke(tpl) => BrokerEvent::PartitionsRevoked(partitions_of(tpl)),
            Rebalance::Error(e) => BrokerEvent::Error(format!("rebalance failed: {}", e)),
        };

        // The receiver only goes away while the adapter is being dropped.
        let _ = self.events.send(event);
    }
}

fn partitions_of(tpl: &TopicPartitionList) -> Vec<TopicPartition> {
    tpl.elements()
        .iter()
        .map(|elem| TopicPartition::new(elem.topic(), elem.partition()))
        .collect()
}

/// Build the client configuration for the consumer group.
pub fn client_config(config: &BrokerConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", &config.bootstrap_servers)
        .set("group.id", &config.group_id)
        .set("session.timeout.ms", config.session_timeout.as_millis().to_string())
        .set("auto.offset.reset", config.auto_offset_reset.as_str())
        .set("enable.partition.eof", "true");

    for (key, value) in &config.properties {
        client.set(key, value);
    }

    client
}

/// Kafka consumer group member driven by the control loop.
pub struct KafkaAdapter {
    consumer: StreamConsumer<RebalanceContext>,
    rebalances: mpsc::UnboundedReceiver<BrokerEvent>,
    topics: Vec<String>,
}

impl KafkaAdapter {
    /// Create the consumer. Does not contact the cluster yet.
    pub fn connect(config: &BrokerConfig) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let consumer: StreamConsumer<RebalanceContext> = client_config(config)
            .create_with_context(RebalanceContext { events: tx })?;

        tracing::info!(
            bootstrap = %config.bootstrap_servers,
            group = %config.group_id,
            "Created consumer"
        );

        Ok(Self {
            consumer,
            rebalances: rx,
            topics: config.topics.clone(),
        })
    }

    /// Join the group for the configured topics.
    pub fn subscribe(&self) -> Result<()> {
        let topics: Vec<&str> = self.topics.iter().map(String::as_str).collect();
        self.consumer
            .subscribe(&topics)
            .map_err(|e| AggregatorError::Subscription {
                topics: self.topics.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(topics = ?self.topics, "Subscribed");
        Ok(())
    }

    fn translate(topics: &[String], received: KafkaResult<BorrowedMessage<'_>>) -> BrokerEvent {
        match received {
            Ok(message) => BrokerEvent::Message(ConsumedMessage::new(
                message.topic(),
                message.partition(),
                message.offset(),
                message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            )),
            // librdkafka only reports the partition number here.
            Err(KafkaError::PartitionEOF(partition)) => {
                let topic = match topics {
                    [single] => single.clone(),
                    _ => String::from("*"),
                };
                BrokerEvent::EndOfPartition(TopicPartition::new(topic, partition))
            },
            Err(e) => BrokerEvent::Error(e.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl BrokerAdapter for KafkaAdapter {
    async fn next_event(&mut self) -> BrokerEvent {
        tokio::select! {
            biased;
            Some(event) = self.rebalances.recv() => event,
            received = self.consumer.recv() => Self::translate(&self.topics, received),
        }
    }

    fn assign(&mut self, partitions: &[TopicPartition]) -> Result<()> {
        let mut tpl = TopicPartitionList::with_capacity(partitions.len());
        for tp in partitions {
            tpl.add_partition(&tp.topic, tp.partition);
        }

        self.consumer.assign(&tpl).map_err(|e| {
            AggregatorError::assignment(format!("assign {} failed: {}", describe(partitions), e))
        })
    }

    fn unassign(&mut self) -> Result<()> {
        self.consumer
            .unassign()
            .map_err(|e| AggregatorError::assignment(format!("unassign failed: {}", e)))
    }

    fn close(self) -> Result<()> {
        tracing::info!("Closing consumer");
        self.consumer.unsubscribe();
        // Dropping the consumer leaves the group and releases the client.
        drop(self.consumer);
        Ok(())
    }
}
