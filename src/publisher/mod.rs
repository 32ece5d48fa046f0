//! Synthetic metric producer.
//!
//! Emits a burst of envelopes every interval, one per combination of
//! `service` and `hostname` dimension values, so the aggregator has a steady
//! and predictable input: every window should sum to
//! `services * hosts * value * bursts`.

use crate::core::{Metric, MetricEnvelope, Result};
use chrono::{DateTime, Utc};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Shape of one burst.
#[derive(Debug, Clone, PartialEq)]
pub struct BurstSettings {
    pub metric_name: String,
    pub services: usize,
    pub hosts: usize,
    pub value: f64,
}

impl Default for BurstSettings {
    fn default() -> Self {
        Self {
            metric_name: "metric2".to_string(),
            services: 3,
            hosts: 2,
            value: 1.0,
        }
    }
}

/// Build the envelopes for one burst stamped with `now`.
pub fn burst(settings: &BurstSettings, now: DateTime<Utc>) -> Vec<MetricEnvelope> {
    let millis = now.timestamp_millis();
    let mut envelopes = Vec::with_capacity(settings.services * settings.hosts);

    for service in 0..settings.services {
        for host in 0..settings.hosts {
            let metric = Metric::new(settings.metric_name.as_str(), settings.value)
                .with_dimension("service", service.to_string())
                .with_dimension("hostname", host.to_string())
                .with_timestamp(millis as f64);
            envelopes.push(MetricEnvelope::new(metric, millis));
        }
    }

    envelopes
}

/// Publisher settings.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub bootstrap_servers: String,
    pub topic: String,
    pub interval: Duration,
    pub burst: BurstSettings,
}

/// Delivery counters for a publisher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishStats {
    pub bursts: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// Publish bursts until `shutdown` resolves, then flush the producer.
pub async fn run_publisher<F>(config: &PublisherConfig, shutdown: F) -> Result<PublishStats>
where
    F: Future,
{
    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", &config.bootstrap_servers)
        .create()?;

    tracing::info!(
        bootstrap = %config.bootstrap_servers,
        topic = %config.topic,
        interval = ?config.interval,
        "Created producer"
    );

    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stats = PublishStats::default();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested, stopping publisher");
                break;
            }
            _ = ticker.tick() => {
                publish_burst(&producer, config, &mut stats).await?;
            }
        }
    }

    producer.flush(Duration::from_secs(10))?;

    tracing::info!(
        bursts = stats.bursts,
        delivered = stats.delivered,
        failed = stats.failed,
        "Publisher stopped"
    );
    Ok(stats)
}

async fn publish_burst(
    producer: &FutureProducer,
    config: &PublisherConfig,
    stats: &mut PublishStats,
) -> Result<()> {
    for envelope in burst(&config.burst, Utc::now()) {
        let payload = serde_json::to_string(&envelope)?;
        let record: FutureRecord<'_, (), str> =
            FutureRecord::to(&config.topic).payload(payload.as_str());

        match producer.send(record, Duration::from_secs(0)).await {
            Ok((partition, offset)) => {
                stats.delivered += 1;
                tracing::debug!(
                    "Delivered message to topic {} [{}] at offset {}",
                    config.topic,
                    partition,
                    offset
                );
            },
            Err((e, _)) => {
                stats.failed += 1;
                tracing::warn!("Delivery failed: {}", e);
            },
        }
    }

    stats.bursts += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_default_burst_shape() {
        let now = Utc.timestamp_millis_opt(1_500_000_000_000).unwrap();
        let envelopes = burst(&BurstSettings::default(), now);

        assert_eq!(envelopes.len(), 6);
        assert!(envelopes.iter().all(|e| e.metric.name == "metric2"));
        assert!(envelopes.iter().all(|e| e.metric.value == 1.0));
        assert!(envelopes.iter().all(|e| e.creation_time == 1_500_000_000_000));
        assert!(envelopes.iter().all(|e| e.metric.timestamp == 1_500_000_000_000.0));
    }

    #[test]
    fn test_burst_rotates_dimensions() {
        let envelopes = burst(&BurstSettings::default(), Utc::now());

        let combos: HashSet<(String, String)> = envelopes
            .iter()
            .map(|e| {
                (
                    e.metric.dimensions["service"].clone(),
                    e.metric.dimensions["hostname"].clone(),
                )
            })
            .collect();
        assert_eq!(combos.len(), 6);
        assert!(combos.contains(&("2".to_string(), "1".to_string())));
    }

    #[test]
    fn test_burst_round_trips_through_decoder() {
        use crate::broker::ConsumedMessage;

        let settings = BurstSettings {
            metric_name: "metric1".to_string(),
            services: 1,
            hosts: 1,
            value: 2.5,
        };
        let envelope = burst(&settings, Utc::now()).remove(0);
        let payload = serde_json::to_vec(&envelope).unwrap();

        let decoded = crate::decoder::decode(&ConsumedMessage::new("metrics", 0, 0, payload)).unwrap();
        assert_eq!(decoded, envelope);
    }
}
