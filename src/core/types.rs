//! Wire types for metric envelopes and aggregation rules.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Reads an absent or `null` map as an empty one.
fn null_as_empty<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A named numeric observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric name, the only field aggregation rules match on
    pub name: String,
    /// Free-form dimensions (service, hostname, ...)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dimensions: HashMap<String, String>,
    /// Observation time in epoch milliseconds
    #[serde(default)]
    pub timestamp: f64,
    /// Observed value
    pub value: f64,
    /// Metadata attached to the value
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value_meta: HashMap<String, String>,
}

impl Metric {
    /// Creates a metric with no dimensions or metadata
    pub fn new<S: Into<String>>(name: S, value: f64) -> Self {
        Metric {
            name: name.into(),
            dimensions: HashMap::new(),
            timestamp: 0.0,
            value,
            value_meta: HashMap::new(),
        }
    }

    /// Adds a dimension
    pub fn with_dimension<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.dimensions.insert(key.into(), value.into());
        self
    }

    /// Sets the observation timestamp
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// The serialized unit carried by each broker message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEnvelope {
    /// The carried metric
    pub metric: Metric,
    /// Producer metadata
    #[serde(default, deserialize_with = "null_as_empty")]
    pub meta: HashMap<String, String>,
    /// Envelope creation time in epoch milliseconds
    #[serde(default)]
    pub creation_time: i64,
}

impl MetricEnvelope {
    /// Wraps a metric with empty metadata
    pub fn new(metric: Metric, creation_time: i64) -> Self {
        MetricEnvelope {
            metric,
            meta: HashMap::new(),
            creation_time,
        }
    }
}

/// Rule mapping an original metric name onto an aggregated output name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregationSpecification {
    /// Rule name, unique within a table
    pub name: String,
    /// Incoming metric name to match
    pub original_metric_name: String,
    /// Aggregate the matched values are summed into
    pub aggregated_metric_name: String,
}

impl AggregationSpecification {
    /// Creates a rule
    pub fn new<N, O, A>(name: N, original_metric_name: O, aggregated_metric_name: A) -> Self
    where
        N: Into<String>,
        O: Into<String>,
        A: Into<String>,
    {
        AggregationSpecification {
            name: name.into(),
            original_metric_name: original_metric_name.into(),
            aggregated_metric_name: aggregated_metric_name.into(),
        }
    }

    /// Returns true if the metric contributes to this rule's aggregate
    #[inline]
    pub fn matches(&self, metric: &Metric) -> bool {
        self.original_metric_name == metric.name
    }
}

impl fmt::Display for AggregationSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.name, self.original_metric_name, self.aggregated_metric_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wire_format() {
        let metric = Metric::new("metric2", 1.0)
            .with_dimension("service", "0")
            .with_timestamp(1_500_000_000_000.0);
        let envelope = MetricEnvelope::new(metric, 1_500_000_000_000);

        let json: serde_json::Value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["metric"]["name"], "metric2");
        assert_eq!(json["metric"]["dimensions"]["service"], "0");
        assert_eq!(json["metric"]["value"], 1.0);
        assert_eq!(json["creation_time"], 1_500_000_000_000_i64);
        assert!(json["metric"]["value_meta"].as_object().unwrap().is_empty());
        assert!(json["meta"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_specification_matches_on_name_only() {
        let spec = AggregationSpecification::new("S1", "cpu.idle", "cpu.idle.total");

        assert!(spec.matches(&Metric::new("cpu.idle", 3.0).with_dimension("host", "a")));
        assert!(spec.matches(&Metric::new("cpu.idle", 3.0).with_timestamp(42.0)));
        assert!(!spec.matches(&Metric::new("cpu.user", 3.0)));
    }

    #[test]
    fn test_specification_display() {
        let spec = AggregationSpecification::new("S1", "metric1", "agg1");
        assert_eq!(spec.to_string(), "S1: metric1 -> agg1");
    }
}
