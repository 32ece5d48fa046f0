//! The per-period accumulator.
//!
//! A [`WindowAccumulator`] holds the running sums for the window that is
//! currently open. It is owned by exactly one control loop and never shared,
//! so it needs no synchronisation. A flush hands the sums out as a
//! [`FlushedWindow`] and starts the next window empty; nothing carries over.

use super::AggregationTable;
use crate::core::Metric;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// The sums of one closed window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlushedWindow {
    /// Zero-based window number since the loop started
    pub sequence: u64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    /// Metrics that contributed to at least one aggregate
    pub metrics_matched: u64,
    /// Aggregated metric name to sum, sorted by name
    pub sums: BTreeMap<String, f64>,
}

impl FlushedWindow {
    pub fn get(&self, aggregated_name: &str) -> Option<f64> {
        self.sums.get(aggregated_name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }
}

/// Running sums for the open window.
#[derive(Debug)]
pub struct WindowAccumulator {
    sums: HashMap<String, f64>,
    opened_at: DateTime<Utc>,
    sequence: u64,
    metrics_matched: u64,
}

impl Default for WindowAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowAccumulator {
    pub fn new() -> Self {
        Self {
            sums: HashMap::new(),
            opened_at: Utc::now(),
            sequence: 0,
            metrics_matched: 0,
        }
    }

    /// Add the metric's value to every aggregate it matches. Returns the
    /// number of aggregates touched.
    pub fn accumulate(&mut self, table: &AggregationTable, metric: &Metric) -> usize {
        let mut touched = 0;
        for spec in table.matches(metric) {
            self.add(&spec.aggregated_metric_name, metric.value);
            touched += 1;
        }

        if touched > 0 {
            self.metrics_matched += 1;
        }
        touched
    }

    /// Add a value to one aggregate, creating it at zero if absent.
    #[inline]
    pub fn add(&mut self, aggregated_name: &str, value: f64) {
        match self.sums.get_mut(aggregated_name) {
            Some(sum) => *sum += value,
            None => {
                self.sums.insert(aggregated_name.to_owned(), value);
            },
        }
    }

    pub fn get(&self, aggregated_name: &str) -> Option<f64> {
        self.sums.get(aggregated_name).copied()
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Close the open window and start a fresh, empty one.
    pub fn flush(&mut self) -> FlushedWindow {
        let closed_at = Utc::now();
        let window = FlushedWindow {
            sequence: self.sequence,
            opened_at: self.opened_at,
            closed_at,
            metrics_matched: self.metrics_matched,
            sums: std::mem::take(&mut self.sums).into_iter().collect(),
        };

        self.opened_at = closed_at;
        self.sequence += 1;
        self.metrics_matched = 0;
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AggregationSpecification;

    fn single_rule() -> AggregationTable {
        AggregationTable::new(vec![AggregationSpecification::new("S1", "metric1", "agg1")])
    }

    #[test]
    fn test_sums_within_window() {
        let table = single_rule();
        let mut window = WindowAccumulator::new();

        assert_eq!(window.accumulate(&table, &Metric::new("metric1", 2.0)), 1);
        assert_eq!(window.accumulate(&table, &Metric::new("metric1", 3.0)), 1);

        assert_eq!(window.get("agg1"), Some(5.0));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_flush_resets_state() {
        let table = single_rule();
        let mut window = WindowAccumulator::new();
        window.accumulate(&table, &Metric::new("metric1", 2.0));
        window.accumulate(&table, &Metric::new("metric1", 3.0));

        let flushed = window.flush();
        assert_eq!(flushed.sequence, 0);
        assert_eq!(flushed.get("agg1"), Some(5.0));
        assert_eq!(flushed.metrics_matched, 2);

        assert!(window.is_empty());
        assert_eq!(window.get("agg1"), None);
        assert_eq!(window.sequence(), 1);

        let next = window.flush();
        assert!(next.is_empty());
        assert_eq!(next.metrics_matched, 0);
        assert_eq!(next.opened_at, flushed.closed_at);
    }

    #[test]
    fn test_fan_out_to_independent_buckets() {
        let table = AggregationTable::new(vec![
            AggregationSpecification::new("S1", "m", "a1"),
            AggregationSpecification::new("S2", "m", "a2"),
        ]);
        let mut window = WindowAccumulator::new();

        assert_eq!(window.accumulate(&table, &Metric::new("m", 4.0)), 2);
        assert_eq!(window.get("a1"), Some(4.0));
        assert_eq!(window.get("a2"), Some(4.0));
    }

    #[test]
    fn test_fan_in_sums_into_one_bucket() {
        let table = AggregationTable::new(vec![
            AggregationSpecification::new("S1", "m", "total"),
            AggregationSpecification::new("S2", "n", "total"),
        ]);
        let mut window = WindowAccumulator::new();

        window.accumulate(&table, &Metric::new("m", 1.5));
        window.accumulate(&table, &Metric::new("n", 2.5));
        assert_eq!(window.get("total"), Some(4.0));
    }

    #[test]
    fn test_unmatched_metric_leaves_state_untouched() {
        let table = single_rule();
        let mut window = WindowAccumulator::new();
        window.accumulate(&table, &Metric::new("metric1", 1.0));

        assert_eq!(window.accumulate(&table, &Metric::new("metric9", 100.0)), 0);
        assert_eq!(window.get("agg1"), Some(1.0));
        assert_eq!(window.len(), 1);
        assert_eq!(window.flush().metrics_matched, 1);
    }

    #[test]
    fn test_sum_is_order_independent() {
        let table = single_rule();
        let values = [0.5, 8.0, -3.25, 1.75];

        let mut forward = WindowAccumulator::new();
        for v in values {
            forward.accumulate(&table, &Metric::new("metric1", v));
        }

        let mut backward = WindowAccumulator::new();
        for v in values.iter().rev() {
            backward.accumulate(&table, &Metric::new("metric1", *v));
        }

        assert_eq!(forward.get("agg1"), Some(7.0));
        assert_eq!(forward.get("agg1"), backward.get("agg1"));
    }

    #[test]
    fn test_flushed_window_sorted_json() {
        let mut window = WindowAccumulator::new();
        window.add("b", 1.0);
        window.add("a", 2.0);

        let json = serde_json::to_value(window.flush()).unwrap();
        let keys: Vec<&String> = json["sums"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(json["sequence"], 0);
    }
}
