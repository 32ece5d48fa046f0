//! metric-aggregator - windowed sums over a Kafka metric stream.
//!
//! Metric envelopes are consumed from one or more topics, matched by name
//! against a fixed table of aggregation rules and summed into named
//! aggregates. Every period the sums are flushed and the window starts over.
//!
//! # Architecture
//!
//! - `broker`: the broker adapter seam and its Kafka implementation
//! - `decoder`: JSON envelope decoding
//! - `aggregation`: rule matching, the window accumulator and sinks
//! - `engine`: the single-task control loop and shutdown signals
//! - `core`: domain types, configuration and errors
//! - `cli`: command-line interface
//! - `publisher`: synthetic load generator for end-to-end runs
//!
//! # Example
//!
//! ```no_run
//! use metric_aggregator::aggregation::{AggregationTable, LogSink};
//! use metric_aggregator::broker::KafkaAdapter;
//! use metric_aggregator::core::Config;
//! use metric_aggregator::engine::{AggregationLoop, ShutdownSignal};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new()?;
//!     let shutdown = ShutdownSignal::install()?;
//!     let adapter = KafkaAdapter::connect(&config.broker)?;
//!     adapter.subscribe()?;
//!
//!     let table = AggregationTable::new(config.aggregation.specifications.clone());
//!     let report = AggregationLoop::new(adapter, LogSink::new(), table, config.aggregation.period)
//!         .run(shutdown.recv())
//!         .await;
//!     println!("{:?}", report.stats);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod aggregation;
pub mod broker;
pub mod cli;
pub mod core;
pub mod decoder;
pub mod engine;
pub mod publisher;

// Re-export core types for convenience
pub use crate::core::{Config, Result};
