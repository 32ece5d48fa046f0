//! Domain types, configuration and errors shared by every component.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder};
pub use error::{AggregatorError, Result};
pub use types::{AggregationSpecification, Metric, MetricEnvelope};
