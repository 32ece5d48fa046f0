//! Error types for the aggregator.

use thiserror::Error;

/// Every failure the aggregator reports.
#[derive(Error, Debug)]
pub enum AggregatorError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Broker-level failure outside the client library
    #[error("Broker error: {0}")]
    Broker(String),

    /// Failure reported by the Kafka client
    #[error("Kafka client error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Joining the group for the given topics failed
    #[error("Subscription to topics {topics:?} failed: {reason}")]
    Subscription {
        /// Topics requested
        topics: Vec<String>,
        /// Client-reported cause
        reason: String,
    },

    /// Delegating an assignment change failed
    #[error("Partition assignment error: {0}")]
    Assignment(String),

    /// A window could not be emitted
    #[error("Window sink error: {0}")]
    Sink(String),

    /// Signal handlers could not be installed
    #[error("Signal handler error: {0}")]
    Signal(String),

    /// JSON encoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML configuration could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for aggregator operations
pub type Result<T> = std::result::Result<T, AggregatorError>;

impl AggregatorError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new broker error
    pub fn broker<S: Into<String>>(msg: S) -> Self {
        Self::Broker(msg.into())
    }

    /// Creates a new partition assignment error
    pub fn assignment<S: Into<String>>(msg: S) -> Self {
        Self::Assignment(msg.into())
    }

    /// Creates a new sink error
    pub fn sink<S: Into<String>>(msg: S) -> Self {
        Self::Sink(msg.into())
    }

    /// Creates a new signal error
    pub fn signal<S: Into<String>>(msg: S) -> Self {
        Self::Signal(msg.into())
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Yaml(_) => "config",
            Self::Broker(_) | Self::Kafka(_) => "broker",
            Self::Subscription { .. } => "subscription",
            Self::Assignment(_) => "assignment",
            Self::Sink(_) => "sink",
            Self::Signal(_) => "signal",
            Self::Serialization(_) => "serialization",
        }
    }
}
