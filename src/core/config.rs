//! Configuration management for the aggregator.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - CLI argument and environment overrides (applied by the CLI layer)
//! - Validation and defaults

use crate::core::{AggregationSpecification, AggregatorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Complete configuration for the aggregator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker connection and subscription
    pub broker: BrokerConfig,
    /// Aggregation window and rules
    pub aggregation: AggregationConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// Broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Bootstrap broker address list
    pub bootstrap_servers: String,
    /// Consumer group identifier
    pub group_id: String,
    /// Topics to subscribe to
    pub topics: Vec<String>,
    /// Group session timeout
    #[serde(with = "humantime_serde")]
    pub session_timeout: Duration,
    /// Where to start when the group has no committed offset
    pub auto_offset_reset: OffsetReset,
    /// Extra client properties passed through verbatim
    pub properties: HashMap<String, String>,
}

/// Aggregation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Window length between flushes
    #[serde(with = "humantime_serde")]
    pub period: Duration,
    /// Allow several specifications to feed the same aggregated metric
    pub allow_fan_in: bool,
    /// Aggregation rules
    pub specifications: Vec<AggregationSpecification>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
}

/// Offset reset policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetReset {
    /// Start from the oldest retained message
    Earliest,
    /// Start from new messages only
    Latest,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including per-message detail
    Trace,
    /// Per-message decode and match results
    Debug,
    /// Lifecycle and window flushes
    Info,
    /// Dropped messages and discarded windows
    Warn,
    /// Fatal conditions only
    Error,
}

/// Log output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human readable output
    Compact,
    /// One JSON object per line
    Json,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            bootstrap_servers: "localhost:9092".to_string(),
            group_id: "metric-aggregator".to_string(),
            topics: vec!["metrics".to_string()],
            session_timeout: Duration::from_millis(6000),
            auto_offset_reset: OffsetReset::Earliest,
            properties: HashMap::new(),
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        AggregationConfig {
            period: Duration::from_secs(60),
            allow_fan_in: false,
            specifications: vec![
                AggregationSpecification::new("Aggregation1", "metric1", "aggregated-metric1"),
                AggregationSpecification::new("Aggregation2", "metric2", "aggregated-metric2"),
            ],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            format: LogFormat::Compact,
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Broker validation
        if self.broker.bootstrap_servers.trim().is_empty() {
            return Err(AggregatorError::config("bootstrap_servers must not be empty"));
        }

        if self.broker.group_id.trim().is_empty() {
            return Err(AggregatorError::config("group_id must not be empty"));
        }

        if self.broker.topics.is_empty() {
            return Err(AggregatorError::config("at least one topic is required"));
        }

        if let Some(topic) = self.broker.topics.iter().find(|t| t.trim().is_empty()) {
            return Err(AggregatorError::config(format!("invalid topic name {:?}", topic)));
        }

        if self.broker.session_timeout.is_zero() {
            return Err(AggregatorError::config("session_timeout must be greater than 0"));
        }

        // Assignments are delegated as full sets; incremental rebalancing would
        // drop partitions still owned.
        if let Some(strategy) = self.broker.properties.get("partition.assignment.strategy") {
            if strategy.contains("cooperative") {
                return Err(AggregatorError::config(format!(
                    "partition.assignment.strategy '{}' is not supported, use an eager strategy",
                    strategy
                )));
            }
        }

        // Aggregation validation
        if self.aggregation.period.is_zero() {
            return Err(AggregatorError::config("aggregation period must be greater than 0"));
        }

        self.validate_specifications()
    }

    fn validate_specifications(&self) -> Result<()> {
        let specs = &self.aggregation.specifications;
        if specs.is_empty() {
            return Err(AggregatorError::config("at least one aggregation specification is required"));
        }

        let mut names = HashSet::with_capacity(specs.len());
        let mut targets = HashMap::with_capacity(specs.len());

        for spec in specs {
            if spec.name.is_empty()
                || spec.original_metric_name.is_empty()
                || spec.aggregated_metric_name.is_empty()
            {
                return Err(AggregatorError::config(format!(
                    "aggregation specification has an empty field: {:?}",
                    spec
                )));
            }

            if !names.insert(spec.name.as_str()) {
                return Err(AggregatorError::config(format!(
                    "duplicate aggregation specification name '{}'",
                    spec.name
                )));
            }

            if let Some(previous) =
                targets.insert(spec.aggregated_metric_name.as_str(), spec.name.as_str())
            {
                if !self.aggregation.allow_fan_in {
                    return Err(AggregatorError::config(format!(
                        "specifications '{}' and '{}' both feed '{}' (set allow_fan_in to sum them)",
                        previous, spec.name, spec.aggregated_metric_name
                    )));
                }
            }
        }

        Ok(())
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl OffsetReset {
    /// Value for the `auto.offset.reset` client property
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
        }
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)?;
        Ok(self)
    }

    /// Set bootstrap servers
    pub fn bootstrap_servers<S: Into<String>>(mut self, servers: S) -> Self {
        self.config.broker.bootstrap_servers = servers.into();
        self
    }

    /// Set consumer group
    pub fn group_id<S: Into<String>>(mut self, group: S) -> Self {
        self.config.broker.group_id = group.into();
        self
    }

    /// Set subscribed topics
    pub fn topics(mut self, topics: Vec<String>) -> Self {
        self.config.broker.topics = topics;
        self
    }

    /// Set the aggregation period
    pub fn period(mut self, period: Duration) -> Self {
        self.config.aggregation.period = period;
        self
    }

    /// Replace the aggregation specifications
    pub fn specifications(mut self, specifications: Vec<AggregationSpecification>) -> Self {
        self.config.aggregation.specifications = specifications;
        self
    }

    /// Allow several specifications to share an aggregated name
    pub fn allow_fan_in(mut self, allow: bool) -> Self {
        self.config.aggregation.allow_fan_in = allow;
        self
    }

    /// Set the log format
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
