//! Command-line interface for the aggregator.
//!
//! `metric-aggregator <broker> <group> <topics..>` starts consuming with the
//! built-in rules. Everything else comes from an optional YAML file.

use crate::aggregation::{AggregationTable, LogSink};
use crate::broker::KafkaAdapter;
use crate::core::config::{ConfigBuilder, LogFormat};
use crate::core::{AggregatorError, Config, Result};
use crate::engine::{AggregationLoop, ShutdownSignal};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Sums Kafka metric streams into named aggregates per time window.
#[derive(Parser, Debug)]
#[command(name = "metric-aggregator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Bootstrap broker address (host:port[,host:port...])
    pub broker: String,

    /// Consumer group identifier
    pub group: String,

    /// Topics to consume
    #[arg(required = true, num_args = 1..)]
    pub topics: Vec<String>,

    /// Configuration file path (default: ~/.config/metric-aggregator/config.yaml)
    #[arg(short, long, env = "AGG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Aggregation period, e.g. "30s" or "1m"
    #[arg(long, env = "AGG_PERIOD", value_parser = humantime_serde::re::humantime::parse_duration)]
    pub period: Option<Duration>,

    /// Enable debug logging
    #[arg(short, long, env = "AGG_DEBUG")]
    pub debug: bool,

    /// Log as JSON lines
    #[arg(long, env = "AGG_LOG_JSON")]
    pub log_json: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new();

        let config_path = if let Some(path) = &self.config {
            path.clone()
        } else {
            let default_path = dirs::config_dir()
                .map(|d| d.join("metric-aggregator").join("config.yaml"))
                .unwrap_or_else(|| PathBuf::from("~/.config/metric-aggregator/config.yaml"));

            if default_path.exists() {
                default_path
            } else {
                return self.build_config_from_args(builder);
            }
        };

        match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => {
                builder = builder.from_yaml(&content)?;
            },
            Err(e) if self.config.is_some() => {
                return Err(AggregatorError::config(format!(
                    "Failed to read config file {:?}: {}",
                    config_path, e
                )));
            },
            Err(_) => {},
        }

        self.build_config_from_args(builder)
    }

    fn build_config_from_args(&self, mut builder: ConfigBuilder) -> Result<Config> {
        builder = builder
            .bootstrap_servers(self.broker.as_str())
            .group_id(self.group.as_str())
            .topics(self.topics.clone())
            .debug(self.debug);

        if let Some(period) = self.period {
            builder = builder.period(period);
        }
        if self.log_json {
            builder = builder.log_format(LogFormat::Json);
        }

        builder.build()
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(config: &Config) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_log_level = std::env::var("AGG_LOG_LEVEL")
            .unwrap_or_else(|_| config.logging.level.as_str().to_string());
        let log_level = if config.debug {
            "debug"
        } else {
            env_log_level.as_str()
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let fmt_layer = match config.logging.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .boxed(),
            LogFormat::Compact => tracing_subscriber::fmt::layer()
                .with_target(true)
                .compact()
                .boxed(),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| AggregatorError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Execute the aggregator. Errors before the loop starts are returned;
/// the loop's own outcome is mapped to an exit code.
pub async fn execute(cli: Cli) -> Result<ExitCode> {
    let config = cli.load_config().await?;

    if cli.check_config {
        println!("Configuration is valid!");
        println!("  Broker: {}", config.broker.bootstrap_servers);
        println!("  Group: {}", config.broker.group_id);
        println!("  Topics: {}", config.broker.topics.join(", "));
        println!("  Period: {:?}", config.aggregation.period);
        for spec in &config.aggregation.specifications {
            println!("  Aggregation {}", spec);
        }
        return Ok(ExitCode::SUCCESS);
    }

    Cli::init_logging(&config)?;
    run(config).await
}

async fn run(config: Config) -> Result<ExitCode> {
    let shutdown = ShutdownSignal::install()?;

    let adapter = KafkaAdapter::connect(&config.broker)?;
    adapter.subscribe()?;

    let table = AggregationTable::new(config.aggregation.specifications.clone());
    for spec in table.specifications() {
        tracing::info!("Aggregation {}", spec);
    }

    let aggregation = AggregationLoop::new(adapter, LogSink::new(), table, config.aggregation.period);
    let report = aggregation.run(shutdown.recv()).await;

    if report.exit.is_graceful() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(reason = ?report.exit, "Stopped on a fatal broker condition");
        Ok(ExitCode::FAILURE)
    }
}
