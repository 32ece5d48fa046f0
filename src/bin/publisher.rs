//! Synthetic metric publisher for exercising the aggregator end to end.

use clap::Parser;
use metric_aggregator::engine::ShutdownSignal;
use metric_aggregator::publisher::{run_publisher, BurstSettings, PublisherConfig};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Publish bursts of synthetic metric envelopes to a topic.
#[derive(Parser, Debug)]
#[command(name = "metric-publisher")]
#[command(version, about, long_about = None)]
struct Args {
    /// Bootstrap broker address
    broker: String,

    /// Destination topic
    topic: String,

    /// Time between bursts
    #[arg(long, default_value = "1s", value_parser = humantime_serde::re::humantime::parse_duration)]
    interval: Duration,

    /// Metric name to publish
    #[arg(long, default_value = "metric2")]
    metric_name: String,

    /// Distinct `service` dimension values per burst
    #[arg(long, default_value_t = 3)]
    services: usize,

    /// Distinct `hostname` dimension values per burst
    #[arg(long, default_value_t = 2)]
    hosts: usize,

    /// Value carried by every metric
    #[arg(long, default_value_t = 1.0)]
    value: f64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    let config = PublisherConfig {
        bootstrap_servers: args.broker,
        topic: args.topic,
        interval: args.interval,
        burst: BurstSettings {
            metric_name: args.metric_name,
            services: args.services,
            hosts: args.hosts,
            value: args.value,
        },
    };

    let shutdown = match ShutdownSignal::install() {
        Ok(shutdown) => shutdown,
        Err(e) => {
            eprintln!("metric-publisher: {}", e);
            return ExitCode::FAILURE;
        },
    };

    match run_publisher(&config, shutdown.recv()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("metric-publisher: {}", e);
            ExitCode::FAILURE
        },
    }
}
