//! metric-aggregator CLI entry point.

use metric_aggregator::cli::{self, Cli};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    match cli::execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("metric-aggregator: {}", e);
            ExitCode::FAILURE
        },
    }
}
