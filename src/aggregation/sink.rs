//! Destinations for flushed windows.

use super::FlushedWindow;
use crate::core::{AggregatorError, Result};

/// Receives every closed window, in order.
pub trait WindowSink: Send {
    fn emit(&mut self, window: &FlushedWindow) -> Result<()>;
}

/// Writes windows to the log: one event per aggregate, then the whole
/// window as a JSON document.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl WindowSink for LogSink {
    fn emit(&mut self, window: &FlushedWindow) -> Result<()> {
        for (name, sum) in &window.sums {
            tracing::info!(
                window = window.sequence,
                aggregated_metric = %name,
                sum = *sum,
                "Aggregate"
            );
        }

        let document = serde_json::to_string(window)
            .map_err(|e| AggregatorError::sink(format!("Failed to encode window: {}", e)))?;

        tracing::info!(
            window = window.sequence,
            aggregates = window.sums.len(),
            metrics_matched = window.metrics_matched,
            opened_at = %window.opened_at,
            closed_at = %window.closed_at,
            aggregations = %document,
            "Window flushed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::WindowAccumulator;

    #[test]
    fn test_log_sink_accepts_windows() {
        let mut accumulator = WindowAccumulator::new();
        accumulator.add("aggregated-metric1", 3.0);

        let mut sink = LogSink::new();
        assert!(sink.emit(&accumulator.flush()).is_ok());
        assert!(sink.emit(&accumulator.flush()).is_ok());
    }
}
