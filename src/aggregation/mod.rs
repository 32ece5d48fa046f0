//! Windowed sum aggregation.
//!
//! - `matcher`: which rules a metric feeds
//! - `window`: running sums for the open period and flush-and-reset
//! - `sink`: where closed windows go

pub mod matcher;
pub mod sink;
pub mod window;

pub use matcher::AggregationTable;
pub use sink::{LogSink, WindowSink};
pub use window::{FlushedWindow, WindowAccumulator};
