//! The control path: the aggregation loop and process shutdown.

pub mod control_loop;
pub mod shutdown;

pub use control_loop::{AggregationLoop, ExitReason, LoopReport, LoopState, LoopStats};
pub use shutdown::{ShutdownSignal, TerminationSignal};
