//! Process termination signals.

use crate::core::{AggregatorError, Result};
use std::fmt;

/// The signal that ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => f.write_str("SIGINT"),
            TerminationSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Handlers for SIGINT and SIGTERM, registered before the loop starts so a
/// signal arriving during startup is not lost.
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Register the handlers. Must be called from within a tokio runtime.
    #[cfg(unix)]
    pub fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let interrupt = signal(SignalKind::interrupt())
            .map_err(|e| AggregatorError::signal(format!("Failed to install SIGINT handler: {}", e)))?;
        let terminate = signal(SignalKind::terminate())
            .map_err(|e| AggregatorError::signal(format!("Failed to install SIGTERM handler: {}", e)))?;

        Ok(Self {
            interrupt,
            terminate,
        })
    }

    /// Register the handlers. Must be called from within a tokio runtime.
    #[cfg(not(unix))]
    pub fn install() -> Result<Self> {
        Ok(Self {})
    }

    /// Resolve with the first termination signal received.
    #[cfg(unix)]
    pub async fn recv(mut self) -> TerminationSignal {
        tokio::select! {
            _ = self.interrupt.recv() => TerminationSignal::Interrupt,
            _ = self.terminate.recv() => TerminationSignal::Terminate,
        }
    }

    /// Resolve with the first termination signal received.
    #[cfg(not(unix))]
    pub async fn recv(self) -> TerminationSignal {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Ctrl-C handler failed: {}", e);
            std::future::pending::<()>().await;
        }
        TerminationSignal::Interrupt
    }
}
