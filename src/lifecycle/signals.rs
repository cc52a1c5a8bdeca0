//! OS signal handling.
//!
//! SIGINT and SIGTERM start shutdown. A repeated signal while disposal runs
//! is ignored.

use tokio::signal::unix::{signal, Signal, SignalKind};

use crate::lifecycle::shutdown::Shutdown;

/// Handlers for the shutdown signals.
///
/// Installed before the server reports itself ready so that a signal sent
/// right after the status lines is never handled by the default action.
pub struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignals {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for SIGINT or SIGTERM, then run shutdown to completion.
    pub async fn wait(mut self, shutdown: &Shutdown) {
        let name = tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        };
        tracing::info!(signal = name, "Shutdown signal received");

        let disposal = shutdown.trigger();
        tokio::pin!(disposal);
        loop {
            tokio::select! {
                _ = &mut disposal => break,
                _ = self.interrupt.recv() => tracing::debug!(signal = "SIGINT", "Ignoring repeated signal"),
                _ = self.terminate.recv() => tracing::debug!(signal = "SIGTERM", "Ignoring repeated signal"),
            }
        }
    }
}
