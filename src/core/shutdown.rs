//! # OS signal handling.
//!
//! [`ShutdownSignals`] listens for the termination signals of the process:
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd)
//! - `SIGQUIT`
//!
//! Listeners are registered by [`ShutdownSignals::install`], before any child is
//! spawned. From then on these signals no longer run their default action, so
//! they cannot end the process while workers are running.
//!
//! Children run in their own process groups, so a terminal Ctrl-C reaches only
//! this process; workers are then stopped through the regular shutdown sequence.

use std::io;

use tokio::signal::unix::{Signal, SignalKind, signal};

/// Registered SIGINT/SIGTERM/SIGQUIT listeners.
pub(crate) struct ShutdownSignals {
    sigint: Signal,
    sigterm: Signal,
    sigquit: Signal,
}

impl ShutdownSignals {
    /// Registers the listeners. Must be called from within a tokio runtime.
    pub(crate) fn install() -> io::Result<Self> {
        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    /// Completes on the next termination signal.
    pub(crate) async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigint.recv() => {},
            _ = self.sigterm.recv() => {},
            _ = self.sigquit.recv() => {},
        }
    }
}
