//! Shutdown signal listeners.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the listener cannot be installed or
    /// stops without requesting shutdown.
    fn wait(&self) -> Result<(), ShutdownError>;

    /// Stops listening; a pending [`wait`](Self::wait) returns
    /// [`ShutdownError::Closed`].
    fn close(&self) {}
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The listener stopped without a shutdown request.
    #[error("shutdown listener closed")]
    Closed,
}

/// Shutdown listener that waits for termination signals.
///
/// The handlers stay installed only while [`wait`](ShutdownSignal::wait) runs;
/// closing the listener removes them.
#[derive(Debug, Default)]
pub struct SystemShutdownSignal {
    closed: AtomicBool,
    handle: Mutex<Option<Handle>>,
}

impl SystemShutdownSignal {
    /// Builds a signal listener.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        let handle = signals.handle();
        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle.clone());
        if self.closed.load(Ordering::SeqCst) {
            handle.close();
        }
        let Some(signal) = signals.forever().next() else {
            return Err(ShutdownError::Closed);
        };
        info!(target: PROCESS_TARGET, signal, "shutdown signal received");
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(registered) = handle {
            registered.close();
        }
    }
}
