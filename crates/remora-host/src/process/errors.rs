//! Error surface for host launch and supervision.

use std::io;

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::plugin::PluginError;

/// Errors surfaced while launching or supervising the host.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// A supervision thread could not be spawned.
    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        /// Role of the thread.
        thread: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// A generation ended with a failure transition.
    #[error("host failed: {reason}")]
    Failure {
        /// Reason carried by the transition.
        reason: String,
    },
}

impl LaunchError {
    /// Builds a [`LaunchError::Failure`].
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }
}

/// Errors that abort a generation's startup.
///
/// The startup thread reports these to the driver as a failure transition.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A plugin could not be installed.
    #[error("plugin '{plugin}' failed to install: {source}")]
    Plugin {
        /// Plugin name.
        plugin: String,
        /// Underlying installation error.
        #[source]
        source: PluginError,
    },
    /// The dispatch loop could not be started.
    #[error("failed to start the dispatcher: {source}")]
    Dispatcher {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}
