//! Errors raised while installing or registering plugin functions.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::thread::ThreadPanic;

/// Errors arising from plugin installation and registration.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// Registration was requested from a context that carries no plugin
    /// registration.
    #[error("cannot register '{function}': no plugin registration is active")]
    NotRegistering {
        /// Function that was being registered.
        function: String,
    },

    /// The plugin's worker thread could not be spawned.
    #[error("failed to spawn worker for plugin '{plugin}'")]
    WorkerSpawn {
        /// Plugin name.
        plugin: String,
        /// Underlying OS error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The plugin's worker thread panicked.
    #[error("worker for plugin '{plugin}' panicked")]
    WorkerPanicked {
        /// Plugin name.
        plugin: String,
        /// Thread failure details.
        #[source]
        source: ThreadPanic,
    },
}

impl PluginError {
    /// Creates a registration-outside-plugin error.
    pub fn not_registering(function: impl Into<String>) -> Self {
        Self::NotRegistering {
            function: function.into(),
        }
    }

    /// Creates a worker spawn error.
    pub fn worker_spawn(plugin: impl Into<String>, source: io::Error) -> Self {
        Self::WorkerSpawn {
            plugin: plugin.into(),
            source: Arc::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_registering_names_the_function() {
        let error = PluginError::not_registering("Greet");
        assert_eq!(
            error.to_string(),
            "cannot register 'Greet': no plugin registration is active"
        );
    }

    #[test]
    fn worker_spawn_keeps_the_os_error() {
        let error = PluginError::worker_spawn("counter", io::Error::other("no threads"));
        let source = std::error::Error::source(&error).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("no threads"));
    }
}
