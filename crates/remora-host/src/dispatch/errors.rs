//! Error types for call dispatch failures.

use std::time::Duration;

use thiserror::Error;

use crate::context::Diagnostic;

/// Errors surfaced to the caller of a dispatched request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// No entry matches the requested method.
    #[error("no function registered for method '{method}'")]
    UnknownFunction {
        /// Requested method name.
        method: String,
    },

    /// The handler ran and did not succeed.
    #[error("handler failed: {0}")]
    Handler(#[from] Diagnostic),

    /// The worker owning the method no longer drains its queue.
    #[error("worker '{worker}' is not accepting calls for '{method}'")]
    WorkerUnavailable {
        /// Worker queue name.
        worker: String,
        /// Requested method name.
        method: String,
    },

    /// The request was dropped before a reply was produced.
    #[error("no reply received for '{method}'")]
    NoReply {
        /// Requested method name.
        method: String,
    },

    /// No reply arrived within the caller's wait.
    #[error("timed out after {}ms waiting for '{method}'", waited.as_millis())]
    Timeout {
        /// Requested method name.
        method: String,
        /// Time spent waiting.
        waited: Duration,
    },
}

impl DispatchError {
    /// Creates an unknown function error.
    pub fn unknown_function(method: impl Into<String>) -> Self {
        Self::UnknownFunction {
            method: method.into(),
        }
    }

    /// Creates a worker unavailable error.
    pub fn worker_unavailable(worker: impl Into<String>, method: impl Into<String>) -> Self {
        Self::WorkerUnavailable {
            worker: worker.into(),
            method: method.into(),
        }
    }

    /// Creates a missing reply error.
    pub fn no_reply(method: impl Into<String>) -> Self {
        Self::NoReply {
            method: method.into(),
        }
    }

    /// Returns the handler diagnostic, when the handler itself failed.
    #[must_use]
    pub const fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Handler(diagnostic) => Some(diagnostic),
            Self::UnknownFunction { .. }
            | Self::WorkerUnavailable { .. }
            | Self::NoReply { .. }
            | Self::Timeout { .. } => None,
        }
    }
}
