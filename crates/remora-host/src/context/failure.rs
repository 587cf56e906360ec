//! Failure and diagnostic types produced at the execution boundary.
//!
//! [`Failure`] is the channel plugin authors use deliberately. Everything else
//! that goes wrong inside a computation surfaces as a panic, which the
//! boundary classifies into a [`FaultKind`]. Either way the caller receives a
//! [`Diagnostic`] with a renderable message.

use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::channel::ChannelError;
use crate::dispatch::DispatchError;
use crate::plugin::PluginError;

/// Structured application-level failure raised by handler code.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct Failure {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Failure {
    /// Builds a failure carrying `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a failure that wraps an underlying error.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Message supplied by the raiser.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Shorthand for terminating a computation with a [`Failure`].
///
/// # Errors
///
/// Always returns `Err`.
pub fn fail<T>(message: impl Into<String>) -> Result<T, Failure> {
    Err(Failure::new(message))
}

impl From<PluginError> for Failure {
    fn from(error: PluginError) -> Self {
        Self::with_source("plugin operation failed", error)
    }
}

impl From<ChannelError> for Failure {
    fn from(error: ChannelError) -> Self {
        Self::with_source("channel identity unavailable", error)
    }
}

impl From<DispatchError> for Failure {
    fn from(error: DispatchError) -> Self {
        Self::with_source("call failed", error)
    }
}

/// Recognised categories of runtime faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Integer overflow, division or remainder by zero.
    Arithmetic,
    /// Indexing or slicing outside the bounds of a collection.
    OutOfBounds,
    /// `unimplemented!` or `todo!` reached.
    Unimplemented,
    /// `unreachable!` reached; the closest analogue to a non-exhaustive match.
    Unreachable,
    /// Anything the classifier does not recognise.
    Unknown,
}

impl FaultKind {
    /// Human-readable label prefixed to rendered diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Arithmetic => "arithmetic fault",
            Self::OutOfBounds => "out of bounds access",
            Self::Unimplemented => "unimplemented",
            Self::Unreachable => "non-exhaustive match",
            Self::Unknown => "unhandled fault",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Where a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", content = "fault", rename_all = "snake_case")]
pub enum DiagnosticOrigin {
    /// A deliberately raised [`Failure`].
    Failure,
    /// A caught runtime fault.
    Fault(FaultKind),
}

/// Renderable outcome of a computation that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    #[serde(flatten)]
    origin: DiagnosticOrigin,
    message: String,
}

impl Diagnostic {
    /// Renders a [`Failure`], appending each source in its chain.
    #[must_use]
    pub fn from_failure(failure: &Failure) -> Self {
        let mut message = failure.message().to_owned();
        let mut source = failure.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            origin: DiagnosticOrigin::Failure,
            message,
        }
    }

    /// Builds a diagnostic for a caught fault.
    #[must_use]
    pub fn fault(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            origin: DiagnosticOrigin::Fault(kind),
            message: message.into(),
        }
    }

    /// Origin of the diagnostic.
    #[must_use]
    pub const fn origin(&self) -> DiagnosticOrigin {
        self.origin
    }

    /// Fault category, when the diagnostic came from a fault.
    #[must_use]
    pub const fn fault_kind(&self) -> Option<FaultKind> {
        match self.origin {
            DiagnosticOrigin::Failure => None,
            DiagnosticOrigin::Fault(kind) => Some(kind),
        }
    }

    /// Message without the category label.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            DiagnosticOrigin::Failure => formatter.write_str(&self.message),
            DiagnosticOrigin::Fault(kind) => write!(formatter, "{kind}: {}", self.message),
        }
    }
}

impl StdError for Diagnostic {}
