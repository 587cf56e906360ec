//! One-shot lifecycle transitions exchanged with the top-level driver.
//!
//! Any component may post a [`LifecycleTransition`]; the driver is the sole
//! consumer. The underlying cell holds at most one pending transition, so a
//! second post blocks until the driver has consumed the first. Transitions are
//! therefore observed strictly in post order.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cell::SlotCell;

/// Tracing target for lifecycle operations.
pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Signals posted to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleTransition {
    /// Plugin installation finished; the generation is serving calls.
    InitSuccess,
    /// Tear everything down and exit.
    Quit,
    /// Tear the current generation down and start a fresh one.
    Restart,
    /// Startup or supervision failed for the given reason.
    Failure(String),
}

impl LifecycleTransition {
    /// Builds a failure transition.
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }

    /// Short label used in telemetry.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InitSuccess => "init_success",
            Self::Quit => "quit",
            Self::Restart => "restart",
            Self::Failure(_) => "failure",
        }
    }
}

impl fmt::Display for LifecycleTransition {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failure(reason) => write!(formatter, "failure: {reason}"),
            other => formatter.write_str(other.label()),
        }
    }
}

/// Shared handle to the lifecycle cell.
///
/// Clones refer to the same cell; the driver keeps one clone across runtime
/// generations so transitions posted during a restart are not lost.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    cell: Arc<SlotCell<LifecycleTransition>>,
}

impl Lifecycle {
    /// Creates an empty lifecycle cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts a transition, blocking while a previous one is unconsumed.
    pub fn post(&self, transition: LifecycleTransition) {
        debug!(
            target: LIFECYCLE_TARGET,
            transition = transition.label(),
            "posting lifecycle transition"
        );
        self.cell.put(transition);
    }

    /// Blocks until a transition is available and removes it.
    #[must_use]
    pub fn await_transition(&self) -> LifecycleTransition {
        self.cell.take()
    }

    /// Waits at most `timeout` for a transition.
    #[must_use]
    pub fn await_timeout(&self, timeout: Duration) -> Option<LifecycleTransition> {
        self.cell.take_timeout(timeout)
    }

    /// Removes a pending transition without waiting.
    #[must_use]
    pub fn try_take(&self) -> Option<LifecycleTransition> {
        self.cell.try_take()
    }

    /// Returns `true` when a posted transition has not yet been consumed.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.cell.is_full()
    }
}
