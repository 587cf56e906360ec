//! Channel identity assigned by the editor handshake.
//!
//! The cell starts empty or pre-set to a configured name. The transport writes
//! the numeric channel id exactly once after the handshake; later writes are
//! rejected. Reads either query without waiting ([`ChannelCell::current`]) or
//! block for a bounded time ([`ChannelCell::wait`]).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::cell::SlotCell;

const CHANNEL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::channel");

/// Identity of this provider's connection to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelIdentity {
    /// Name configured before the handshake.
    Name(String),
    /// Numeric channel id assigned by the editor.
    Id(u64),
}

impl fmt::Display for ChannelIdentity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => formatter.write_str(name),
            Self::Id(id) => write!(formatter, "{id}"),
        }
    }
}

/// Errors raised by channel-identity reads and writes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// No identity became available within the bounded wait.
    #[error("channel identity not available after {}ms", waited.as_millis())]
    NotAvailable {
        /// Time spent waiting.
        waited: Duration,
    },
    /// The numeric id was already assigned.
    #[error("channel id already assigned")]
    AlreadyAssigned,
}

/// Single-assignment cell holding the channel identity.
#[derive(Debug)]
pub struct ChannelCell {
    identity: SlotCell<ChannelIdentity>,
    assigned: AtomicBool,
    timeout: Duration,
}

impl ChannelCell {
    /// Creates a cell, optionally pre-set to `name`, whose blocking reads
    /// wait at most `timeout`.
    #[must_use]
    pub fn new(name: Option<&str>, timeout: Duration) -> Self {
        let identity = match name {
            Some(name) => SlotCell::full(ChannelIdentity::Name(name.to_owned())),
            None => SlotCell::empty(),
        };
        Self {
            identity,
            assigned: AtomicBool::new(false),
            timeout,
        }
    }

    /// Records the numeric channel id; permitted once.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::AlreadyAssigned`] on every call after the
    /// first.
    pub fn assign(&self, id: u64) -> Result<(), ChannelError> {
        if self.assigned.swap(true, Ordering::SeqCst) {
            return Err(ChannelError::AlreadyAssigned);
        }
        let previous = self.identity.replace(ChannelIdentity::Id(id));
        info!(
            target: CHANNEL_TARGET,
            channel_id = id,
            previous = ?previous,
            "channel id assigned"
        );
        Ok(())
    }

    /// Returns the identity if one is available, without waiting.
    #[must_use]
    pub fn current(&self) -> Option<ChannelIdentity> {
        self.identity.try_read()
    }

    /// Waits up to the configured timeout for an identity.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::NotAvailable`] when the wait elapses.
    pub fn wait(&self) -> Result<ChannelIdentity, ChannelError> {
        self.wait_for(self.timeout)
    }

    /// Waits up to `timeout` for an identity.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::NotAvailable`] when the wait elapses.
    pub fn wait_for(&self, timeout: Duration) -> Result<ChannelIdentity, ChannelError> {
        self.identity
            .read_timeout(timeout)
            .ok_or(ChannelError::NotAvailable { waited: timeout })
    }

    /// Returns `true` once the numeric id has been written.
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.assigned.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    const SHORT: Duration = Duration::from_millis(20);

    #[test]
    fn empty_cell_times_out() {
        let cell = ChannelCell::new(None, SHORT);
        assert_eq!(cell.current(), None);
        assert_eq!(
            cell.wait(),
            Err(ChannelError::NotAvailable { waited: SHORT })
        );
    }

    #[test]
    fn preset_name_is_readable_immediately() {
        let cell = ChannelCell::new(Some("remora"), SHORT);
        assert_eq!(
            cell.wait(),
            Ok(ChannelIdentity::Name(String::from("remora")))
        );
        assert!(!cell.is_assigned());
    }

    #[test]
    fn assignment_replaces_preset_name() {
        let cell = ChannelCell::new(Some("remora"), SHORT);
        cell.assign(3).expect("first assignment");
        assert_eq!(cell.current(), Some(ChannelIdentity::Id(3)));
        assert!(cell.is_assigned());
    }

    #[test]
    fn second_assignment_is_rejected() {
        let cell = ChannelCell::new(None, SHORT);
        cell.assign(1).expect("first assignment");
        assert_eq!(cell.assign(2), Err(ChannelError::AlreadyAssigned));
        assert_eq!(cell.current(), Some(ChannelIdentity::Id(1)));
    }

    #[test]
    fn blocked_reader_observes_later_assignment() {
        let cell = Arc::new(ChannelCell::new(None, Duration::from_secs(5)));
        let writer = Arc::clone(&cell);
        let handle = thread::spawn(move || {
            thread::sleep(SHORT);
            writer.assign(42).expect("assign");
        });
        assert_eq!(cell.wait(), Ok(ChannelIdentity::Id(42)));
        handle.join().expect("writer thread");
    }
}
