//! Shutdown listeners driven by the test instead of process signals.

use std::io;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded, select};

use crate::process::{ShutdownError, ShutdownSignal};

/// Listener that completes when its trigger fires.
///
/// Dropping the trigger or closing the listener ends the wait without
/// requesting shutdown.
#[derive(Debug)]
pub struct ManualShutdown {
    receiver: Receiver<()>,
    close_tx: Mutex<Option<Sender<()>>>,
    close_rx: Receiver<()>,
    closed: Arc<AtomicBool>,
}

/// Test-side handle firing a [`ManualShutdown`].
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: Sender<()>,
    closed: Arc<AtomicBool>,
}

impl ShutdownTrigger {
    /// Requests shutdown.
    pub fn fire(&self) {
        self.sender.send(()).expect("shutdown listener is waiting");
    }

    /// Whether the host closed the listener.
    pub fn listener_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Builds a connected listener and trigger.
pub fn manual_shutdown() -> (ManualShutdown, ShutdownTrigger) {
    let (sender, receiver) = bounded(1);
    let (close_tx, close_rx) = bounded::<()>(0);
    let closed = Arc::new(AtomicBool::new(false));
    (
        ManualShutdown {
            receiver,
            close_tx: Mutex::new(Some(close_tx)),
            close_rx,
            closed: Arc::clone(&closed),
        },
        ShutdownTrigger { sender, closed },
    )
}

impl ShutdownSignal for ManualShutdown {
    fn wait(&self) -> Result<(), ShutdownError> {
        select! {
            recv(self.receiver) -> fired => fired.map_err(|_| ShutdownError::Closed),
            recv(self.close_rx) -> _ => Err(ShutdownError::Closed),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.close_tx.lock().expect("close lock").take();
    }
}

/// Listener whose installation always fails.
#[derive(Debug, Default)]
pub struct FailingShutdown;

impl ShutdownSignal for FailingShutdown {
    fn wait(&self) -> Result<(), ShutdownError> {
        Err(ShutdownError::Install {
            source: io::Error::other("signals unavailable"),
        })
    }
}
