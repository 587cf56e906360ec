//! Named background threads that drain a queue until asked to stop.

use std::io;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use thiserror::Error;

/// How long a queue drain waits before rechecking the shutdown flag.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A background thread terminated by panicking.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("thread '{name}' panicked")]
pub struct ThreadPanic {
    /// Thread name.
    pub name: String,
}

/// Handle to a named service thread.
#[derive(Debug)]
pub(crate) struct ServiceThread {
    name: String,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ServiceThread {
    /// Spawns `body` on a thread called `name`, handing it the shutdown flag.
    pub(crate) fn spawn<F>(name: impl Into<String>, body: F) -> io::Result<Self>
    where
        F: FnOnce(&AtomicBool) + Send + 'static,
    {
        let thread_name: String = name.into();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || body(&flag))?;
        Ok(Self {
            name: thread_name,
            shutdown,
            handle: Some(handle),
        })
    }

    pub(crate) fn name(&self) -> &str {
        self.name.as_str()
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    pub(crate) fn join(mut self) -> Result<(), ThreadPanic> {
        match self.handle.take().map(JoinHandle::join) {
            Some(Err(_)) => Err(ThreadPanic {
                name: self.name.clone(),
            }),
            Some(Ok(())) | None => Ok(()),
        }
    }
}

impl Drop for ServiceThread {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Feeds every message from `receiver` to `handle` until shutdown or
/// disconnection.
pub(crate) fn drain_queue<T>(
    receiver: &Receiver<T>,
    shutdown: &AtomicBool,
    mut handle: impl FnMut(T),
) {
    while !shutdown.load(Ordering::SeqCst) {
        match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(message) => handle(message),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;

    use super::*;

    #[test]
    fn drains_until_shutdown() {
        let (sender, receiver) = unbounded();
        let (seen_tx, seen_rx) = unbounded();
        let service = ServiceThread::spawn("drain-test", move |shutdown| {
            drain_queue(&receiver, shutdown, |value: u32| {
                seen_tx.send(value).expect("record value");
            });
        })
        .expect("spawn service thread");

        sender.send(7).expect("send value");
        assert_eq!(seen_rx.recv_timeout(Duration::from_secs(5)), Ok(7));
        assert_eq!(service.name(), "drain-test");

        service.shutdown();
        service.join().expect("service thread exits cleanly");
    }

    #[test]
    fn disconnection_ends_the_drain() {
        let (sender, receiver) = unbounded::<u32>();
        let service = ServiceThread::spawn("disconnect-test", move |shutdown| {
            drain_queue(&receiver, shutdown, drop);
        })
        .expect("spawn service thread");
        drop(sender);
        service.join().expect("service thread exits cleanly");
    }

    #[test]
    fn panics_are_reported_on_join() {
        let service = ServiceThread::spawn("panic-test", |_| panic!("boom"))
            .expect("spawn service thread");
        assert_eq!(
            service.join(),
            Err(ThreadPanic {
                name: String::from("panic-test"),
            })
        );
    }
}
