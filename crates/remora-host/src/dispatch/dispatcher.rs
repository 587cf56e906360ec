//! Dispatch loop draining the inbound request queue.

use std::io;
use std::sync::Arc;

use tracing::{debug, info};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::map::DispatchTarget;
use super::request::{Inbound, Request};
use crate::state::RuntimeState;
use crate::thread::{ServiceThread, ThreadPanic, drain_queue};

/// Routes one request through the current function map.
///
/// Direct handlers run on the calling thread; queued targets are handed to
/// their worker. Unknown methods are answered with
/// [`DispatchError::UnknownFunction`].
pub fn dispatch(state: &Arc<RuntimeState>, request: Request) {
    let map = state.functions().snapshot();
    let Some(entry) = map.get(request.method()) else {
        debug!(
            target: DISPATCH_TARGET,
            method = request.method(),
            "no function registered"
        );
        let error = DispatchError::unknown_function(request.method());
        request.respond(Err(error));
        return;
    };

    match entry.target() {
        DispatchTarget::Direct(handler) => {
            let (arguments, responder) = request.into_call();
            responder.respond(handler.invoke(state, arguments).map_err(DispatchError::from));
        }
        DispatchTarget::Queued(queue) => {
            if let Err(request) = queue.enqueue(request) {
                let error = DispatchError::worker_unavailable(queue.name(), request.method());
                request.respond(Err(error));
            }
        }
    }
}

/// Handles one inbound message: calls are dispatched, events notify
/// subscribers.
pub fn handle_inbound(state: &Arc<RuntimeState>, inbound: Inbound) {
    match inbound {
        Inbound::Call(request) => dispatch(state, request),
        Inbound::Event(event) => {
            let delivered = state
                .subscriptions()
                .notify(event.name(), event.arguments());
            debug!(
                target: DISPATCH_TARGET,
                event = event.name(),
                delivered,
                "event delivered"
            );
        }
    }
}

/// Background thread running the dispatch loop for one generation.
#[derive(Debug)]
pub struct Dispatcher {
    thread: ServiceThread,
}

impl Dispatcher {
    /// Starts draining `state`'s request queue.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the thread cannot be spawned.
    pub fn start(state: Arc<RuntimeState>) -> io::Result<Self> {
        let receiver = state.requests().receiver();
        let thread = ServiceThread::spawn("remora-dispatch", move |shutdown| {
            info!(target: DISPATCH_TARGET, "dispatcher active");
            drain_queue(&receiver, shutdown, |inbound| handle_inbound(&state, inbound));
            debug!(target: DISPATCH_TARGET, "dispatcher stopped");
        })?;
        Ok(Self { thread })
    }

    /// Asks the loop to stop after the message in hand.
    pub fn shutdown(&self) {
        self.thread.shutdown();
    }

    /// Returns `true` once the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadPanic`] if the loop panicked.
    pub fn join(self) -> Result<(), ThreadPanic> {
        self.thread.join()
    }
}
