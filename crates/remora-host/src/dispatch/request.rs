//! Request envelopes flowing through the inbound queue.
//!
//! A [`Request`] names a method, carries its arguments and optionally a reply
//! slot. Calls produce a [`PendingReply`] the caller blocks on; notifications
//! carry no slot and any failure is logged instead of returned.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use serde_json::Value;
use tracing::{debug, warn};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;

/// Outcome delivered through a request's reply slot.
pub type Reply = Result<Value, DispatchError>;

/// A method invocation awaiting dispatch.
#[derive(Debug)]
pub struct Request {
    method: String,
    arguments: Vec<Value>,
    reply: Option<Sender<Reply>>,
}

impl Request {
    /// Builds a call whose reply is delivered to the returned handle.
    #[must_use]
    pub fn call(method: impl Into<String>, arguments: Vec<Value>) -> (Self, PendingReply) {
        let name: String = method.into();
        let (sender, receiver) = bounded(1);
        let pending = PendingReply {
            method: name.clone(),
            receiver,
        };
        let request = Self {
            method: name,
            arguments,
            reply: Some(sender),
        };
        (request, pending)
    }

    /// Builds a notification that expects no reply.
    #[must_use]
    pub fn notification(method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            arguments,
            reply: None,
        }
    }

    /// Method name used as the dispatch key.
    #[must_use]
    pub fn method(&self) -> &str {
        self.method.as_str()
    }

    /// Call arguments.
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Returns `true` when a caller is waiting on the outcome.
    #[must_use]
    pub const fn expects_reply(&self) -> bool {
        self.reply.is_some()
    }

    /// Splits the request into its arguments and a responder.
    pub(crate) fn into_call(self) -> (Vec<Value>, Responder) {
        let responder = Responder {
            method: self.method,
            reply: self.reply,
        };
        (self.arguments, responder)
    }

    /// Answers the request directly.
    pub(crate) fn respond(self, reply: Reply) {
        let (_, responder) = self.into_call();
        responder.respond(reply);
    }
}

/// Write side of a request's reply slot.
#[derive(Debug)]
pub(crate) struct Responder {
    method: String,
    reply: Option<Sender<Reply>>,
}

impl Responder {
    /// Delivers the outcome, or logs it when nobody is waiting.
    pub(crate) fn respond(self, reply: Reply) {
        match self.reply {
            Some(sender) => {
                if sender.send(reply).is_err() {
                    debug!(
                        target: DISPATCH_TARGET,
                        method = %self.method,
                        "caller stopped waiting before the reply was ready"
                    );
                }
            }
            None => {
                if let Err(error) = reply {
                    warn!(
                        target: DISPATCH_TARGET,
                        method = %self.method,
                        error = %error,
                        "notification failed"
                    );
                }
            }
        }
    }
}

/// Read side of a call's reply slot.
#[derive(Debug)]
pub struct PendingReply {
    method: String,
    receiver: Receiver<Reply>,
}

impl PendingReply {
    /// Blocks until the reply arrives.
    ///
    /// # Errors
    ///
    /// Returns the dispatch failure, or [`DispatchError::NoReply`] when the
    /// request was dropped unanswered.
    pub fn wait(self) -> Reply {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(DispatchError::no_reply(self.method)))
    }

    /// Blocks at most `timeout` for the reply.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Timeout`] when the wait elapses, otherwise
    /// behaves like [`PendingReply::wait`].
    pub fn wait_timeout(self, timeout: Duration) -> Reply {
        match self.receiver.recv_timeout(timeout) {
            Ok(reply) => reply,
            Err(RecvTimeoutError::Timeout) => Err(DispatchError::Timeout {
                method: self.method,
                waited: timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(DispatchError::no_reply(self.method)),
        }
    }
}

/// A named editor event fanned out to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    name: String,
    arguments: Vec<Value>,
}

impl Event {
    /// Builds an event.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Event name used as the subscription key.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Event payload.
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }
}

/// Messages accepted by the inbound queue.
#[derive(Debug)]
pub enum Inbound {
    /// A call or notification for a registered function.
    Call(Request),
    /// An event for subscribers.
    Event(Event),
}

impl From<Request> for Inbound {
    fn from(request: Request) -> Self {
        Self::Call(request)
    }
}

impl From<Event> for Inbound {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}
