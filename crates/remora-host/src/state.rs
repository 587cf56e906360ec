//! Shared runtime state for one host generation.
//!
//! A [`RuntimeState`] bundles every piece of mutable state the host shares
//! between the transport, the dispatcher, plugin workers and handler code.
//! It is created once per generation and handed around as an
//! `Arc<RuntimeState>`; only the lifecycle handle and the name counter
//! outlive it.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use remora_config::Config;
use serde_json::Value;
use tracing::debug;

use crate::channel::ChannelCell;
use crate::dispatch::{DISPATCH_TARGET, FunctionTable, Inbound, PendingReply, Request};
use crate::lifecycle::Lifecycle;
use crate::names::UniqueNames;
use crate::subscriptions::SubscriptionRegistry;

/// Unbounded multi-producer queue of inbound calls and events.
#[derive(Debug, Clone)]
pub struct RequestQueue {
    sender: Sender<Inbound>,
    receiver: Receiver<Inbound>,
}

impl RequestQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Write side, for transports feeding the host.
    #[must_use]
    pub fn sender(&self) -> Sender<Inbound> {
        self.sender.clone()
    }

    /// Read side, for the dispatcher.
    #[must_use]
    pub fn receiver(&self) -> Receiver<Inbound> {
        self.receiver.clone()
    }

    /// Enqueues a call or event.
    pub fn submit(&self, inbound: impl Into<Inbound>) {
        if self.sender.send(inbound.into()).is_err() {
            debug!(target: DISPATCH_TARGET, "request queue closed; message dropped");
        }
    }

    /// Enqueues a call and returns the handle its reply arrives on.
    #[must_use]
    pub fn call(&self, method: impl Into<String>, arguments: Vec<Value>) -> PendingReply {
        let (request, pending) = Request::call(method, arguments);
        self.submit(request);
        pending
    }

    /// Number of messages not yet drained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` when nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by everything running inside one generation.
#[derive(Debug)]
pub struct RuntimeState {
    requests: RequestQueue,
    lifecycle: Lifecycle,
    channel: ChannelCell,
    names: Arc<UniqueNames>,
    functions: FunctionTable,
    subscriptions: SubscriptionRegistry,
}

impl RuntimeState {
    /// Creates state for a fresh generation.
    ///
    /// `lifecycle` is shared with the driver so transitions survive the
    /// generation.
    #[must_use]
    pub fn new(config: &Config, lifecycle: Lifecycle) -> Self {
        Self::with_names(config, lifecycle, Arc::new(UniqueNames::new()))
    }

    /// Creates generation state drawing names from a counter that outlives
    /// it.
    #[must_use]
    pub fn with_names(config: &Config, lifecycle: Lifecycle, names: Arc<UniqueNames>) -> Self {
        Self {
            requests: RequestQueue::new(),
            lifecycle,
            channel: ChannelCell::new(config.channel_name(), config.channel_timeout()),
            names,
            functions: FunctionTable::default(),
            subscriptions: SubscriptionRegistry::new(),
        }
    }

    /// Inbound request queue.
    #[must_use]
    pub const fn requests(&self) -> &RequestQueue {
        &self.requests
    }

    /// Lifecycle cell shared with the driver.
    #[must_use]
    pub const fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Channel identity cell.
    #[must_use]
    pub const fn channel(&self) -> &ChannelCell {
        &self.channel
    }

    /// Unique name generator.
    #[must_use]
    pub fn names(&self) -> &UniqueNames {
        &self.names
    }

    /// Current function map.
    #[must_use]
    pub const fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Subscription registry.
    #[must_use]
    pub const fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::dispatch::Event;

    #[test]
    fn fresh_state_is_empty() {
        let state = RuntimeState::new(&Config::default(), Lifecycle::new());
        assert!(state.requests().is_empty());
        assert!(state.functions().snapshot().is_empty());
        assert!(state.subscriptions().is_empty());
        assert_eq!(state.channel().current(), None);
        assert!(!state.lifecycle().is_pending());
    }

    #[test]
    fn configured_channel_name_is_visible() {
        let config = Config {
            channel_name: Some(String::from("remora")),
            channel_timeout_ms: 5,
            ..Config::default()
        };
        let state = RuntimeState::new(&config, Lifecycle::new());
        assert_eq!(
            state
                .channel()
                .wait_for(Duration::from_millis(5))
                .map(|identity| identity.to_string()),
            Ok(String::from("remora"))
        );
    }

    #[test]
    fn queue_preserves_submission_order() {
        let queue = RequestQueue::new();
        queue.submit(Event::new("first", Vec::new()));
        let _pending = queue.call("second", vec![json!(1)]);
        assert_eq!(queue.len(), 2);

        let receiver = queue.receiver();
        assert!(matches!(
            receiver.try_recv(),
            Ok(Inbound::Event(event)) if event.name() == "first"
        ));
        assert!(matches!(
            receiver.try_recv(),
            Ok(Inbound::Call(request)) if request.method() == "second"
        ));
    }
}
