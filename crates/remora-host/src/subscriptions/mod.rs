//! Registry of event subscriptions.
//!
//! Each subscription binds an action to an event name and receives a unique,
//! never reused [`SubscriptionId`]. Subscriptions for the same event form a
//! bucket ordered newest first; [`SubscriptionRegistry::notify`] delivers to
//! every member of a bucket in that order. Empty buckets are removed so the
//! registry never lists an event without subscribers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::debug;

const SUBSCRIPTIONS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::subscriptions");

/// First identifier handed out by a fresh registry.
pub const FIRST_SUBSCRIPTION_ID: u64 = 1;

/// Identifier of a single subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Callback run with an event's arguments.
pub type SubscriptionAction = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Handle describing one subscription.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    event: String,
    action: SubscriptionAction,
}

impl Subscription {
    /// Unique identifier.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Event the subscription listens for.
    #[must_use]
    pub fn event(&self) -> &str {
        self.event.as_str()
    }

    /// Runs the action with `arguments`.
    pub fn invoke(&self, arguments: &[Value]) {
        (self.action)(arguments);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("id", &self.id)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

/// Subscription buckets keyed by event name, plus the id counter.
#[derive(Debug)]
struct Subscriptions {
    next_id: u64,
    buckets: HashMap<String, Vec<Subscription>>,
}

impl Default for Subscriptions {
    fn default() -> Self {
        Self {
            next_id: FIRST_SUBSCRIPTION_ID,
            buckets: HashMap::new(),
        }
    }
}

/// Thread-safe subscription registry.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    inner: Mutex<Subscriptions>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `action` for `event` and returns its handle.
    pub fn subscribe(&self, event: impl Into<String>, action: SubscriptionAction) -> Subscription {
        let name: String = event.into();
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        let subscription = Subscription {
            id,
            event: name.clone(),
            action,
        };
        inner
            .buckets
            .entry(name)
            .or_default()
            .insert(0, subscription.clone());
        debug!(
            target: SUBSCRIPTIONS_TARGET,
            event = subscription.event(),
            id = id.get(),
            "subscribed"
        );
        subscription
    }

    /// Removes the subscription identified by `subscription`.
    ///
    /// Unknown handles are ignored.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        let mut inner = self.lock();
        let Some(bucket) = inner.buckets.get_mut(subscription.event()) else {
            return;
        };
        bucket.retain(|member| member.id != subscription.id);
        if bucket.is_empty() {
            inner.buckets.remove(subscription.event());
        }
        debug!(
            target: SUBSCRIPTIONS_TARGET,
            event = subscription.event(),
            id = subscription.id.get(),
            "unsubscribed"
        );
    }

    /// Subscribers of `event`, newest first.
    #[must_use]
    pub fn subscribers(&self, event: &str) -> Vec<Subscription> {
        self.lock().buckets.get(event).cloned().unwrap_or_default()
    }

    /// Invokes every subscriber of `event` and returns how many ran.
    ///
    /// Actions run against a snapshot taken before the first invocation, so
    /// an action may subscribe or unsubscribe without deadlocking.
    pub fn notify(&self, event: &str, arguments: &[Value]) -> usize {
        let subscribers = self.subscribers(event);
        for subscription in &subscribers {
            subscription.invoke(arguments);
        }
        subscribers.len()
    }

    /// Event names with at least one subscriber, sorted.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        let mut events: Vec<String> = self.lock().buckets.keys().cloned().collect();
        events.sort_unstable();
        events
    }

    /// Total number of live subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().buckets.values().map(Vec::len).sum()
    }

    /// Returns `true` when nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().buckets.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Subscriptions> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
