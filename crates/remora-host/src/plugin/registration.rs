//! Registration strategies for plugins that own a worker.
//!
//! Each strategy is one variant of [`PluginRegistration`] holding exactly the
//! data it needs and a plain function pointer of a fixed type. Today the only
//! strategy is [`PluginRegistration::Stateful`]: handlers land in the plugin's
//! private [`LocalTable`] and exposed ones are published as
//! [`DispatchTarget::Queued`] entries pointing at the plugin's queue.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use crossbeam_channel::{Receiver, SendError, Sender, unbounded};

use super::Handler;
use crate::dispatch::{DispatchTarget, FunctionDescriptor, FunctionMapEntry, Request};

/// Named queue feeding a stateful plugin's worker.
#[derive(Debug, Clone)]
pub struct WorkerQueue {
    name: Arc<str>,
    sender: Sender<Request>,
}

impl WorkerQueue {
    /// Creates a queue and the receiver its worker drains.
    #[must_use]
    pub fn new(name: &str) -> (Self, Receiver<Request>) {
        let (sender, receiver) = unbounded();
        let queue = Self {
            name: Arc::from(name),
            sender,
        };
        (queue, receiver)
    }

    /// Queue name, shared with the owning plugin.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hands `request` to the worker.
    ///
    /// # Errors
    ///
    /// Gives the request back when the worker's receiver is gone.
    pub fn enqueue(&self, request: Request) -> Result<(), Request> {
        self.sender
            .send(request)
            .map_err(|SendError(rejected)| rejected)
    }

    /// Requests waiting for the worker.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    /// Returns `true` when the worker has nothing waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }
}

impl PartialEq for WorkerQueue {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.sender.same_channel(&other.sender)
    }
}

/// A stateful plugin's private mapping from method name to handler.
///
/// Clones share the same table.
pub struct LocalTable<Env> {
    handlers: Arc<RwLock<HashMap<String, Handler<Env>>>>,
}

impl<Env> LocalTable<Env> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Stores `handler` under `name`, replacing any previous handler.
    pub fn insert(&self, name: &str, handler: Handler<Env>) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.insert(name.to_owned(), handler);
    }

    /// Handler registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Handler<Env>> {
        self.read().get(name).map(Arc::clone)
    }

    /// Returns `true` when `name` resolves.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` when the table holds no handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Handler<Env>>> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<Env> Clone for LocalTable<Env> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl<Env> Default for LocalTable<Env> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Env> fmt::Debug for LocalTable<Env> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort_unstable();
        formatter
            .debug_struct("LocalTable")
            .field("handlers", &names)
            .finish()
    }
}

/// Registration procedure shared by every stateful plugin.
pub type RegisterFn<Env> = fn(
    &FunctionDescriptor,
    Handler<Env>,
    &WorkerQueue,
    &LocalTable<Env>,
) -> Option<FunctionMapEntry>;

/// Registration strategy installed while a plugin owns a worker.
pub enum PluginRegistration<Env> {
    /// Handlers are resolved by the plugin's worker.
    Stateful(StatefulRegistration<Env>),
}

/// Data carried by [`PluginRegistration::Stateful`].
pub struct StatefulRegistration<Env> {
    register: RegisterFn<Env>,
    queue: WorkerQueue,
    table: LocalTable<Env>,
}

impl<Env> PluginRegistration<Env> {
    /// Builds the stateful strategy over `queue` and `table`.
    #[must_use]
    pub fn stateful(queue: WorkerQueue, table: LocalTable<Env>) -> Self {
        Self::Stateful(StatefulRegistration {
            register: register_stateful::<Env>,
            queue,
            table,
        })
    }

    /// Registers `handler` under `descriptor`.
    ///
    /// Returns the entry to publish in the global map, or `None` for
    /// functions that stay private to the plugin.
    pub fn register(
        &self,
        descriptor: &FunctionDescriptor,
        handler: Handler<Env>,
    ) -> Option<FunctionMapEntry> {
        match self {
            Self::Stateful(registration) => (registration.register)(
                descriptor,
                handler,
                &registration.queue,
                &registration.table,
            ),
        }
    }

    /// Queue the plugin's worker drains.
    #[must_use]
    pub const fn queue(&self) -> &WorkerQueue {
        match self {
            Self::Stateful(registration) => &registration.queue,
        }
    }

    /// The plugin's private table.
    #[must_use]
    pub const fn table(&self) -> &LocalTable<Env> {
        match self {
            Self::Stateful(registration) => &registration.table,
        }
    }
}

impl<Env> fmt::Debug for PluginRegistration<Env> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stateful(registration) => formatter
                .debug_struct("Stateful")
                .field("queue", &registration.queue)
                .field("table", &registration.table)
                .finish_non_exhaustive(),
        }
    }
}

/// Stores `handler` in `table` and, for exposed descriptors, returns a
/// queued entry targeting `queue`.
pub fn register_stateful<Env>(
    descriptor: &FunctionDescriptor,
    handler: Handler<Env>,
    queue: &WorkerQueue,
    table: &LocalTable<Env>,
) -> Option<FunctionMapEntry> {
    table.insert(descriptor.name(), handler);
    descriptor.is_exposed().then(|| {
        FunctionMapEntry::new(descriptor.clone(), DispatchTarget::Queued(queue.clone()))
    })
}
