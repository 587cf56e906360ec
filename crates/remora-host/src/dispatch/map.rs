//! Function map routing method names to handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use super::descriptor::FunctionDescriptor;
use crate::context::{Diagnostic, ExecutionContext};
use crate::plugin::{Handler, WorkerQueue};
use crate::state::RuntimeState;

type DirectFn = dyn Fn(&Arc<RuntimeState>, Vec<Value>) -> Result<Value, Diagnostic> + Send + Sync;

/// Handler bound to its plugin environment, invoked on the dispatching thread.
#[derive(Clone)]
pub struct DirectHandler {
    invoke: Arc<DirectFn>,
}

impl DirectHandler {
    /// Binds `handler` to `environment`.
    ///
    /// Every invocation builds a fresh context over the dispatching state and
    /// runs the handler inside the execution boundary.
    #[must_use]
    pub fn bind<Env>(environment: Arc<Env>, handler: Handler<Env>) -> Self
    where
        Env: Send + Sync + 'static,
    {
        let invoke = move |state: &Arc<RuntimeState>, arguments: Vec<Value>| {
            let context =
                ExecutionContext::from_parts(Arc::clone(state), Arc::clone(&environment), None);
            context.run(|ctx| handler(ctx, arguments))
        };
        Self {
            invoke: Arc::new(invoke),
        }
    }

    /// Runs the handler against `state`.
    ///
    /// # Errors
    ///
    /// Returns the diagnostic produced by the execution boundary.
    pub fn invoke(
        &self,
        state: &Arc<RuntimeState>,
        arguments: Vec<Value>,
    ) -> Result<Value, Diagnostic> {
        (self.invoke)(state, arguments)
    }
}

impl fmt::Debug for DirectHandler {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DirectHandler")
            .finish_non_exhaustive()
    }
}

impl PartialEq for DirectHandler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.invoke, &other.invoke)
    }
}

/// Where calls for a method are executed.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchTarget {
    /// Run synchronously on the dispatching thread.
    Direct(DirectHandler),
    /// Enqueue onto a stateful plugin's worker.
    Queued(WorkerQueue),
}

/// One routable method.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionMapEntry {
    descriptor: FunctionDescriptor,
    target: DispatchTarget,
}

impl FunctionMapEntry {
    /// Pairs a descriptor with its target.
    #[must_use]
    pub const fn new(descriptor: FunctionDescriptor, target: DispatchTarget) -> Self {
        Self { descriptor, target }
    }

    /// Dispatch key.
    #[must_use]
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Declared call contract.
    #[must_use]
    pub const fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    /// Execution target.
    #[must_use]
    pub const fn target(&self) -> &DispatchTarget {
        &self.target
    }
}

/// Mapping from method name to entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionMap {
    entries: HashMap<String, FunctionMapEntry>,
}

impl FunctionMap {
    /// Looks up the entry for `method`.
    #[must_use]
    pub fn get(&self, method: &str) -> Option<&FunctionMapEntry> {
        self.entries.get(method)
    }

    /// Returns `true` when `method` is routable.
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.entries.contains_key(method)
    }

    /// Number of routable methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is routable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Routable method names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Inserts `entry`, replacing any entry under the same name.
    pub fn insert(&mut self, entry: FunctionMapEntry) -> Option<FunctionMapEntry> {
        self.entries.insert(entry.name().to_owned(), entry)
    }
}

impl Extend<FunctionMapEntry> for FunctionMap {
    fn extend<I: IntoIterator<Item = FunctionMapEntry>>(&mut self, entries: I) {
        for entry in entries {
            self.insert(entry);
        }
    }
}

impl FromIterator<FunctionMapEntry> for FunctionMap {
    fn from_iter<I: IntoIterator<Item = FunctionMapEntry>>(entries: I) -> Self {
        let mut map = Self::default();
        map.extend(entries);
        map
    }
}

/// Builds a map from `entries`; later entries win on duplicate names.
pub fn build_map(entries: impl IntoIterator<Item = FunctionMapEntry>) -> FunctionMap {
    entries.into_iter().collect()
}

/// Shared, atomically replaceable function map.
///
/// Readers take a snapshot and never observe a partially rebuilt map.
#[derive(Debug, Default)]
pub struct FunctionTable {
    current: RwLock<Arc<FunctionMap>>,
}

impl FunctionTable {
    /// Current map.
    #[must_use]
    pub fn snapshot(&self) -> Arc<FunctionMap> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swaps in a rebuilt map.
    pub fn replace(&self, map: FunctionMap) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(map);
    }

    /// Publishes one more entry, returning the one it replaced.
    pub fn insert(&self, entry: FunctionMapEntry) -> Option<FunctionMapEntry> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = FunctionMap::clone(&guard);
        let previous = next.insert(entry);
        *guard = Arc::new(next);
        previous
    }
}
