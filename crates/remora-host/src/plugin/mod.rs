//! Plugin definitions and their installation into a runtime generation.
//!
//! A [`Plugin`] bundles a name, an author-supplied environment and a list of
//! [`Export`]s. Stateless plugins publish every export as a
//! [`DispatchTarget::Direct`] entry. Stateful plugins get a private queue, a
//! [`LocalTable`] and a worker thread; their exports go through
//! [`PluginRegistration::Stateful`] and are published as queued entries.
//!
//! Installation is type-erased behind [`InstallPlugin`] so plugins with
//! different environment types can be installed side by side.

mod errors;
mod registration;
mod worker;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

pub use self::errors::PluginError;
pub use self::registration::{
    LocalTable, PluginRegistration, RegisterFn, StatefulRegistration, WorkerQueue,
    register_stateful,
};
pub use self::worker::WorkerHandle;
use crate::context::{ExecutionContext, Failure};
use crate::dispatch::{
    DirectHandler, DispatchTarget, FunctionDescriptor, FunctionKind, FunctionMapEntry,
};
use crate::state::RuntimeState;

/// Tracing target for plugin installation and workers.
pub(crate) const PLUGIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::plugin");

/// Shared handler invoked with the plugin's context and the call arguments.
pub type Handler<Env> =
    Arc<dyn Fn(&ExecutionContext<Env>, Vec<Value>) -> Result<Value, Failure> + Send + Sync>;

/// A function a plugin offers, paired with its descriptor.
pub struct Export<Env> {
    descriptor: FunctionDescriptor,
    handler: Handler<Env>,
}

impl<Env> Export<Env> {
    /// Pairs `descriptor` with `handler`.
    pub fn new<F>(descriptor: FunctionDescriptor, handler: F) -> Self
    where
        F: Fn(&ExecutionContext<Env>, Vec<Value>) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        Self {
            descriptor,
            handler: Arc::new(handler),
        }
    }

    /// Exports a synchronous function.
    pub fn function<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ExecutionContext<Env>, Vec<Value>) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        Self::new(FunctionDescriptor::function(name), handler)
    }

    /// Exports an editor command.
    pub fn command<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ExecutionContext<Env>, Vec<Value>) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        Self::new(FunctionDescriptor::command(name), handler)
    }

    /// Exports an autocommand handler.
    pub fn autocmd<F>(event: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ExecutionContext<Env>, Vec<Value>) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        Self::new(FunctionDescriptor::autocmd(event), handler)
    }

    /// Exported descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn into_parts(self) -> (FunctionDescriptor, Handler<Env>) {
        (self.descriptor, self.handler)
    }
}

impl<Env> fmt::Debug for Export<Env> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Export")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// How a plugin's exports are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginMode {
    /// Handlers run on the dispatching thread.
    Stateless,
    /// Handlers run on the plugin's own worker thread.
    Stateful,
}

/// A named group of exports sharing one environment.
pub struct Plugin<Env> {
    name: String,
    environment: Env,
    exports: Vec<Export<Env>>,
    mode: PluginMode,
}

impl<Env> Plugin<Env>
where
    Env: Send + Sync + 'static,
{
    /// Defines a plugin whose handlers run directly on the dispatching thread.
    ///
    /// Concurrent calls share `environment` without any isolation.
    pub fn stateless(
        name: impl Into<String>,
        environment: Env,
        exports: Vec<Export<Env>>,
    ) -> Self {
        Self {
            name: name.into(),
            environment,
            exports,
            mode: PluginMode::Stateless,
        }
    }

    /// Defines a plugin served by a dedicated worker thread.
    pub fn stateful(
        name: impl Into<String>,
        environment: Env,
        exports: Vec<Export<Env>>,
    ) -> Self {
        Self {
            name: name.into(),
            environment,
            exports,
            mode: PluginMode::Stateful,
        }
    }

    /// Execution mode.
    #[must_use]
    pub const fn mode(&self) -> PluginMode {
        self.mode
    }

    /// Declared exports.
    #[must_use]
    pub fn exports(&self) -> &[Export<Env>] {
        &self.exports
    }

    /// Erases the environment type for installation.
    #[must_use]
    pub fn boxed(self) -> Box<dyn InstallPlugin> {
        Box::new(self)
    }

    fn install_stateless(self) -> InstalledPlugin {
        let environment = Arc::new(self.environment);
        let mut entries = Vec::with_capacity(self.exports.len());
        for export in self.exports {
            let (descriptor, handler) = export.into_parts();
            if !descriptor.is_exposed() {
                debug!(
                    target: PLUGIN_TARGET,
                    plugin = %self.name,
                    function = descriptor.name(),
                    "stateless plugins have no local table; internal export skipped"
                );
                continue;
            }
            let target = DirectHandler::bind(Arc::clone(&environment), handler);
            entries.push(FunctionMapEntry::new(
                descriptor,
                DispatchTarget::Direct(target),
            ));
        }
        InstalledPlugin {
            name: self.name,
            entries,
            worker: None,
        }
    }

    fn install_stateful(self, state: &Arc<RuntimeState>) -> Result<InstalledPlugin, PluginError> {
        let (queue, receiver) = WorkerQueue::new(&self.name);
        let table = LocalTable::new();
        let registration = PluginRegistration::stateful(queue, table.clone());
        let entries = self
            .exports
            .into_iter()
            .filter_map(|export| {
                let (descriptor, handler) = export.into_parts();
                registration.register(&descriptor, handler)
            })
            .collect();
        let context = ExecutionContext::from_parts(
            Arc::clone(state),
            Arc::new(self.environment),
            Some(Arc::new(registration)),
        );
        let worker = WorkerHandle::spawn(&self.name, context, table, receiver)?;
        Ok(InstalledPlugin {
            name: self.name,
            entries,
            worker: Some(worker),
        })
    }
}

impl<Env> fmt::Debug for Plugin<Env> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Plugin")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("exports", &self.exports)
            .finish_non_exhaustive()
    }
}

/// Installs a plugin into a runtime generation.
pub trait InstallPlugin: Send {
    /// Plugin name, used for logging and worker naming.
    fn name(&self) -> &str;

    /// Installs the plugin against `state`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when the plugin's worker cannot be started.
    fn install(self: Box<Self>, state: &Arc<RuntimeState>) -> Result<InstalledPlugin, PluginError>;
}

impl<Env> InstallPlugin for Plugin<Env>
where
    Env: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn install(self: Box<Self>, state: &Arc<RuntimeState>) -> Result<InstalledPlugin, PluginError> {
        let plugin = *self;
        let installed = match plugin.mode {
            PluginMode::Stateless => plugin.install_stateless(),
            PluginMode::Stateful => plugin.install_stateful(state)?,
        };
        info!(
            target: PLUGIN_TARGET,
            plugin = installed.name(),
            exported = installed.entries().len(),
            stateful = installed.worker().is_some(),
            "plugin installed"
        );
        Ok(installed)
    }
}

/// Result of installing one plugin.
#[derive(Debug)]
pub struct InstalledPlugin {
    name: String,
    entries: Vec<FunctionMapEntry>,
    worker: Option<WorkerHandle>,
}

impl InstalledPlugin {
    /// Plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Entries to publish in the global map.
    #[must_use]
    pub fn entries(&self) -> &[FunctionMapEntry] {
        &self.entries
    }

    /// Worker serving the plugin, if it is stateful.
    #[must_use]
    pub const fn worker(&self) -> Option<&WorkerHandle> {
        self.worker.as_ref()
    }

    /// Splits into published entries and the worker.
    #[must_use]
    pub fn into_parts(self) -> (Vec<FunctionMapEntry>, Option<WorkerHandle>) {
        (self.entries, self.worker)
    }
}

/// Builds a descriptor of `kind` for a generated name.
pub(crate) fn anonymous_descriptor(name: String, kind: FunctionKind) -> FunctionDescriptor {
    match kind {
        FunctionKind::Function => FunctionDescriptor::function(name),
        FunctionKind::Command => FunctionDescriptor::command(name),
        FunctionKind::Autocmd => FunctionDescriptor::autocmd(name),
    }
}
