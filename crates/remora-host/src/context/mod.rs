//! Execution context handed to every handler and callback.
//!
//! An [`ExecutionContext`] is an explicit value carrying the generation's
//! [`RuntimeState`], the plugin's environment and, inside a stateful plugin,
//! the plugin's [`PluginRegistration`]. Handlers receive it by reference;
//! nothing is looked up through process-wide globals.
//!
//! Every computation that may run plugin code goes through [`run`], which
//! converts failures and faults into a [`Diagnostic`].

mod failure;
mod run;

use std::sync::{Arc, Weak};

use serde_json::Value;
use tracing::{debug, warn};

pub use self::failure::{Diagnostic, DiagnosticOrigin, Failure, FaultKind, fail};
pub use self::run::{raise, run};
use crate::channel::{ChannelError, ChannelIdentity};
use crate::dispatch::{FunctionDescriptor, FunctionKind, FunctionMapEntry};
use crate::lifecycle::LifecycleTransition;
use crate::plugin::{Handler, PluginError, PluginRegistration, anonymous_descriptor};
use crate::state::RuntimeState;
use crate::subscriptions::{Subscription, SubscriptionAction};

/// Tracing target for execution-boundary events.
pub(crate) const CONTEXT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::context");

/// Runtime state plus the environment of the plugin being served.
///
/// Plugin code reaches the runtime only through the context's operations. The
/// generation state itself stays with the host core:
///
/// ```compile_fail
/// use remora_host::ExecutionContext;
///
/// fn wipe(ctx: &ExecutionContext<()>) {
///     ctx.state().functions().replace(Default::default());
/// }
/// ```
pub struct ExecutionContext<Env> {
    state: Arc<RuntimeState>,
    environment: Arc<Env>,
    registration: Option<Arc<PluginRegistration<Env>>>,
}

impl<Env> Clone for ExecutionContext<Env> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            environment: Arc::clone(&self.environment),
            registration: self.registration.clone(),
        }
    }
}

impl<Env> std::fmt::Debug for ExecutionContext<Env> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ExecutionContext")
            .field("registration", &self.registration)
            .finish_non_exhaustive()
    }
}

impl<Env> ExecutionContext<Env> {
    /// Builds a context over `state` with a fresh environment and no
    /// registration.
    pub fn new(state: Arc<RuntimeState>, environment: Env) -> Self {
        Self::from_parts(state, Arc::new(environment), None)
    }

    pub(crate) const fn from_parts(
        state: Arc<RuntimeState>,
        environment: Arc<Env>,
        registration: Option<Arc<PluginRegistration<Env>>>,
    ) -> Self {
        Self {
            state,
            environment,
            registration,
        }
    }

    /// The plugin's environment.
    #[must_use]
    pub fn env(&self) -> &Env {
        &self.environment
    }

    /// Shared handle to the plugin's environment.
    #[must_use]
    pub fn shared_env(&self) -> Arc<Env> {
        Arc::clone(&self.environment)
    }

    /// Runs `computation` against a context whose environment is `environment`.
    ///
    /// The substituted context carries no registration. The receiver is left
    /// untouched however the computation ends.
    pub fn with_env<Other, R>(
        &self,
        environment: Other,
        computation: impl FnOnce(&ExecutionContext<Other>) -> R,
    ) -> R {
        let scoped = ExecutionContext::from_parts(
            Arc::clone(&self.state),
            Arc::new(environment),
            None,
        );
        computation(&scoped)
    }

    /// Generation state, reserved for the host core.
    #[must_use]
    pub(crate) const fn state(&self) -> &Arc<RuntimeState> {
        &self.state
    }

    /// Registration of the stateful plugin being served, if any.
    #[must_use]
    pub fn registration(&self) -> Option<&PluginRegistration<Env>> {
        self.registration.as_deref()
    }

    /// Evaluates `computation` inside the execution boundary.
    ///
    /// # Errors
    ///
    /// Returns the [`Diagnostic`] for the failure or fault that ended it.
    pub fn run<T>(
        &self,
        computation: impl FnOnce(&Self) -> Result<T, Failure>,
    ) -> Result<T, Diagnostic> {
        run(self, computation)
    }

    /// Returns a name unique for the lifetime of the process.
    #[must_use]
    pub fn next_name(&self) -> String {
        self.state.names().next_name()
    }

    /// Channel identity, waiting up to the configured bound.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::NotAvailable`] when no identity arrives in
    /// time.
    pub fn channel(&self) -> Result<ChannelIdentity, ChannelError> {
        self.state.channel().wait()
    }

    /// Asks the driver to start a fresh generation.
    pub fn restart(&self) {
        self.state.lifecycle().post(LifecycleTransition::Restart);
    }

    /// Asks the driver to shut down.
    pub fn quit(&self) {
        self.state.lifecycle().post(LifecycleTransition::Quit);
    }

    /// Removes `subscription`; unknown handles are ignored.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.state.subscriptions().unsubscribe(subscription);
    }
}

impl<Env> ExecutionContext<Env>
where
    Env: Send + Sync + 'static,
{
    /// Subscribes `callback` to `event`.
    ///
    /// The callback runs inside the execution boundary with this context;
    /// its failures are logged and otherwise discarded. Callbacks outliving
    /// their generation are skipped.
    pub fn subscribe<F>(&self, event: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Self, &[Value]) -> Result<(), Failure> + Send + Sync + 'static,
    {
        let detached = DetachedContext::from(self);
        let action: SubscriptionAction = Arc::new(move |arguments: &[Value]| {
            let Some(context) = detached.attach() else {
                debug!(target: CONTEXT_TARGET, "generation gone; subscription skipped");
                return;
            };
            if let Err(diagnostic) = context.run(|ctx| callback(ctx, arguments)) {
                warn!(
                    target: CONTEXT_TARGET,
                    diagnostic = %diagnostic,
                    "subscription callback failed"
                );
            }
        });
        self.state.subscriptions().subscribe(event, action)
    }

    /// Registers `handler` under `descriptor` through the active registration
    /// and publishes the resulting entry in the function map.
    ///
    /// Returns the published entry, or `None` for internal functions.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotRegistering`] outside a stateful plugin.
    pub fn register_function<F>(
        &self,
        descriptor: FunctionDescriptor,
        handler: F,
    ) -> Result<Option<FunctionMapEntry>, PluginError>
    where
        F: Fn(&Self, Vec<Value>) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        let Some(registration) = self.registration() else {
            return Err(PluginError::not_registering(descriptor.name()));
        };
        let shared: Handler<Env> = Arc::new(handler);
        let entry = registration.register(&descriptor, shared);
        if let Some(published) = &entry {
            self.state.functions().insert(published.clone());
        }
        debug!(
            target: CONTEXT_TARGET,
            function = descriptor.name(),
            published = entry.is_some(),
            "function registered"
        );
        Ok(entry)
    }

    /// Registers `handler` under a freshly generated name and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotRegistering`] outside a stateful plugin.
    pub fn register_anonymous<F>(
        &self,
        kind: FunctionKind,
        handler: F,
    ) -> Result<String, PluginError>
    where
        F: Fn(&Self, Vec<Value>) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        let name = self.next_name();
        let descriptor = anonymous_descriptor(name.clone(), kind);
        self.register_function(descriptor, handler)?;
        Ok(name)
    }
}

/// Context captured by long-lived callbacks without keeping the generation
/// alive.
struct DetachedContext<Env> {
    state: Weak<RuntimeState>,
    environment: Arc<Env>,
    registration: Option<Arc<PluginRegistration<Env>>>,
}

impl<Env> DetachedContext<Env> {
    fn attach(&self) -> Option<ExecutionContext<Env>> {
        let state = self.state.upgrade()?;
        Some(ExecutionContext::from_parts(
            state,
            Arc::clone(&self.environment),
            self.registration.clone(),
        ))
    }
}

impl<Env> From<&ExecutionContext<Env>> for DetachedContext<Env> {
    fn from(context: &ExecutionContext<Env>) -> Self {
        Self {
            state: Arc::downgrade(&context.state),
            environment: Arc::clone(&context.environment),
            registration: context.registration.clone(),
        }
    }
}

#[cfg(test)]
mod tests;
