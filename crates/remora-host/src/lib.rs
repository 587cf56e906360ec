//! Runtime core for the Remora plugin host.
//!
//! The host runs many independently authored plugins in one process and
//! routes editor calls and events to them. This crate provides the pieces
//! that have to hold together under concurrency: the per-generation
//! [`RuntimeState`], the [`ExecutionContext`] and its fault boundary, the
//! function dispatch map with its direct and queued call shapes, the
//! subscription registry, the lifecycle supervisor and the unique name
//! generator.
//!
//! ## Generations
//!
//! The driver started by [`run_host`] loads configuration, initialises
//! structured telemetry and then runs one generation after another. Each
//! generation gets a fresh [`RuntimeState`], installs its plugins on a startup
//! thread and serves calls until a [`LifecycleTransition`] ends it. A
//! `Restart` starts the next generation; `Quit` and `Failure` end the process.
//!
//! ## Failure isolation
//!
//! Handler code always runs through [`context::run`]. Failures raised by
//! plugin authors and faults such as out-of-bounds access are turned into a
//! [`Diagnostic`] instead of unwinding into the dispatcher or a worker, so a
//! faulty plugin cannot take the host down with it.

mod bootstrap;
mod cell;
pub mod channel;
pub mod context;
pub mod dispatch;
mod health;
pub mod lifecycle;
pub mod names;
pub mod plugin;
mod process;
pub mod state;
pub mod subscriptions;
mod telemetry;
mod thread;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Host, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use channel::{ChannelCell, ChannelError, ChannelIdentity};
pub use context::{Diagnostic, ExecutionContext, Failure, FaultKind, fail, raise};
pub use dispatch::{DispatchError, FunctionDescriptor, FunctionKind, Request};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use lifecycle::{Lifecycle, LifecycleTransition};
pub use plugin::{Export, InstallPlugin, Plugin, PluginError};
pub use process::{
    LaunchError, LaunchPlan, PluginSource, ShutdownError, ShutdownSignal, StartupError,
    SystemShutdownSignal, run_host, run_host_with,
};
pub use state::RuntimeState;
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};
pub use thread::ThreadPanic;

#[cfg(test)]
mod tests;
