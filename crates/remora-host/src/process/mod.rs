//! Host process supervision: the generation loop, shutdown signals and launch
//! sequencing.
//!
//! The driver owns one [`Lifecycle`](crate::lifecycle::Lifecycle) for the
//! whole process. Each generation gets a fresh runtime state, installs its
//! plugins on a startup thread and then serves calls until a transition ends
//! it.

mod errors;
mod generation;
mod launch;
mod shutdown;

pub use self::errors::{LaunchError, StartupError};
pub use self::launch::{LaunchPlan, PluginSource, run_host, run_host_with};
pub use self::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

/// Tracing target for process supervision.
pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
