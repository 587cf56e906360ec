//! Supervises host launch sequencing and the generation loop.

use std::sync::Arc;

use tracing::{debug, info};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::generation::Generation;
use super::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::lifecycle::{Lifecycle, LifecycleTransition};
use crate::names::UniqueNames;
use crate::plugin::InstallPlugin;
use crate::thread::ServiceThread;

/// Supplies the plugins installed into each generation.
///
/// Called once per generation so a restart starts from fresh environments.
pub trait PluginSource: Send + Sync {
    /// Plugins for the next generation.
    fn plugins(&self) -> Vec<Box<dyn InstallPlugin>>;
}

impl<F> PluginSource for F
where
    F: Fn() -> Vec<Box<dyn InstallPlugin>> + Send + Sync,
{
    fn plugins(&self) -> Vec<Box<dyn InstallPlugin>> {
        self()
    }
}

/// Collaborators required to run the host.
pub struct LaunchPlan<L, S, P> {
    /// Source of the host configuration.
    pub loader: L,
    /// Observer for lifecycle events.
    pub reporter: Arc<dyn HealthReporter>,
    /// Listener whose completion requests shutdown.
    pub shutdown: S,
    /// Plugins installed into every generation.
    pub plugins: P,
}

/// How a generation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Restart,
    Quit,
    Failed(String),
}

/// Runs the host using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap fails or a generation ends with a
/// failure transition.
pub fn run_host<P>(plugins: P) -> Result<(), LaunchError>
where
    P: PluginSource,
{
    run_host_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal::new(),
        plugins,
    })
}

/// Runs the host with injected collaborators.
///
/// Generations are started one after another until a quit or failure
/// transition arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap fails, a supervision thread cannot
/// be spawned or a generation ends with a failure transition.
pub fn run_host_with<L, S, P>(plan: LaunchPlan<L, S, P>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal + 'static,
    P: PluginSource,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
        plugins,
    } = plan;

    let host = bootstrap_with(&loader, Arc::clone(&reporter))?;
    info!(target: PROCESS_TARGET, "starting host runtime");
    let lifecycle = Lifecycle::new();
    let names = Arc::new(UniqueNames::new());
    let _watcher = ShutdownWatcher::spawn(shutdown, lifecycle.clone())?;

    let mut number = 0_u64;
    loop {
        number = number.saturating_add(1);
        let generation = Generation::launch(
            number,
            host.config(),
            &lifecycle,
            Arc::clone(&names),
            plugins.plugins(),
            Arc::clone(&reporter),
        )?;
        match supervise(generation, &lifecycle, reporter.as_ref()) {
            Outcome::Restart => {
                info!(target: PROCESS_TARGET, generation = number, "restarting host runtime");
            }
            Outcome::Quit => {
                info!(target: PROCESS_TARGET, "shutdown sequence completed");
                return Ok(());
            }
            Outcome::Failed(reason) => return Err(LaunchError::failure(reason)),
        }
    }
}

/// Consumes transitions until one ends `generation`, then tears it down.
fn supervise(
    mut generation: Generation,
    lifecycle: &Lifecycle,
    reporter: &dyn HealthReporter,
) -> Outcome {
    let number = generation.number();
    let outcome = loop {
        let transition = lifecycle.await_transition();
        reporter.transition_received(number, &transition);
        match transition {
            LifecycleTransition::InitSuccess => generation.mark_running(),
            LifecycleTransition::Restart => break Outcome::Restart,
            LifecycleTransition::Quit => break Outcome::Quit,
            LifecycleTransition::Failure(reason) => break Outcome::Failed(reason),
        }
    };
    let drained = generation.shutdown(lifecycle);
    let settled = settle(number, outcome, drained, reporter);
    reporter.generation_stopped(number);
    settled
}

/// Folds transitions drained during teardown into the outcome.
///
/// Only a quit overrides a pending restart; everything else belonged to the
/// generation being torn down.
fn settle(
    number: u64,
    outcome: Outcome,
    drained: Vec<LifecycleTransition>,
    reporter: &dyn HealthReporter,
) -> Outcome {
    drained.into_iter().fold(outcome, |current, transition| {
        reporter.transition_received(number, &transition);
        match (current, transition) {
            (Outcome::Restart, LifecycleTransition::Quit) => Outcome::Quit,
            (kept, ignored) => {
                debug!(
                    target: PROCESS_TARGET,
                    generation = number,
                    transition = ignored.label(),
                    "stale transition discarded"
                );
                kept
            }
        }
    })
}

/// Shutdown listener thread, closed when the driver returns.
struct ShutdownWatcher<S: ShutdownSignal> {
    signal: Arc<S>,
    _thread: ServiceThread,
}

impl<S> ShutdownWatcher<S>
where
    S: ShutdownSignal + 'static,
{
    fn spawn(signal: S, lifecycle: Lifecycle) -> Result<Self, LaunchError> {
        let shared = Arc::new(signal);
        let listener = Arc::clone(&shared);
        let listener_thread = ServiceThread::spawn("remora-signal", move |_| match listener.wait() {
            Ok(()) => lifecycle.post(LifecycleTransition::Quit),
            Err(ShutdownError::Closed) => {
                debug!(target: PROCESS_TARGET, "shutdown listener closed");
            }
            Err(error) => lifecycle.post(LifecycleTransition::failure(error.to_string())),
        })
        .map_err(|source| LaunchError::Spawn {
            thread: "shutdown",
            source,
        })?;
        Ok(Self {
            signal: shared,
            _thread: listener_thread,
        })
    }
}

impl<S: ShutdownSignal> Drop for ShutdownWatcher<S> {
    fn drop(&mut self) {
        self.signal.close();
    }
}
