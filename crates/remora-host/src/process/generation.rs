//! One runtime generation: its state, startup thread and service threads.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use remora_config::Config;

use super::PROCESS_TARGET;
use super::errors::{LaunchError, StartupError};
use crate::dispatch::{Dispatcher, build_map};
use crate::health::HealthReporter;
use crate::lifecycle::{Lifecycle, LifecycleTransition};
use crate::names::UniqueNames;
use crate::plugin::{InstallPlugin, WorkerHandle};
use crate::state::RuntimeState;
use crate::thread::POLL_INTERVAL;

/// Threads serving a generation once startup has finished.
#[derive(Debug)]
struct Services {
    dispatcher: Dispatcher,
    workers: Vec<WorkerHandle>,
}

impl Services {
    fn stop(&self) {
        self.dispatcher.shutdown();
        for worker in &self.workers {
            worker.shutdown();
        }
    }

    fn is_finished(&self) -> bool {
        self.dispatcher.is_finished() && self.workers.iter().all(WorkerHandle::is_finished)
    }

    fn join(self, generation: u64) {
        if let Err(error) = self.dispatcher.join() {
            warn!(target: PROCESS_TARGET, generation, error = %error, "dispatcher ended badly");
        }
        for worker in self.workers {
            if let Err(error) = worker.join() {
                warn!(target: PROCESS_TARGET, generation, error = %error, "worker ended badly");
            }
        }
    }
}

/// A runtime generation owned by the driver.
#[derive(Debug)]
pub(crate) struct Generation {
    number: u64,
    state: Arc<RuntimeState>,
    startup: Option<JoinHandle<Option<Services>>>,
    services: Option<Services>,
}

impl Generation {
    /// Builds a fresh state around the driver's name counter and installs
    /// `plugins` on a startup thread.
    ///
    /// The startup thread posts [`LifecycleTransition::InitSuccess`] once the
    /// function map is published and the dispatcher runs, or a failure
    /// transition naming what went wrong.
    pub(crate) fn launch(
        number: u64,
        config: &Config,
        lifecycle: &Lifecycle,
        names: Arc<UniqueNames>,
        plugins: Vec<Box<dyn InstallPlugin>>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<Self, LaunchError> {
        let state = Arc::new(RuntimeState::with_names(config, lifecycle.clone(), names));
        let startup_state = Arc::clone(&state);
        let startup = thread::Builder::new()
            .name(format!("remora-startup-{number}"))
            .spawn(move || {
                match start_services(&startup_state, plugins, reporter.as_ref()) {
                    Ok(services) => {
                        startup_state
                            .lifecycle()
                            .post(LifecycleTransition::InitSuccess);
                        Some(services)
                    }
                    Err(error) => {
                        warn!(
                            target: PROCESS_TARGET,
                            generation = number,
                            error = %error,
                            "generation startup failed"
                        );
                        startup_state
                            .lifecycle()
                            .post(LifecycleTransition::failure(error.to_string()));
                        None
                    }
                }
            })
            .map_err(|source| LaunchError::Spawn {
                thread: "startup",
                source,
            })?;
        Ok(Self {
            number,
            state,
            startup: Some(startup),
            services: None,
        })
    }

    /// Generation number, starting at one.
    pub(crate) const fn number(&self) -> u64 {
        self.number
    }

    /// Collects the services once startup has reported success.
    ///
    /// The startup thread posts its transition as its last step, so the join
    /// returns promptly.
    pub(crate) fn mark_running(&mut self) {
        let Some(startup) = self.startup.take() else {
            return;
        };
        match startup.join() {
            Ok(services) => self.services = services,
            Err(_) => warn!(
                target: PROCESS_TARGET,
                generation = self.number,
                "startup thread panicked"
            ),
        }
    }

    /// Stops every thread of the generation and waits for them.
    ///
    /// Threads may be blocked posting a transition while they wind down, so
    /// the lifecycle is drained until they finish. Drained transitions are
    /// returned in post order.
    pub(crate) fn shutdown(self, lifecycle: &Lifecycle) -> Vec<LifecycleTransition> {
        let Self {
            number,
            state,
            startup,
            mut services,
        } = self;
        let mut drained = Vec::new();

        if let Some(handle) = startup {
            drain_until(lifecycle, &mut drained, || handle.is_finished());
            match handle.join() {
                Ok(started) => services = started,
                Err(_) => warn!(
                    target: PROCESS_TARGET,
                    generation = number,
                    "startup thread panicked"
                ),
            }
        }

        if let Some(running) = services {
            running.stop();
            drain_until(lifecycle, &mut drained, || running.is_finished());
            running.join(number);
        }

        debug!(
            target: PROCESS_TARGET,
            generation = number,
            drained = drained.len(),
            pending_requests = state.requests().len(),
            "generation stopped"
        );
        drained
    }
}

fn start_services(
    state: &Arc<RuntimeState>,
    plugins: Vec<Box<dyn InstallPlugin>>,
    reporter: &dyn HealthReporter,
) -> Result<Services, StartupError> {
    let mut entries = Vec::new();
    let mut workers = Vec::new();
    for plugin in plugins {
        let plugin_name = plugin.name().to_owned();
        let installed = match plugin.install(state) {
            Ok(installed) => installed,
            Err(source) => {
                stop_workers(workers);
                return Err(StartupError::Plugin {
                    plugin: plugin_name,
                    source,
                });
            }
        };
        reporter.plugin_installed(installed.name(), installed.entries().len());
        let (published, worker) = installed.into_parts();
        entries.extend(published);
        workers.extend(worker);
    }

    state.functions().replace(build_map(entries));
    match Dispatcher::start(Arc::clone(state)) {
        Ok(dispatcher) => Ok(Services {
            dispatcher,
            workers,
        }),
        Err(source) => {
            stop_workers(workers);
            Err(StartupError::Dispatcher { source })
        }
    }
}

/// Stops workers of plugins installed before startup failed.
fn stop_workers(workers: Vec<WorkerHandle>) {
    for worker in &workers {
        worker.shutdown();
    }
    for worker in workers {
        if let Err(error) = worker.join() {
            warn!(target: PROCESS_TARGET, error = %error, "worker ended badly");
        }
    }
}

fn drain_until(
    lifecycle: &Lifecycle,
    drained: &mut Vec<LifecycleTransition>,
    finished: impl Fn() -> bool,
) {
    while !finished() {
        drained.extend(lifecycle.await_timeout(POLL_INTERVAL));
    }
    drained.extend(lifecycle.try_take());
}
