//! Test double for [`HealthReporter`] that records structured events for
//! assertions.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use remora_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::lifecycle::LifecycleTransition;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// A plugin was installed.
    PluginInstalled { plugin: String, exported: usize },
    /// The driver consumed a transition.
    TransitionReceived {
        generation: u64,
        transition: LifecycleTransition,
    },
    /// A generation was torn down.
    GenerationStopped(u64),
}

impl HealthEvent {
    /// Shorthand for a consumed transition.
    pub const fn transition(generation: u64, transition: LifecycleTransition) -> Self {
        Self::TransitionReceived {
            generation,
            transition,
        }
    }
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }

    /// Polls until `event` has been recorded.
    pub fn wait_for(&self, event: &HealthEvent, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.events().contains(event) {
                return true;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        self.events().contains(event)
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn plugin_installed(&self, plugin: &str, exported: usize) {
        self.record(HealthEvent::PluginInstalled {
            plugin: plugin.to_owned(),
            exported,
        });
    }

    fn transition_received(&self, generation: u64, transition: &LifecycleTransition) {
        self.record(HealthEvent::transition(generation, transition.clone()));
    }

    fn generation_stopped(&self, generation: u64) {
        self.record(HealthEvent::GenerationStopped(generation));
    }
}
