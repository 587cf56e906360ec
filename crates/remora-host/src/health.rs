//! Structured health reporting for host lifecycle events.

use std::sync::Arc;

use remora_config::Config;

use crate::bootstrap::BootstrapError;
use crate::lifecycle::LifecycleTransition;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after a plugin is installed into a generation.
    fn plugin_installed(&self, plugin: &str, exported: usize);

    /// Invoked when the driver consumes a lifecycle transition.
    fn transition_received(&self, generation: u64, transition: &LifecycleTransition);

    /// Invoked once a generation has been torn down.
    fn generation_stopped(&self, generation: u64);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn plugin_installed(&self, plugin: &str, exported: usize) {
        (**self).plugin_installed(plugin, exported);
    }

    fn transition_received(&self, generation: u64, transition: &LifecycleTransition) {
        (**self).transition_received(generation, transition);
    }

    fn generation_stopped(&self, generation: u64) {
        (**self).generation_stopped(generation);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting host bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            log_filter = %config.log_filter(),
            log_format = config.log_format().as_str(),
            channel_name = ?config.channel_name(),
            "host bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "host bootstrap failed"
        );
    }

    fn plugin_installed(&self, plugin: &str, exported: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "plugin_installed",
            plugin,
            exported,
            "plugin installed"
        );
    }

    fn transition_received(&self, generation: u64, transition: &LifecycleTransition) {
        match transition {
            LifecycleTransition::Failure(reason) => tracing::error!(
                target: HEALTH_TARGET,
                event = "transition_received",
                generation,
                transition = transition.label(),
                reason = %reason,
                "generation failed"
            ),
            _ => tracing::info!(
                target: HEALTH_TARGET,
                event = "transition_received",
                generation,
                transition = transition.label(),
                "lifecycle transition received"
            ),
        }
    }

    fn generation_stopped(&self, generation: u64) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "generation_stopped",
            generation,
            "generation stopped"
        );
    }
}
