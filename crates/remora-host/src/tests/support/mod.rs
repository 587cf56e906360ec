//! Test harness utilities shared by the behaviour suites.

mod config_loader;
mod reporter;
mod shutdown;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use shutdown::{FailingShutdown, manual_shutdown};
