//! Process-wide `tracing` subscriber for the host.
//!
//! The host runs its dispatcher, plugin workers, startup threads and signal
//! listener on named threads, so every record carries the thread name next to
//! its target. Output goes to stderr; stdout stays free for a transport.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, time::UtcTime};

use remora_config::{Config, LogFormat};

/// Format installed by the first successful [`initialise`].
static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Proof that the global subscriber is in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Output format of the installed subscriber.
    ///
    /// This is the format of the first configuration that reached
    /// [`initialise`], not necessarily the one passed by a later call.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression does not parse.
    #[error("invalid log filter '{directives}': {reason}")]
    Filter {
        /// Filter expression as configured.
        directives: String,
        /// Parser message.
        reason: String,
    },
    /// Another global subscriber was installed first.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the global subscriber described by `config` once per process.
///
/// Later calls leave the subscriber alone and report the format already in
/// use.
///
/// ```no_run
/// use remora_config::Config;
///
/// let handle = remora_host::initialise_telemetry(&Config::default())?;
/// tracing::info!(format = %handle.format(), "telemetry ready");
/// # Ok::<(), remora_host::TelemetryError>(())
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter does not parse or a subscriber
/// was installed outside this function.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED_FORMAT
        .get_or_try_init(|| -> Result<LogFormat, TelemetryError> {
            let subscriber = build_subscriber(config)?;
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(config.log_format())
        })
        .map(|format| TelemetryHandle { format: *format })
}

fn parse_filter(directives: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directives).map_err(|error| TelemetryError::Filter {
        directives: directives.to_owned(),
        reason: error.to_string(),
    })
}

type BoxedSubscriber = Box<dyn Subscriber + Send + Sync>;

fn build_subscriber(config: &Config) -> Result<BoxedSubscriber, TelemetryError> {
    let filter = parse_filter(config.log_filter())?;
    let base = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(!config.log_format().is_structured() && io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339());

    Ok(match config.log_format() {
        LogFormat::Json => Box::new(base.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(base.compact().finish()),
    })
}
