//! Shared configuration for the remora plugin host.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults are
//! overridden by a configuration file, then by `REMORA_*` environment
//! variables, and finally by command-line flags. Both the `remora-host` binary
//! and applications embedding the host runtime load the same [`Config`] so
//! logging and channel-identity behaviour stay consistent.

mod defaults;
mod logging;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CHANNEL_TIMEOUT_MS, DEFAULT_LOG_FILTER, default_channel_timeout,
    default_channel_timeout_ms, default_log_filter, default_log_filter_string,
    default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "REMORA")]
pub struct Config {
    /// Tracing filter expression applied to the global subscriber.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Output format used by the global subscriber.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
    /// Channel identity known before the editor handshake completes.
    #[serde(default)]
    pub channel_name: Option<String>,
    /// Upper bound, in milliseconds, for blocking channel-identity reads.
    #[serde(default = "defaults::default_channel_timeout_ms")]
    pub channel_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            channel_name: None,
            channel_timeout_ms: DEFAULT_CHANNEL_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments, environment and
    /// configuration files.
    ///
    /// # Errors
    ///
    /// Returns the layering error when a source cannot be parsed.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration using `args` in place of the process arguments.
    ///
    /// The first item is the program name.
    ///
    /// # Errors
    ///
    /// Returns the layering error when a source cannot be parsed.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Returns the tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the pre-set channel name, if any.
    #[must_use]
    pub fn channel_name(&self) -> Option<&str> {
        self.channel_name.as_deref()
    }

    /// Returns the bounded wait applied to channel-identity reads.
    #[must_use]
    pub const fn channel_timeout(&self) -> Duration {
        Duration::from_millis(self.channel_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.log_filter(), default_log_filter());
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.channel_name(), None);
        assert_eq!(config.channel_timeout(), default_channel_timeout());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_json::from_str("{}").expect("deserialise empty config");
        assert_eq!(config, Config::default());
    }

    #[rstest]
    #[case::named(r#"{"channel_name":"remora"}"#, Some("remora"))]
    #[case::unnamed(r#"{"log_filter":"debug"}"#, None)]
    fn deserialises_channel_name(#[case] json: &str, #[case] expected: Option<&str>) {
        let config: Config = serde_json::from_str(json).expect("deserialise config");
        assert_eq!(config.channel_name(), expected);
    }

    #[test]
    fn channel_timeout_reflects_millis() {
        let config = Config {
            channel_timeout_ms: 250,
            ..Config::default()
        };
        assert_eq!(config.channel_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn cli_flags_override_defaults() {
        let config = Config::load_from_iter([
            "remora-host",
            "--log-filter",
            "debug",
            "--channel-timeout-ms",
            "75",
        ])
        .expect("flags parse");
        assert_eq!(config.log_filter(), "debug");
        assert_eq!(config.channel_timeout(), Duration::from_millis(75));
    }

    #[test]
    fn malformed_flags_are_rejected() {
        let outcome = Config::load_from_iter(["remora-host", "--channel-timeout-ms", "soon"]);
        assert!(outcome.is_err());
    }

    #[test]
    fn log_format_deserialises_snake_case() {
        let config: Config =
            serde_json::from_str(r#"{"log_format":"compact"}"#).expect("deserialise config");
        assert_eq!(config.log_format(), LogFormat::Compact);
    }
}
