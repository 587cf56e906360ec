use std::time::Duration;

/// Default log filter expression used by the host.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default bounded wait applied when reading the channel identity.
pub const DEFAULT_CHANNEL_TIMEOUT_MS: u64 = 10_000;

/// Default log filter expression used by the host.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the host.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default channel wait in milliseconds, used by serde.
pub const fn default_channel_timeout_ms() -> u64 {
    DEFAULT_CHANNEL_TIMEOUT_MS
}

/// Default channel wait as a [`Duration`].
pub const fn default_channel_timeout() -> Duration {
    Duration::from_millis(DEFAULT_CHANNEL_TIMEOUT_MS)
}
