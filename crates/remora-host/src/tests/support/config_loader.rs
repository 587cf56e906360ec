//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::OrthoError;
use remora_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loader that yields defaults with a short channel wait.
#[derive(Debug, Default)]
pub struct TestConfigLoader;

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            channel_timeout_ms: 50,
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
#[derive(Debug, Default)]
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("remora-host"),
            OsString::from("--channel-timeout-ms"),
            OsString::from("soon"),
        ];
        Config::load_from_iter(args)
    }
}
