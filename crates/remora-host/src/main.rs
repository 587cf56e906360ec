//! Entry point for the `remora-host` binary.

use std::process::ExitCode;

use remora_host::{InstallPlugin, run_host};

const MAIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::main");

fn no_plugins() -> Vec<Box<dyn InstallPlugin>> {
    Vec::new()
}

fn main() -> ExitCode {
    match run_host(no_plugins) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: MAIN_TARGET, error = %error, "host exited with an error");
            ExitCode::FAILURE
        }
    }
}
