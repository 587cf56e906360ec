//! Worker threads serving stateful plugins.
//!
//! A worker drains its plugin's queue, resolves each request against the
//! plugin's [`LocalTable`] and runs the handler inside the execution boundary
//! with the plugin's context, registration included.

use crossbeam_channel::Receiver;
use tracing::{debug, info};

use super::errors::PluginError;
use super::registration::LocalTable;
use super::PLUGIN_TARGET;
use crate::context::ExecutionContext;
use crate::dispatch::{DispatchError, Request};
use crate::thread::{ServiceThread, drain_queue};

/// Handle to a running plugin worker.
#[derive(Debug)]
pub struct WorkerHandle {
    plugin: String,
    thread: ServiceThread,
}

impl WorkerHandle {
    /// Spawns the worker for `plugin`.
    pub(crate) fn spawn<Env>(
        plugin: &str,
        context: ExecutionContext<Env>,
        table: LocalTable<Env>,
        receiver: Receiver<Request>,
    ) -> Result<Self, PluginError>
    where
        Env: Send + Sync + 'static,
    {
        let name = plugin.to_owned();
        let thread_name = format!("remora-worker-{plugin}");
        let thread = ServiceThread::spawn(thread_name, move |shutdown| {
            info!(target: PLUGIN_TARGET, plugin = %name, "worker active");
            drain_queue(&receiver, shutdown, |request| serve(&context, &table, request));
            debug!(target: PLUGIN_TARGET, plugin = %name, "worker stopped");
        })
        .map_err(|error| PluginError::worker_spawn(plugin, error))?;
        Ok(Self {
            plugin: plugin.to_owned(),
            thread,
        })
    }

    /// Name of the plugin the worker serves.
    #[must_use]
    pub fn plugin(&self) -> &str {
        self.plugin.as_str()
    }

    /// Asks the worker to stop after the request in hand.
    pub fn shutdown(&self) {
        self.thread.shutdown();
    }

    /// Returns `true` once the worker has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the worker to exit.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::WorkerPanicked`] if the worker loop panicked.
    pub fn join(self) -> Result<(), PluginError> {
        let plugin = self.plugin;
        self.thread
            .join()
            .map_err(|source| PluginError::WorkerPanicked { plugin, source })
    }
}

fn serve<Env>(context: &ExecutionContext<Env>, table: &LocalTable<Env>, request: Request) {
    let Some(handler) = table.get(request.method()) else {
        debug!(
            target: PLUGIN_TARGET,
            method = request.method(),
            "method missing from local table"
        );
        let error = DispatchError::unknown_function(request.method());
        request.respond(Err(error));
        return;
    };
    let (arguments, responder) = request.into_call();
    let outcome = context.run(|ctx| handler(ctx, arguments));
    responder.respond(outcome.map_err(DispatchError::from));
}
