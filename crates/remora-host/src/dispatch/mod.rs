//! Routing of inbound calls to plugin handlers.
//!
//! The function map associates each exposed method name with a target.
//! Direct targets run on the dispatching thread; queued targets are handed to
//! the owning stateful plugin's worker. Events bypass the map and fan out to
//! the subscription registry.
//!
//! ## Flow
//!
//! ```text
//! transport ──Inbound──▶ request queue ──▶ dispatcher
//!                                            ├─ Call ─▶ map ─┬─ Direct ─▶ handler
//!                                            │               └─ Queued ─▶ worker
//!                                            └─ Event ─▶ subscribers
//! ```

mod descriptor;
mod dispatcher;
mod errors;
mod map;
mod request;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

pub use self::descriptor::{FunctionDescriptor, FunctionKind, Synchronous, Visibility};
pub use self::dispatcher::{Dispatcher, dispatch, handle_inbound};
pub use self::errors::DispatchError;
pub use self::map::{
    DirectHandler, DispatchTarget, FunctionMap, FunctionMapEntry, FunctionTable, build_map,
};
pub use self::request::{Event, Inbound, PendingReply, Reply, Request};
