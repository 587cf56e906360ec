//! The execution boundary.
//!
//! [`run`] evaluates a computation and converts every way it can go wrong into
//! a [`Diagnostic`]. Deliberate failures arrive either as an `Err(Failure)`
//! return or as a [`Failure`] raised with [`raise`]; every other panic is
//! classified by its message into a [`FaultKind`]. Nothing escapes to the
//! caller's thread.
//!
//! A process abort is not a panic and cannot be caught here.
//!
//! Panics unwinding inside the boundary are kept away from the default panic
//! hook; any other panic still reaches the hook that was installed before.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};

use once_cell::sync::OnceCell;
use tracing::{debug, error};

use super::failure::{Diagnostic, Failure, FaultKind};
use super::{CONTEXT_TARGET, ExecutionContext};

const ARITHMETIC_MARKERS: &[&str] = &[
    "attempt to divide by zero",
    "remainder with a divisor of zero",
    "with overflow",
];

const OUT_OF_BOUNDS_MARKERS: &[&str] = &[
    "index out of bounds",
    "out of range for slice",
    "out of range for str",
    "byte index",
    "range end index",
    "range start index",
    "slice index starts at",
];

const UNIMPLEMENTED_MARKERS: &[&str] = &["not implemented", "not yet implemented"];

const UNREACHABLE_MARKERS: &[&str] = &["entered unreachable code"];

static PANIC_HOOK: OnceCell<()> = OnceCell::new();

thread_local! {
    static BOUNDARY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as evaluating inside [`run`] until dropped.
struct BoundaryGuard;

impl BoundaryGuard {
    fn enter() -> Self {
        BOUNDARY_DEPTH.with(|depth| depth.set(depth.get().saturating_add(1)));
        Self
    }
}

impl Drop for BoundaryGuard {
    fn drop(&mut self) {
        BOUNDARY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Whether the current thread is evaluating inside [`run`].
pub(crate) fn inside_boundary() -> bool {
    BOUNDARY_DEPTH.with(Cell::get) > 0
}

/// Chains a hook that silences panics caught by [`run`].
fn install_panic_hook() {
    PANIC_HOOK.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            if inside_boundary() {
                if let Some(location) = info.location() {
                    debug!(
                        target: CONTEXT_TARGET,
                        file = location.file(),
                        line = location.line(),
                        "panic unwinding into execution boundary"
                    );
                }
            } else {
                previous(info);
            }
        }));
    });
}

/// Evaluates `computation` against `context` and captures every failure.
///
/// The computation's result is produced entirely inside the boundary, so a
/// returned `Ok` value carries no deferred failure.
///
/// # Errors
///
/// Returns a [`Diagnostic`] describing the [`Failure`] or fault that ended the
/// computation.
pub fn run<Env, T, F>(context: &ExecutionContext<Env>, computation: F) -> Result<T, Diagnostic>
where
    F: FnOnce(&ExecutionContext<Env>) -> Result<T, Failure>,
{
    install_panic_hook();
    let outcome = {
        let _guard = BoundaryGuard::enter();
        panic::catch_unwind(AssertUnwindSafe(|| computation(context)))
    };
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(failure)) => Err(Diagnostic::from_failure(&failure)),
        Err(payload) => Err(diagnose_panic(payload.as_ref())),
    }
}

/// Ends the current computation with `failure` from any call depth.
///
/// The enclosing [`run`] reports it exactly as if it had been returned.
pub fn raise(failure: Failure) -> ! {
    panic::panic_any(failure)
}

/// Converts a panic payload into a diagnostic.
pub(crate) fn diagnose_panic(payload: &(dyn Any + Send)) -> Diagnostic {
    if let Some(failure) = payload.downcast_ref::<Failure>() {
        return Diagnostic::from_failure(failure);
    }
    let message = panic_message(payload).unwrap_or("panic with a non-text payload");
    let kind = classify(message);
    if kind == FaultKind::Unknown {
        error!(
            target: CONTEXT_TARGET,
            fault = %kind,
            message,
            "unhandled fault caught at execution boundary"
        );
    }
    Diagnostic::fault(kind, message)
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}

/// Maps a panic message onto a fault category.
pub(crate) fn classify(message: &str) -> FaultKind {
    let matches_any = |markers: &[&str]| markers.iter().any(|marker| message.contains(marker));
    if matches_any(ARITHMETIC_MARKERS) {
        FaultKind::Arithmetic
    } else if matches_any(OUT_OF_BOUNDS_MARKERS) {
        FaultKind::OutOfBounds
    } else if matches_any(UNIMPLEMENTED_MARKERS) {
        FaultKind::Unimplemented
    } else if matches_any(UNREACHABLE_MARKERS) {
        FaultKind::Unreachable
    } else {
        FaultKind::Unknown
    }
}
