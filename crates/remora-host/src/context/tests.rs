//! Unit tests for the execution context and boundary.

use std::sync::Mutex;
use std::time::Duration;

use remora_config::Config;
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::channel::ChannelIdentity;
use crate::dispatch::{DispatchTarget, FunctionKind};
use crate::lifecycle::Lifecycle;
use crate::plugin::{LocalTable, WorkerQueue};

#[derive(Debug, Default)]
struct Counter {
    hits: Mutex<u32>,
}

fn state() -> Arc<RuntimeState> {
    let config = Config {
        channel_timeout_ms: 10,
        ..Config::default()
    };
    Arc::new(RuntimeState::new(&config, Lifecycle::new()))
}

#[fixture]
fn context() -> ExecutionContext<Counter> {
    ExecutionContext::new(state(), Counter::default())
}

fn registering_context() -> (ExecutionContext<Counter>, LocalTable<Counter>) {
    let (queue, _receiver) = WorkerQueue::new("counter");
    let table = LocalTable::new();
    let registration = PluginRegistration::stateful(queue, table.clone());
    let context = ExecutionContext::from_parts(
        state(),
        Arc::new(Counter::default()),
        Some(Arc::new(registration)),
    );
    (context, table)
}

// ---------------------------------------------------------------------------
// Boundary
// ---------------------------------------------------------------------------

#[rstest]
fn success_is_returned(context: ExecutionContext<Counter>) {
    assert_eq!(context.run(|_| Ok(42)), Ok(42));
}

#[rstest]
fn returned_failure_becomes_diagnostic(context: ExecutionContext<Counter>) {
    let diagnostic = context
        .run(|_| fail::<()>("bad input"))
        .expect_err("failure should surface");
    assert_eq!(diagnostic.origin(), DiagnosticOrigin::Failure);
    assert_eq!(diagnostic.to_string(), "bad input");
}

#[rstest]
fn raised_failure_becomes_diagnostic(context: ExecutionContext<Counter>) {
    let diagnostic = context
        .run(|_| -> Result<(), Failure> { raise(Failure::new("deep failure")) })
        .expect_err("raised failure should surface");
    assert_eq!(diagnostic.fault_kind(), None);
    assert_eq!(diagnostic.message(), "deep failure");
}

#[rstest]
fn boundary_marks_the_thread_while_evaluating(context: ExecutionContext<Counter>) {
    assert!(!super::run::inside_boundary());
    let nested = context.run(|ctx| {
        let inner = ctx.run(|_| Ok(super::run::inside_boundary()));
        Ok((super::run::inside_boundary(), inner))
    });
    assert_eq!(nested, Ok((true, Ok(true))));
    assert!(!super::run::inside_boundary());
}

#[rstest]
fn boundary_mark_is_cleared_after_a_fault(context: ExecutionContext<Counter>) {
    let raised = context.run(|_| -> Result<(), Failure> {
        assert!(super::run::inside_boundary());
        raise(Failure::new("quiet failure"))
    });
    assert!(raised.is_err());
    assert!(!super::run::inside_boundary());

    let faulted = context.run(|_| Ok(divide_by_zero()));
    assert!(faulted.is_err());
    assert!(!super::run::inside_boundary());
}

#[rstest]
fn failure_sources_are_rendered(context: ExecutionContext<Counter>) {
    let diagnostic = context
        .run(|_| -> Result<(), Failure> {
            Err(Failure::with_source(
                "could not load",
                std::io::Error::other("disk unplugged"),
            ))
        })
        .expect_err("failure should surface");
    assert_eq!(diagnostic.message(), "could not load: disk unplugged");
}

#[expect(
    clippy::integer_division,
    clippy::integer_division_remainder_used,
    reason = "the test provokes a division fault"
)]
fn divide(numerator: u32, denominator: u32) -> u32 {
    numerator / denominator
}

#[expect(clippy::indexing_slicing, reason = "the test provokes an index fault")]
fn element(values: &[u32], index: usize) -> u32 {
    values[index]
}

#[expect(clippy::unreachable, reason = "the test provokes an unreachable fault")]
fn exhaust(value: u32) -> u32 {
    match value {
        0 => 0,
        _ => unreachable!("value {value} has no handler"),
    }
}

fn divide_by_zero() -> u32 {
    divide(1, std::hint::black_box(0))
}

fn index_past_end() -> u32 {
    element(&[1, 2, 3], std::hint::black_box(7))
}

fn pending() -> u32 {
    todo!()
}

fn deferred() -> u32 {
    unimplemented!("later")
}

fn unmatched() -> u32 {
    exhaust(std::hint::black_box(3))
}

fn odd() -> u32 {
    panic!("something odd")
}

#[rstest]
#[case::division(divide_by_zero, FaultKind::Arithmetic)]
#[case::index(index_past_end, FaultKind::OutOfBounds)]
#[case::todo(pending, FaultKind::Unimplemented)]
#[case::unimplemented(deferred, FaultKind::Unimplemented)]
#[case::unreachable(unmatched, FaultKind::Unreachable)]
#[case::other(odd, FaultKind::Unknown)]
fn faults_are_classified(
    context: ExecutionContext<Counter>,
    #[case] fault: fn() -> u32,
    #[case] expected: FaultKind,
) {
    let diagnostic = context
        .run(|_| Ok(fault()))
        .expect_err("fault should surface");
    assert_eq!(diagnostic.fault_kind(), Some(expected));
    assert!(diagnostic.to_string().starts_with(expected.label()));
}

#[test]
fn non_text_payloads_are_unknown_faults() {
    let context = ExecutionContext::new(state(), ());
    let diagnostic = context
        .run(|_| -> Result<(), Failure> { std::panic::panic_any(17_u8) })
        .expect_err("fault should surface");
    assert_eq!(diagnostic.fault_kind(), Some(FaultKind::Unknown));
}

#[test]
fn diagnostics_serialise_with_origin() {
    let diagnostic = Diagnostic::fault(FaultKind::OutOfBounds, "index 9");
    let value = serde_json::to_value(&diagnostic).expect("serialise diagnostic");
    assert_eq!(
        value,
        json!({"origin": "fault", "fault": "out_of_bounds", "message": "index 9"})
    );
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

#[rstest]
fn environment_is_shared_by_clones(context: ExecutionContext<Counter>) {
    let clone = context.clone();
    *clone.env().hits.lock().expect("hits lock") += 1;
    assert_eq!(*context.env().hits.lock().expect("hits lock"), 1);
}

#[rstest]
fn with_env_leaves_original_untouched(context: ExecutionContext<Counter>) {
    let seen = context.with_env(String::from("scoped"), |scoped| scoped.env().clone());
    assert_eq!(seen, "scoped");

    let outcome = context.run(|ctx| {
        ctx.with_env(5_u32, |_| -> Result<(), Failure> { panic!("inner fault") })
    });
    assert!(outcome.is_err());
    assert_eq!(*context.env().hits.lock().expect("hits lock"), 0);
}

#[test]
fn with_env_drops_registration() {
    let (registering, _table) = registering_context();
    let registered = registering.with_env((), |scoped| scoped.registration().is_some());
    assert!(!registered);
    assert!(registering.registration().is_some());
}

// ---------------------------------------------------------------------------
// Runtime helpers
// ---------------------------------------------------------------------------

#[rstest]
fn names_are_unique(context: ExecutionContext<Counter>) {
    let first = context.next_name();
    let second = context.next_name();
    assert_ne!(first, second);
}

#[rstest]
fn channel_wait_is_bounded(context: ExecutionContext<Counter>) {
    assert_eq!(
        context.channel(),
        Err(ChannelError::NotAvailable {
            waited: Duration::from_millis(10),
        })
    );
    context
        .state()
        .channel()
        .assign(4)
        .expect("first assignment");
    assert_eq!(context.channel(), Ok(ChannelIdentity::Id(4)));
}

#[rstest]
fn restart_and_quit_post_transitions(context: ExecutionContext<Counter>) {
    context.restart();
    assert_eq!(
        context.state().lifecycle().try_take(),
        Some(LifecycleTransition::Restart)
    );
    context.quit();
    assert_eq!(
        context.state().lifecycle().try_take(),
        Some(LifecycleTransition::Quit)
    );
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

#[rstest]
fn subscription_callbacks_run_with_context(context: ExecutionContext<Counter>) {
    let subscription = context.subscribe("BufEnter", |ctx, arguments| {
        let count = u32::try_from(arguments.len())
            .map_err(|error| Failure::with_source("too many arguments", error))?;
        *ctx.env().hits.lock().expect("hits lock") += count;
        Ok(())
    });

    let delivered = context
        .state()
        .subscriptions()
        .notify("BufEnter", &[json!(1), json!(2)]);

    assert_eq!(delivered, 1);
    assert_eq!(*context.env().hits.lock().expect("hits lock"), 2);

    context.unsubscribe(&subscription);
    assert!(context.state().subscriptions().is_empty());
}

#[rstest]
fn failing_callbacks_do_not_escape(context: ExecutionContext<Counter>) {
    context.subscribe("X", |_, _| fail("callback failed"));
    context.subscribe("X", |_, _| panic!("callback fault"));
    assert_eq!(context.state().subscriptions().notify("X", &[]), 2);
}

// ---------------------------------------------------------------------------
// Dynamic registration
// ---------------------------------------------------------------------------

#[rstest]
fn registration_requires_a_plugin(context: ExecutionContext<Counter>) {
    let error = context
        .register_function(FunctionDescriptor::function("Late"), |_, _| Ok(Value::Null))
        .expect_err("no registration is active");
    assert!(matches!(
        error,
        PluginError::NotRegistering { function } if function == "Late"
    ));
}

#[test]
fn registration_publishes_exposed_functions() {
    let (context, table) = registering_context();
    let entry = context
        .register_function(FunctionDescriptor::command("Late"), |_, _| Ok(json!("late")))
        .expect("registration succeeds")
        .expect("exposed function is published");

    assert!(matches!(
        entry.target(),
        DispatchTarget::Queued(queue) if queue.name() == "counter"
    ));
    assert!(context.state().functions().snapshot().contains("Late"));
    assert!(table.contains("Late"));
}

#[test]
fn internal_registration_stays_local() {
    let (context, table) = registering_context();
    let entry = context
        .register_function(FunctionDescriptor::internal("helper"), |_, _| Ok(Value::Null))
        .expect("registration succeeds");

    assert!(entry.is_none());
    assert!(context.state().functions().snapshot().is_empty());
    assert!(table.contains("helper"));
}

#[test]
fn anonymous_registration_uses_generated_names() {
    let (context, table) = registering_context();
    let first = context
        .register_anonymous(FunctionKind::Autocmd, |_, _| Ok(Value::Null))
        .expect("registration succeeds");
    let second = context
        .register_anonymous(FunctionKind::Function, |_, _| Ok(Value::Null))
        .expect("registration succeeds");

    assert_ne!(first, second);
    assert!(table.contains(&first));
    let map = context.state().functions().snapshot();
    let published = map.get(&first).expect("anonymous function is published");
    assert_eq!(published.descriptor().kind(), FunctionKind::Autocmd);
    assert!(map.contains(&second));
}
