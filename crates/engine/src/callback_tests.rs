// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::logger::TimingLogger;
use crate::registrar::ModuleRegistry;
use crate::test_support::{test_env, TestEnv};
use relay_adapters::ReportLevel;
use relay_core::test_support::EventBuilder;
use relay_core::{AttributeFilter, EventFilter};

fn single(f: impl Fn() -> CallbackResult + Send + Sync + 'static) -> CallbackKind {
    CallbackKind::Single(Arc::new(move |_upstream, _logger, _event, _args| f()))
}

fn make_callback(env: &TestEnv, stop_on_error: bool, kind: CallbackKind) -> Callback {
    Callback::new(
        "on_change",
        kind,
        Arc::new(env.upstream.clone()),
        PluginLogger::new("audit", None),
        EventFilter::match_all(),
        serde_json::Value::Null,
        stop_on_error,
        env.env.clone(),
    )
}

#[test]
fn success_keeps_callback_active() {
    let env = test_env(ModuleRegistry::new());
    let mut callback = make_callback(&env, true, single(|| Ok(())));

    let outcome = callback.process(&EventBuilder::new(1).build());
    assert_eq!(outcome, DispatchOutcome::Continue);
    assert!(callback.is_active());
    assert!(env.sink.reports().is_empty());
}

#[test]
fn error_without_stop_on_error_is_contained() {
    let env = test_env(ModuleRegistry::new());
    let mut callback = make_callback(&env, false, single(|| Err("boom".into())));

    let outcome = callback.process(&EventBuilder::new(7).build());
    assert_eq!(outcome, DispatchOutcome::Continue);
    assert!(callback.is_active());

    let reports = env.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].plugin_name, "audit");
    assert_eq!(reports[0].event_id, "7");
    assert_eq!(reports[0].level, ReportLevel::Warning);
    assert!(!reports[0].stop_on_error);
    assert!(reports[0].message.contains("boom"));
}

#[test]
fn error_with_stop_on_error_deactivates_callback_only() {
    let env = test_env(ModuleRegistry::new());
    let mut callback = make_callback(&env, true, single(|| Err("boom".into())));

    let outcome = callback.process(&EventBuilder::new(20).build());
    assert_eq!(outcome, DispatchOutcome::Continue);
    assert!(!callback.is_active());

    let reports = env.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].level, ReportLevel::Error);
    assert!(reports[0].stop_on_error);
}

#[test]
fn panic_is_plugin_fatal() {
    let env = test_env(ModuleRegistry::new());
    let mut callback = make_callback(&env, false, single(|| panic!("kaboom")));

    let outcome = callback.process(&EventBuilder::new(3).build());
    assert_eq!(outcome, DispatchOutcome::PluginFatal);
    assert!(!callback.is_active());

    let reports = env.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].level, ReportLevel::Error);
    assert!(reports[0].message.contains("kaboom"));
}

#[test]
fn filter_gates_can_process() {
    let env = test_env(ModuleRegistry::new());
    let mut callback = make_callback(&env, false, single(|| Ok(())));
    callback.filter = EventFilter::match_all()
        .with_event_type("Task_Change", AttributeFilter::from_names(["status"]));

    assert!(callback.can_process(
        &EventBuilder::new(1)
            .event_type("Task_Change")
            .attribute("status")
            .build()
    ));
    assert!(!callback.can_process(&EventBuilder::new(1).event_type("Shot_New").build()));
}

#[test]
fn session_uuid_is_forwarded_when_enabled() {
    let mut env = test_env(ModuleRegistry::new());
    env.env.use_session_uuid = true;
    let mut callback = make_callback(&env, false, single(|| Ok(())));

    callback.process(&EventBuilder::new(1).session_uuid("abc-123").build());
    callback.process(&EventBuilder::new(2).build());

    assert_eq!(
        env.upstream.session_uuids(),
        vec![Some("abc-123".to_string()), None]
    );
}

#[test]
fn session_uuid_is_not_forwarded_by_default() {
    let env = test_env(ModuleRegistry::new());
    let mut callback = make_callback(&env, false, single(|| Ok(())));
    callback.process(&EventBuilder::new(1).session_uuid("abc-123").build());
    assert!(env.upstream.session_uuids().is_empty());
}

#[test]
fn timing_record_is_written_per_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relayd.log.timing");
    let mut env = test_env(ModuleRegistry::new());
    env.env.timing = Some(TimingLogger::new(path.clone()));

    let mut callback = make_callback(&env, false, single(|| Ok(())));
    callback.process(&EventBuilder::new(11).build());

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("event_id=11"));
    assert!(contents.contains("callback=audit.on_change"));
    assert!(contents.contains("error=false"));
}

#[test]
fn batch_dispatch_reports_all_ids_and_times_each_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relayd.log.timing");
    let mut env = test_env(ModuleRegistry::new());
    env.env.timing = Some(TimingLogger::new(path.clone()));

    let kind = CallbackKind::Batch(Arc::new(|_upstream, _logger, _events, _args| {
        Err("batch boom".into())
    }));
    let mut callback = make_callback(&env, true, kind);

    let events = [EventBuilder::new(5).build(), EventBuilder::new(6).build()];
    let outcome = callback.process_batch(&events);
    assert_eq!(outcome, DispatchOutcome::Continue);
    assert!(!callback.is_active());

    let reports = env.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].event_id, "5, 6");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 2);
    assert!(contents.contains("event_id=5"));
    assert!(contents.contains("event_id=6"));
    assert!(contents.contains("error=true"));
}

#[test]
fn batch_session_uuid_uses_last_event() {
    let mut env = test_env(ModuleRegistry::new());
    env.env.use_session_uuid = true;
    let kind = CallbackKind::Batch(Arc::new(|_upstream, _logger, _events, _args| Ok(())));
    let mut callback = make_callback(&env, false, kind);

    let events = [
        EventBuilder::new(1).session_uuid("first").build(),
        EventBuilder::new(2).session_uuid("second").build(),
    ];
    callback.process_batch(&events);
    assert_eq!(env.upstream.session_uuids(), vec![Some("second".to_string())]);
}

#[test]
fn kind_mismatch_is_skipped_without_failing() {
    let env = test_env(ModuleRegistry::new());
    let mut callback = make_callback(&env, true, single(|| Ok(())));

    let events = [EventBuilder::new(1).build()];
    assert_eq!(callback.process_batch(&events), DispatchOutcome::Continue);
    assert!(callback.is_active());
    assert!(env.sink.reports().is_empty());
}
