// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fault isolation at the callback boundary.

use crate::prelude::*;
use relay_adapters::ReportLevel;
use relay_engine::test_support::ScriptedCallback;

#[test]
fn stop_on_error_disables_the_callback_but_not_its_neighbours() {
    let callbacks = vec![
        ScriptedCallback::named("brittle").stop_on_error().fail_on(20),
        ScriptedCallback::named("steady"),
    ];
    let mut h = Harness::new(callbacks);
    h.push(19);
    h.engine.start().unwrap();

    h.push(20);
    h.engine.poll_once().unwrap();

    // The failing callback is disabled, the event still reaches the
    // next callback, and the cursor advances.
    assert_eq!(h.journal.ids_for("audit", "brittle"), vec![20]);
    assert_eq!(h.journal.ids_for("audit", "steady"), vec![20]);
    assert_eq!(h.last_id("audit.toml"), Some(20));

    h.push(21);
    h.engine.poll_once().unwrap();
    assert_eq!(h.journal.ids_for("audit", "brittle"), vec![20]);
    assert_eq!(h.journal.ids_for("audit", "steady"), vec![20, 21]);

    let reports = h.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].plugin_name, "audit");
    assert_eq!(reports[0].event_id, "20");
    assert!(reports[0].stop_on_error);
    assert_eq!(reports[0].level, ReportLevel::Error);
}

#[test]
fn failures_without_stop_on_error_never_disable_anything() {
    let callbacks = vec![
        ScriptedCallback::named("flaky").fail_on(20),
        ScriptedCallback::named("steady"),
    ];
    let mut h = Harness::with_manifests(callbacks, &["first.toml", "second.toml"]);
    h.push(19);
    h.engine.start().unwrap();

    h.push(20);
    h.push(21);
    h.engine.poll_once().unwrap();

    // Both callbacks in both plugins keep receiving events.
    for plugin in ["first", "second"] {
        assert_eq!(h.journal.ids_for(plugin, "flaky"), vec![20, 21]);
        assert_eq!(h.journal.ids_for(plugin, "steady"), vec![20, 21]);
    }
    let reports = h.sink.reports();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.level == ReportLevel::Warning));
}

#[test]
fn a_panicking_callback_takes_down_only_its_plugin() {
    let mut h = Harness::with_plugins(vec![
        (
            "exploding.toml".to_string(),
            vec![ScriptedCallback::named("record").panic_on(20)],
        ),
        ("steady.toml".to_string(), recording()),
    ]);
    h.push(19);
    h.engine.start().unwrap();

    h.push(20);
    h.engine.poll_once().unwrap();

    // Only the panicking plugin's record stops; the other plugin keeps
    // processing...
    assert_eq!(h.dispatched("steady"), vec![20]);
    assert_eq!(h.last_id("steady.toml"), Some(20));
    // ...while the panicked plugin froze its cursor at the event.
    assert_eq!(h.last_id("exploding.toml"), Some(19));
}
