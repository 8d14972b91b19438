// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered delivery and reproducible dispatch.

use crate::prelude::*;
use relay_engine::test_support::ScriptedCallback;

#[test]
fn contiguous_events_are_dispatched_in_ascending_order() {
    let mut h = Harness::new(recording());
    h.push(10);
    h.engine.start().unwrap();

    for id in [11, 12, 13] {
        h.push(id);
    }
    h.engine.poll_once().unwrap();

    assert_eq!(h.dispatched("audit"), vec![11, 12, 13]);
    assert_eq!(h.last_id("audit.toml"), Some(13));
    assert_eq!(h.persisted_last_id("audit.toml"), Some(13));
}

#[test]
fn re_offered_events_are_absorbed() {
    let mut h = Harness::new(recording());
    h.push(10);
    h.engine.start().unwrap();

    h.push(11);
    h.engine.poll_once().unwrap();
    // The upstream re-offers 11 alongside 12 on the next poll.
    h.push(12);
    h.engine.poll_once().unwrap();

    assert_eq!(h.dispatched("audit"), vec![11, 12]);
}

#[test]
fn dispatch_sequence_is_identical_across_runs() {
    let callbacks = || {
        vec![
            ScriptedCallback::named("first"),
            ScriptedCallback::named("second"),
        ]
    };
    let run = |callbacks| {
        let mut h = Harness::with_manifests(callbacks, &["beta.toml", "alpha.toml"]);
        h.push(10);
        h.engine.start().unwrap();
        for id in [11, 12, 13] {
            h.push(id);
        }
        h.engine.poll_once().unwrap();
        h.journal.entries()
    };

    let first_run = run(callbacks());
    let second_run = run(callbacks());
    assert_eq!(first_run, second_run);

    // Plugins in basename order, callbacks in registration order.
    let tuples: Vec<(String, String, u64)> = first_run
        .into_iter()
        .map(|entry| (entry.plugin, entry.callback, entry.event_id))
        .collect();
    assert_eq!(
        tuples[..4],
        [
            ("alpha".to_string(), "first".to_string(), 11),
            ("alpha".to_string(), "second".to_string(), 11),
            ("beta".to_string(), "first".to_string(), 11),
            ("beta".to_string(), "second".to_string(), 11),
        ]
    );
}
