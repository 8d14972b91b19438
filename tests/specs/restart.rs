// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash recovery: at-least-once delivery from the persisted cursor.

use crate::prelude::*;

#[test]
fn events_dispatched_but_not_persisted_are_redelivered() {
    let mut h = Harness::new(recording());
    h.push(29);
    h.engine.start().unwrap();
    assert_eq!(h.persisted_last_id("audit.toml"), Some(29));

    // Dispatch 30 straight into the collection, bypassing the loop's
    // persistence step: the crash happens before the cursor is saved.
    h.push(30);
    let event = h.fresh_event(30);
    h.engine.collections_mut()[0].process(&event);
    assert_eq!(h.dispatched("audit"), vec![30]);
    assert_eq!(h.persisted_last_id("audit.toml"), Some(29));

    // Restart: the batch is re-delivered in order, and the cursor
    // never lands below the persisted value.
    h.restart();
    h.engine.start().unwrap();
    assert_eq!(h.last_id("audit.toml"), Some(29));

    h.engine.poll_once().unwrap();
    assert_eq!(h.dispatched("audit"), vec![30, 30]);
    assert_eq!(h.last_id("audit.toml"), Some(30));
    assert_eq!(h.persisted_last_id("audit.toml"), Some(30));
}

#[test]
fn persisted_state_round_trips_through_a_restart() {
    let mut h = Harness::new(recording());
    h.push(10);
    h.engine.start().unwrap();

    // Leave a backlog entry behind so the whole cursor shape is
    // exercised, not just last_id.
    h.push(11);
    h.push_aged(13, 1);
    h.engine.poll_once().unwrap();
    let before = h.engine.collections()[0]
        .plugin("audit.toml")
        .unwrap()
        .cursor();
    assert!(!before.backlog.is_empty());

    h.restart();
    h.engine.start().unwrap();
    let after = h.engine.collections()[0]
        .plugin("audit.toml")
        .unwrap()
        .cursor();
    assert_eq!(after, before);

    // The backlog still resolves after the restart.
    h.push(12);
    h.engine.poll_once().unwrap();
    assert_eq!(h.dispatched("audit"), vec![11, 13, 12]);
}

#[test]
fn legacy_cursor_files_from_older_installs_still_work() {
    let mut h = Harness::new(recording());
    std::fs::write(&h.cursor_path, "4075\n").unwrap();

    h.engine.start().unwrap();
    assert_eq!(h.last_id("audit.toml"), Some(4075));

    h.push(4076);
    h.engine.poll_once().unwrap();
    assert_eq!(h.dispatched("audit"), vec![4076]);
    // The first write upgrades the file to the current format.
    assert_eq!(h.persisted_last_id("audit.toml"), Some(4076));
}
