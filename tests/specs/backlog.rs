// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gap reconciliation: live gaps are waited on, dead gaps written off.

use crate::prelude::*;

#[test]
fn live_gap_is_backfilled_when_the_straggler_appears() {
    let mut h = Harness::new(recording());
    h.push(10);
    h.engine.start().unwrap();

    // 12 is missing; 13 was created only a minute ago, so it may yet
    // materialise upstream.
    h.push(11);
    h.push_aged(13, 1);
    h.engine.poll_once().unwrap();

    assert_eq!(h.dispatched("audit"), vec![11, 13]);
    assert_eq!(h.last_id("audit.toml"), Some(13));

    // The straggler shows up: it is dispatched even though its id is
    // below the cursor, and the cursor does not move backwards.
    h.push(12);
    h.engine.poll_once().unwrap();

    assert_eq!(h.dispatched("audit"), vec![11, 13, 12]);
    assert_eq!(h.last_id("audit.toml"), Some(13));
    assert_eq!(h.persisted_last_id("audit.toml"), Some(13));
}

#[test]
fn stale_gap_is_written_off_immediately() {
    let mut h = Harness::new(recording());
    h.push(10);
    h.engine.start().unwrap();

    // 14 is ten minutes old; 11-13 would have shown up by now.
    h.push_aged(14, 10);
    h.engine.poll_once().unwrap();

    assert_eq!(h.dispatched("audit"), vec![14]);
    assert_eq!(h.last_id("audit.toml"), Some(14));

    // A late 12 is not waited on and not dispatched.
    h.push(12);
    h.engine.poll_once().unwrap();
    assert_eq!(h.dispatched("audit"), vec![14]);
}

#[test]
fn backlogged_id_expires_after_the_timeout() {
    let mut h = Harness::new(recording());
    h.push(10);
    h.engine.start().unwrap();

    h.push_aged(13, 1);
    h.engine.poll_once().unwrap();
    assert_eq!(h.dispatched("audit"), vec![13]);

    // Past the timeout the missing ids stop being re-requested; a late
    // arrival is ignored for good.
    h.clock.advance(chrono::Duration::minutes(6));
    h.push(11);
    h.engine.poll_once().unwrap();
    h.engine.poll_once().unwrap();

    assert_eq!(h.dispatched("audit"), vec![13]);
    assert_eq!(h.last_id("audit.toml"), Some(13));
}
